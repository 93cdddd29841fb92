//! Accounts in GLAuth's PostgreSQL backend
//!
//! GLAuth's postgres plugin serves users out of the `users`, `ldapgroups` and `capabilities`
//! tables. A bind account only works once its rows exist there.

use sqlx::{Connection, PgConnection};
use tokio::runtime::Builder;
use tracing::info;

use crate::error::CharmError;
use crate::users::User;

/// Where GLAuth looks users up
pub trait Directory {
    /// Make sure `user`, its group and a search capability exist
    ///
    /// Existing rows are left alone.
    fn add_account(&self, dsn: &str, user: &User) -> Result<(), CharmError>;
}

/// [`Directory`] backed by the database behind `pg-database`
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDirectory;

impl PostgresDirectory {
    async fn insert(dsn: &str, user: &User) -> Result<(), sqlx::Error> {
        let mut conn = PgConnection::connect(dsn).await?;
        let mut tx = conn.begin().await?;

        sqlx::query(
            r#"INSERT INTO ldapgroups (name, gidnumber)
                VALUES ($1, $2) ON CONFLICT (name) DO NOTHING"#,
        )
        .bind(&user.group)
        .bind(user.gid_number as i32)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO users (name, uidnumber, primarygroup, passsha256)
                VALUES ($1, $2, $3, $4) ON CONFLICT (name) DO NOTHING"#,
        )
        .bind(&user.name)
        .bind(user.uid_number as i32)
        .bind(user.gid_number as i32)
        .bind(&user.password_sha256)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO capabilities (userid, action, object)
                SELECT $1, 'search', '*'
                WHERE NOT EXISTS (SELECT 1 FROM capabilities WHERE userid = $1)"#,
        )
        .bind(user.uid_number as i32)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        conn.close().await
    }
}

impl Directory for PostgresDirectory {
    fn add_account(&self, dsn: &str, user: &User) -> Result<(), CharmError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(Self::insert(dsn, user))?;

        info!("Added {} to the GLAuth database", user.name);
        Ok(())
    }
}
