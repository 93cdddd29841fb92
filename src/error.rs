use std::io::Error as IOError;

use ex::io::Error as ExIOError;
use failure::Fail;
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;

#[derive(Debug, Fail)]
pub enum CharmError {
    #[fail(display = "I/O error: {}", _0)]
    IOError(#[fail(cause)] IOError),

    #[fail(display = "I/O error: {}", _0)]
    ExIOError(#[fail(cause)] ExIOError),

    #[fail(display = "YAML Error: {}", _0)]
    YamlError(#[fail(cause)] YamlError),

    #[fail(display = "JSON Error: {}", _0)]
    JsonError(JsonError),

    #[fail(display = "Relation data does not match {}: {}", _0, _1)]
    ShapeMismatch(String, String),

    #[fail(display = "Relation {}:{} not found", _0, _1)]
    RelationNotFound(String, u32),

    #[fail(display = "Error while running {}: {}", _0, _1)]
    SubcommandError(String, String),

    #[fail(display = "Certificates error: {}", _0)]
    CertificatesError(String),

    #[fail(display = "Invalid charm config: {}", _0)]
    ConfigError(String),

    #[fail(display = "Unknown hook `{}`", _0)]
    UnknownHook(String),

    #[fail(display = "Database error: {}", _0)]
    DatabaseError(String),
}

impl From<IOError> for CharmError {
    fn from(err: IOError) -> Self {
        CharmError::IOError(err)
    }
}

impl From<ExIOError> for CharmError {
    fn from(err: ExIOError) -> Self {
        CharmError::ExIOError(err)
    }
}

impl From<YamlError> for CharmError {
    fn from(err: YamlError) -> Self {
        CharmError::YamlError(err)
    }
}

impl From<JsonError> for CharmError {
    fn from(err: JsonError) -> Self {
        CharmError::JsonError(err)
    }
}

impl From<sqlx::Error> for CharmError {
    fn from(err: sqlx::Error) -> Self {
        CharmError::DatabaseError(err.to_string())
    }
}

impl From<CharmError> for String {
    fn from(err: CharmError) -> Self {
        format!("{}", err)
    }
}
