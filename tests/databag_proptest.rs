use proptest::prelude::*;

use glauth::databag::{decode, encode};
use glauth::ldap::{LdapProvider, ProviderRecord, RequirerRecord};
use glauth::model::Scope;
use glauth::testing::Harness;

fn provider_record() -> impl Strategy<Value = ProviderRecord> {
    let field = "[a-zA-Z0-9=,:/._-]{1,32}";

    (field, field, field, field, field, any::<bool>()).prop_map(
        |(url, base_dn, bind_dn, bind_password_secret, auth_method, starttls)| ProviderRecord {
            url,
            base_dn,
            bind_dn,
            bind_password_secret,
            auth_method,
            starttls,
        },
    )
}

proptest! {
    /// Whatever the provider publishes, the requirer reads back unchanged
    #[test]
    fn published_record_reads_back(record in provider_record()) {
        let harness = Harness::new("glauth-k8s", "identity");
        let id = harness.add_relation("ldap", "wiki");

        LdapProvider::new(&harness).publish(id, &record).unwrap();

        let databag = harness.relation_data(id, Scope::LocalApp);
        prop_assert_eq!(decode::<ProviderRecord>(&databag).unwrap(), Some(record));
    }

    #[test]
    fn requirer_record_reads_back(user in "[a-z][a-z0-9-]{0,30}", group in "[a-z][a-z0-9-]{0,30}") {
        let record = RequirerRecord { user, group };
        let databag = encode(&record).unwrap();

        prop_assert_eq!(decode::<RequirerRecord>(&databag).unwrap(), Some(record));
    }
}
