//! Active Directory / LDAP connector
//!
//! Provisioning payloads (`create_account_json` and friends) are JSON
//! templates evaluated server-side; they are compared semantically on read.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static AD_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("url", "URL"),
    FieldSpec::plain("username", "USERNAME"),
    FieldSpec::secret("password", "PASSWORD"),
    FieldSpec::plain("ldap_or_ad", "LDAP_OR_AD"),
    FieldSpec::plain("entitlement_attribute", "ENTITLEMENT_ATTRIBUTE"),
    FieldSpec::plain("base", "BASE"),
    FieldSpec::plain("searchfilter", "SEARCHFILTER"),
    FieldSpec::plain("objectfilter", "OBJECTFILTER"),
    FieldSpec::plain("account_attribute", "ACCOUNT_ATTRIBUTE"),
    FieldSpec::plain("group_search_base_dn", "GROUP_SEARCH_BASE_DN"),
    FieldSpec::json("group_import_mapping", "GROUP_IMPORT_MAPPING"),
    FieldSpec::json("create_account_json", "CREATEACCOUNTJSON"),
    FieldSpec::json("update_account_json", "UPDATEACCOUNTJSON"),
    FieldSpec::json("enable_account_json", "ENABLEACCOUNTJSON"),
    FieldSpec::json("disable_account_json", "DISABLEACCOUNTJSON"),
    FieldSpec::json("remove_account_action", "REMOVEACCOUNTACTION"),
    FieldSpec::json("add_access_json", "ADDACCESSJSON"),
    FieldSpec::json("remove_access_json", "REMOVEACCESSJSON"),
    FieldSpec::json("reset_and_change_passwrd_json", "RESETANDCHANGEPASSWRDJSON"),
    FieldSpec::json("checkforunique", "CHECKFORUNIQUE"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
    FieldSpec::int("page_size", "PAGE_SIZE"),
    FieldSpec::boolean("support_emptystring", "SUPPORTEMPTYSTRING"),
    FieldSpec::boolean("set_random_password", "SETRANDOMPASSWORD"),
    FieldSpec::int("password_min_length", "PASSWORD_MIN_LENGTH"),
    FieldSpec::int("password_max_length", "PASSWORD_MAX_LENGTH"),
    FieldSpec::int("password_noofcapsalpha", "PASSWORD_NOOFCAPSALPHA"),
    FieldSpec::int("password_noofdigits", "PASSWORD_NOOFDIGITS"),
    FieldSpec::int("password_noofsplchars", "PASSWORD_NOOFSPLCHARS"),
];

pub static AD_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::ActiveDirectory,
    display_name: "Active Directory",
    connection_type: "AD",
    accepted_types: &["AD"],
    fields: AD_FIELDS,
};

pub struct ActiveDirectoryConnector;

impl VariantCodec for ActiveDirectoryConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &AD_METADATA
    }
}

pub fn register_active_directory_connector(registry: &mut Registry) {
    registry.register(Arc::new(ActiveDirectoryConnector));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::codec::CodecError;
    use crate::models::connection::ConnectionModel;

    #[test]
    fn test_password_policy_integers_validated() {
        let config = ConnectionModel::named("ad1")
            .with_attr("password_min_length", "8")
            .with_attr("password_max_length", "sixteen");
        assert_eq!(
            ActiveDirectoryConnector.validate(&config),
            Err(CodecError::InvalidInteger {
                attr: "password_max_length".into(),
                value: "sixteen".into()
            })
        );
    }

    #[test]
    fn test_password_twin_conflict() {
        let config = ConnectionModel::named("ad1")
            .with_attr("password", "a")
            .with_attr("password_wo", "b");
        assert!(matches!(
            ActiveDirectoryConnector.validate(&config),
            Err(CodecError::WriteOnlyConflict { .. })
        ));
    }
}
