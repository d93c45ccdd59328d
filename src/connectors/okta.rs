//! Okta connector
//!
//! Imports users, groups and applications from an Okta org. The API token
//! (`auth_token`) is write-only: it is sent on every upsert and never read
//! back.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static OKTA_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("import_url", "IMPORTURL"),
    FieldSpec::secret("auth_token", "AUTHTOKEN"),
    FieldSpec::plain("account_field_mappings", "ACCOUNTFIELDMAPPINGS"),
    FieldSpec::plain("user_field_mappings", "USERFIELDMAPPINGS"),
    FieldSpec::plain("entitlement_types_mappings", "ENTITLEMENTTYPESMAPPINGS"),
    FieldSpec::boolean("import_inactive_apps", "IMPORT_INACTIVE_APPS"),
    FieldSpec::plain("okta_application_securitysystem", "OKTA_APPLICATION_SECURITYSYSTEM"),
    FieldSpec::plain("okta_groups_filter", "OKTA_GROUPS_FILTER"),
    FieldSpec::plain("app_account_field_mappings", "APPACCOUNTFIELDMAPPINGS"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::plain("audit_filter", "AUDIT_FILTER"),
    FieldSpec::json("mod_user_json", "MODIFYUSERDATAJSON"),
    FieldSpec::boolean("activate_endpoint", "ACTIVATE_ENDPOINT"),
    FieldSpec::json("config_json", "ConfigJSON"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static OKTA_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::Okta,
    display_name: "Okta",
    connection_type: "Okta",
    accepted_types: &["Okta"],
    fields: OKTA_FIELDS,
};

/// Okta codec
pub struct OktaConnector;

impl VariantCodec for OktaConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &OKTA_METADATA
    }
}

/// Register the Okta connector
pub fn register_okta_connector(registry: &mut Registry) {
    registry.register(Arc::new(OktaConnector));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LooseObject;
    use crate::connectors::codec::ConnectionDetails;
    use crate::models::attr::Attr;
    use crate::models::connection::ConnectionModel;
    use serde_json::json;

    #[test]
    fn test_encode_okta_payload() {
        let plan = ConnectionModel::named("ok1")
            .with_attr("import_url", "https://acme.okta.com")
            .with_attr("activate_endpoint", "Yes");
        let config = plan.clone().with_attr("auth_token_wo", "00abc");

        let body = OktaConnector.encode(&plan, &config, None).unwrap();

        assert_eq!(body["connectiontype"], json!("Okta"));
        assert_eq!(body["IMPORTURL"], json!("https://acme.okta.com"));
        assert_eq!(body["AUTHTOKEN"], json!("00abc"));
        assert_eq!(body["ACTIVATE_ENDPOINT"], json!("true"));
    }

    #[test]
    fn test_decode_keeps_token_out_of_server_view() {
        let prior = ConnectionModel::named("ok1").with_attr("auth_token", "00abc");
        let reply = LooseObject::from_value(json!({
            "connectionname": "ok1",
            "connectionkey": 42,
            "connectiontype": "Okta",
            "connectionattributes": {
                "AUTHTOKEN": "server-masked",
                "IMPORTURL": "https://acme.okta.com"
            },
            "errorcode": "0"
        }))
        .unwrap();
        let details = ConnectionDetails::from_reply(&reply).unwrap();
        assert!(details.matches_family(&OKTA_METADATA));

        let model = OktaConnector.decode(&details, &prior);
        assert_eq!(model.attr("auth_token"), Some("00abc"));
        assert_eq!(model.attr("import_url"), Some("https://acme.okta.com"));
        assert_eq!(model.connection_key, Attr::Known(42));
    }
}
