//! REST connector
//!
//! Generic HTTP connector driven entirely by JSON documents. `connection_json`
//! carries the target system's credentials and is therefore write-only.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static REST_FIELDS: &[FieldSpec] = &[
    FieldSpec::secret("connection_json", "ConnectionJSON"),
    FieldSpec::json("import_user_json", "ImportUserJSON"),
    FieldSpec::json("import_account_ent_json", "ImportAccountEntJSON"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::json("create_account_json", "CreateAccountJSON"),
    FieldSpec::json("update_account_json", "UpdateAccountJSON"),
    FieldSpec::json("enable_account_json", "EnableAccountJSON"),
    FieldSpec::json("disable_account_json", "DisableAccountJSON"),
    FieldSpec::json("add_access_json", "AddAccessJSON"),
    FieldSpec::json("remove_access_json", "RemoveAccessJSON"),
    FieldSpec::json("update_user_json", "UpdateUserJSON"),
    FieldSpec::json("change_pass_json", "ChangePassJSON"),
    FieldSpec::json("remove_account_json", "RemoveAccountJSON"),
    FieldSpec::json("ticket_status_json", "TicketStatusJSON"),
    FieldSpec::json("create_ticket_json", "CreateTicketJSON"),
    FieldSpec::plain("endpoints_filter", "ENDPOINTS_FILTER"),
    FieldSpec::json("passwd_policy_json", "PasswdPolicyJSON"),
    FieldSpec::json("config_json", "ConfigJSON"),
    FieldSpec::json("add_ffid_access_json", "AddFFIDAccessJSON"),
    FieldSpec::json("remove_ffid_access_json", "RemoveFFIDAccessJSON"),
    FieldSpec::json("modify_user_data_json", "MODIFYUSERDATAJSON"),
    FieldSpec::json("send_otp_json", "SendOtpJSON"),
    FieldSpec::json("validate_otp_json", "ValidateOtpJSON"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static REST_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::Rest,
    display_name: "REST",
    connection_type: "REST",
    accepted_types: &["REST"],
    fields: REST_FIELDS,
};

pub struct RestConnector;

impl VariantCodec for RestConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &REST_METADATA
    }
}

pub fn register_rest_connector(registry: &mut Registry) {
    registry.register(Arc::new(RestConnector));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LooseObject;
    use crate::connectors::codec::ConnectionDetails;
    use crate::models::connection::ConnectionModel;
    use serde_json::json;

    #[test]
    fn test_json_documents_round_trip_without_diff() {
        let import = r#"{"accountParams":{"url":"https://api.example.com/users","method":"GET"}}"#;
        let prior = ConnectionModel::named("rest1").with_attr("import_user_json", import);

        // Server re-serializes with different key order and whitespace.
        let reply = LooseObject::from_value(json!({
            "connectionname": "rest1",
            "connectiontype": "REST",
            "connectionattributes": {
                "ImportUserJSON": "{ \"accountParams\": { \"method\": \"GET\", \"url\": \"https://api.example.com/users\" } }"
            }
        }))
        .unwrap();
        let details = ConnectionDetails::from_reply(&reply).unwrap();

        let model = RestConnector.decode(&details, &prior);
        assert_eq!(model.attr("import_user_json"), Some(import));
    }
}
