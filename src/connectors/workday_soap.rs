//! Workday SOAP connector

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static WORKDAY_SOAP_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("username", "USERNAME"),
    FieldSpec::secret("password", "PASSWORD"),
    FieldSpec::plain("soap_endpoint", "SOAP_ENDPOINT"),
    FieldSpec::secret("connection_json", "CONNECTIONJSON"),
    FieldSpec::json("accounts_import_json", "ACCOUNTS_IMPORT_JSON"),
    FieldSpec::json("change_pass_json", "CHANGEPASSJSON"),
    FieldSpec::boolean("combined_create_request", "COMBINEDCREATEREQUEST"),
    FieldSpec::json("create_account_json", "CREATEACCOUNTJSON"),
    FieldSpec::json("custom_config", "CUSTOM_CONFIG"),
    FieldSpec::plain("data_to_import", "DATA_TO_IMPORT"),
    FieldSpec::plain("date_format", "DATEFORMAT"),
    FieldSpec::json("delete_account_json", "DELETEACCOUNTJSON"),
    FieldSpec::json("disable_account_json", "DISABLEACCOUNTJSON"),
    FieldSpec::json("enable_account_json", "ENABLEACCOUNTJSON"),
    FieldSpec::json("grant_access_json", "GRANTACCESSJSON"),
    FieldSpec::boolean("import_changes_only", "IMPORT_CHANGES_ONLY"),
    FieldSpec::int("page_size", "PAGE_SIZE"),
    FieldSpec::json("revoke_access_json", "REVOKEACCESSJSON"),
    FieldSpec::json("status_key_json", "STATUS_KEY_JSON"),
    FieldSpec::json("update_account_json", "UPDATEACCOUNTJSON"),
    FieldSpec::json("update_user_json", "UPDATEUSERJSON"),
    FieldSpec::json("user_import_json", "USER_IMPORT_JSON"),
    FieldSpec::json("user_import_mapping", "USER_IMPORT_MAPPING"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static WORKDAY_SOAP_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::WorkdaySoap,
    display_name: "Workday SOAP",
    connection_type: "WorkdaySOAP",
    accepted_types: &["WorkdaySOAP", "Workday-SOAP"],
    fields: WORKDAY_SOAP_FIELDS,
};

pub struct WorkdaySoapConnector;

impl VariantCodec for WorkdaySoapConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &WORKDAY_SOAP_METADATA
    }
}

pub fn register_workday_soap_connector(registry: &mut Registry) {
    registry.register(Arc::new(WorkdaySoapConnector));
}
