//! Entra ID (Azure AD) connector
//!
//! The server still reports this family as `AzureAD`; `EntraID` is accepted
//! as a spelling of the same discriminant.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static ENTRA_ID_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("client_id", "CLIENT_ID"),
    FieldSpec::secret("client_secret", "CLIENT_SECRET"),
    FieldSpec::secret("access_token", "ACCESS_TOKEN"),
    FieldSpec::secret("azure_mgmt_access_token", "AZURE_MGMT_ACCESS_TOKEN"),
    FieldSpec::plain("aad_tenant_id", "AAD_TENANT_ID"),
    FieldSpec::plain("authentication_endpoint", "AUTHENTICATION_ENDPOINT"),
    FieldSpec::plain("microsoft_graph_endpoint", "MICROSOFT_GRAPH_ENDPOINT"),
    FieldSpec::plain("azure_management_endpoint", "AZURE_MANAGEMENT_ENDPOINT"),
    FieldSpec::json("import_user_json", "ImportUserJSON"),
    FieldSpec::json("create_account_json", "CREATEACCOUNTJSON"),
    FieldSpec::json("update_account_json", "UPDATEACCOUNTJSON"),
    FieldSpec::json("enable_account_json", "ENABLEACCOUNTJSON"),
    FieldSpec::json("disable_account_json", "DISABLEACCOUNTJSON"),
    FieldSpec::json("add_access_json", "ADDACCESSJSON"),
    FieldSpec::json("remove_access_json", "REMOVEACCESSJSON"),
    FieldSpec::json("update_user_json", "UPDATEUSERJSON"),
    FieldSpec::json("account_attributes", "ACCOUNT_ATTRIBUTES"),
    FieldSpec::json("entitlement_attribute", "ENTITLEMENT_ATTRIBUTE"),
    FieldSpec::json("delta_tokens_json", "DELTATOKENSJSON"),
    FieldSpec::plain("account_import_fields", "ACCOUNT_IMPORT_FIELDS"),
    FieldSpec::int("import_depth", "IMPORT_DEPTH"),
    FieldSpec::secret("connection_json", "connectionJSON"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static ENTRA_ID_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::EntraId,
    display_name: "Entra ID",
    connection_type: "AzureAD",
    accepted_types: &["AzureAD", "EntraID"],
    fields: ENTRA_ID_FIELDS,
};

pub struct EntraIdConnector;

impl VariantCodec for EntraIdConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &ENTRA_ID_METADATA
    }
}

pub fn register_entra_id_connector(registry: &mut Registry) {
    registry.register(Arc::new(EntraIdConnector));
}
