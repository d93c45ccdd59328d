//! Salesforce connector

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static SALESFORCE_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("client_id", "CLIENT_ID"),
    FieldSpec::secret("client_secret", "CLIENT_SECRET"),
    FieldSpec::secret("refresh_token", "REFRESH_TOKEN"),
    FieldSpec::plain("redirect_uri", "REDIRECT_URI"),
    FieldSpec::plain("instance_url", "INSTANCE_URL"),
    FieldSpec::plain("object_to_be_imported", "OBJECT_TO_BE_IMPORTED"),
    FieldSpec::json("feature_license_json", "FEATURE_LICENSE_JSON"),
    FieldSpec::plain("custom_createaccount_url", "CUSTOM_CREATEACCOUNT_URL"),
    FieldSpec::json("createaccount_json", "CREATEACCOUNT_JSON"),
    FieldSpec::plain("account_field_query", "ACCOUNT_FIELD_QUERY"),
    FieldSpec::json("field_mapping_json", "FIELD_MAPPING_JSON"),
    FieldSpec::json("modifyaccount_json", "MODIFYACCOUNTJSON"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::json("customconfigjson", "CUSTOMCONFIGJSON"),
    FieldSpec::plain("account_filter_query", "ACCOUNT_FILTER_QUERY"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static SALESFORCE_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::Salesforce,
    display_name: "Salesforce",
    connection_type: "SalesForce",
    accepted_types: &["SalesForce"],
    fields: SALESFORCE_FIELDS,
};

pub struct SalesforceConnector;

impl VariantCodec for SalesforceConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &SALESFORCE_METADATA
    }
}

pub fn register_salesforce_connector(registry: &mut Registry) {
    registry.register(Arc::new(SalesforceConnector));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::connection::ConnectionModel;
    use serde_json::json;

    #[test]
    fn test_two_secrets_from_different_sources() {
        let plan = ConnectionModel::named("sf1").with_attr("client_secret", "cs");
        let config = plan.clone().with_attr("refresh_token_wo", "rt");

        let body = SalesforceConnector.encode(&plan, &config, None).unwrap();
        assert_eq!(body["connectiontype"], json!("SalesForce"));
        assert_eq!(body["CLIENT_SECRET"], json!("cs"));
        assert_eq!(body["REFRESH_TOKEN"], json!("rt"));
    }
}
