//! GitHub REST connector
//!
//! Imports organisations, teams and repository access through the GitHub
//! REST API. Personal access tokens are write-only.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static GITHUB_REST_FIELDS: &[FieldSpec] = &[
    FieldSpec::secret("connection_json", "ConnectionJSON"),
    FieldSpec::json("import_account_ent_json", "ImportAccountEntJSON"),
    FieldSpec::secret("access_tokens", "ACCESS_TOKENS"),
    FieldSpec::plain("organization_list", "ORGANIZATION_LIST"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static GITHUB_REST_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::GithubRest,
    display_name: "GitHub REST",
    connection_type: "GithubRest",
    accepted_types: &["GithubRest"],
    fields: GITHUB_REST_FIELDS,
};

pub struct GithubRestConnector;

impl VariantCodec for GithubRestConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &GITHUB_REST_METADATA
    }
}

pub fn register_github_rest_connector(registry: &mut Registry) {
    registry.register(Arc::new(GithubRestConnector));
}
