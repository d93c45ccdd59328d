//! Endpoint model
//!
//! An application endpoint bound to a security system. Typed fields cover
//! identity, ownership and the structured blobs the codec has to reshape;
//! behavioural flags and the custom-property namespace live in a flat map the
//! same way connection attributes do.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attr::Attr;

/// Identifier prefix for endpoint state ids.
pub const ENDPOINT_ID_PREFIX: &str = "endpoint-";

/// One role type that may be requested through the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestableRoleType {
    pub role_type: String,
    #[serde(default)]
    pub request_option: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub requested_query: String,
    #[serde(default)]
    pub selected_query: String,
    #[serde(default)]
    pub show_on: String,
}

/// Another endpoint whose access is requested alongside this one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedEndpoint {
    pub security_system: String,
    pub endpoint: String,
    #[serde(default)]
    pub requestable: String,
    #[serde(default)]
    pub operation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub email_template_type: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub email_template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointModel {
    /// `endpoint-{endpoint_name}`
    #[serde(default)]
    pub id: Attr<String>,
    /// Identity, immutable after create
    #[serde(default)]
    pub endpoint_name: Attr<String>,
    #[serde(default)]
    pub display_name: Attr<String>,
    #[serde(default)]
    pub security_system: Attr<String>,
    #[serde(default)]
    pub description: Attr<String>,
    #[serde(default)]
    pub owner_type: Attr<String>,
    #[serde(default)]
    pub owner: Attr<String>,
    #[serde(default)]
    pub resource_owner_type: Attr<String>,
    #[serde(default)]
    pub resource_owner: Attr<String>,
    #[serde(default)]
    pub access_query: Attr<String>,
    /// JSON document, compared semantically
    #[serde(default)]
    pub connection_config: Attr<String>,
    #[serde(default)]
    pub disable_new_account_request_if_account_exists: Attr<String>,
    #[serde(default)]
    pub disable_remove_account: Attr<String>,
    #[serde(default)]
    pub disable_modify_account: Attr<String>,
    #[serde(default)]
    pub block_inflight_request: Attr<String>,
    #[serde(default)]
    pub requestable_role_types: Attr<Vec<RequestableRoleType>>,
    #[serde(default)]
    pub mapped_endpoints: Attr<Vec<MappedEndpoint>>,
    #[serde(default)]
    pub email_templates: Attr<Vec<EmailTemplate>>,
    #[serde(default)]
    pub msg: Attr<String>,
    #[serde(default)]
    pub error_code: Attr<String>,
    /// Behavioural flags and custom properties
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Attr<String>>,
}

impl EndpointModel {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            endpoint_name: Attr::Known(name.into()),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Attr::non_empty)
    }

    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.attributes.insert(name.into(), Attr::Known(value.into()));
    }

    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set_attr(name, value);
        self
    }

    /// State id derived from the endpoint name.
    pub fn state_id(name: &str) -> String {
        format!("{ENDPOINT_ID_PREFIX}{name}")
    }

    /// The four disable-account flags in wire order.
    pub fn disable_flags(&self) -> [&Attr<String>; 4] {
        [
            &self.disable_new_account_request_if_account_exists,
            &self.disable_remove_account,
            &self.disable_modify_account,
            &self.block_inflight_request,
        ]
    }

    pub fn disable_flags_mut(&mut self) -> [&mut Attr<String>; 4] {
        [
            &mut self.disable_new_account_request_if_account_exists,
            &mut self.disable_remove_account,
            &mut self.disable_modify_account,
            &mut self.block_inflight_request,
        ]
    }

    /// Replace plan-time unknowns with null.
    pub fn resolve_unknowns(&mut self) {
        for attr in [
            &mut self.id,
            &mut self.endpoint_name,
            &mut self.display_name,
            &mut self.security_system,
            &mut self.description,
            &mut self.owner_type,
            &mut self.owner,
            &mut self.resource_owner_type,
            &mut self.resource_owner,
            &mut self.access_query,
            &mut self.connection_config,
            &mut self.disable_new_account_request_if_account_exists,
            &mut self.disable_remove_account,
            &mut self.disable_modify_account,
            &mut self.block_inflight_request,
            &mut self.msg,
            &mut self.error_code,
        ] {
            if attr.is_unknown() {
                *attr = Attr::Null;
            }
        }
        if self.requestable_role_types.is_unknown() {
            self.requestable_role_types = Attr::Null;
        }
        if self.mapped_endpoints.is_unknown() {
            self.mapped_endpoints = Attr::Null;
        }
        if self.email_templates.is_unknown() {
            self.email_templates = Attr::Null;
        }
        self.attributes.retain(|_, value| !value.is_unknown());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attr::UNKNOWN_SENTINEL;
    use serde_json::json;

    #[test]
    fn test_deserialize_nested_lists_and_flat_attributes() {
        let model: EndpointModel = serde_json::from_value(json!({
            "endpoint_name": "ep1",
            "security_system": "sys1",
            "custom_property3": "dept",
            "requestable_role_types": [
                { "role_type": "Enterprise", "required": true }
            ],
            "mapped_endpoints": null,
            "msg": UNKNOWN_SENTINEL
        }))
        .unwrap();

        assert_eq!(model.endpoint_name, Attr::text("ep1"));
        assert_eq!(model.attr("custom_property3"), Some("dept"));
        let roles = model.requestable_role_types.as_known().unwrap();
        assert_eq!(roles[0].role_type, "Enterprise");
        assert!(roles[0].required);
        assert_eq!(roles[0].show_on, "");
        assert!(model.mapped_endpoints.is_null());
        assert!(model.msg.is_unknown());
    }

    #[test]
    fn test_resolve_unknowns_covers_lists() {
        let mut model = EndpointModel::named("ep1");
        model.email_templates = Attr::Unknown;
        model.msg = Attr::Unknown;
        model.attributes.insert("requestable".into(), Attr::Unknown);

        model.resolve_unknowns();

        assert!(model.email_templates.is_null());
        assert!(model.msg.is_null());
        assert!(model.attributes.is_empty());
    }

    #[test]
    fn test_state_id() {
        assert_eq!(EndpointModel::state_id("app"), "endpoint-app");
    }
}
