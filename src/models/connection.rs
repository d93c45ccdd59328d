//! Connection model
//!
//! Declarative state of one IGA connection. The base fields are shared by
//! every connector family; family attributes live in a flat map keyed by the
//! attribute name the family's field table declares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attr::Attr;

/// Declarative model of a connection resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionModel {
    /// String form of `connection_key`
    #[serde(default)]
    pub id: Attr<String>,
    /// Server-assigned surrogate key
    #[serde(default)]
    pub connection_key: Attr<i64>,
    /// Identity, immutable after create
    #[serde(default)]
    pub connection_name: Attr<String>,
    /// Family discriminant, immutable after create
    #[serde(default)]
    pub connection_type: Attr<String>,
    #[serde(default)]
    pub description: Attr<String>,
    #[serde(default)]
    pub default_sav_roles: Attr<String>,
    #[serde(default)]
    pub email_template: Attr<String>,
    #[serde(default)]
    pub vault_connection: Attr<String>,
    #[serde(default)]
    pub vault_configuration: Attr<String>,
    #[serde(default)]
    pub save_in_vault: Attr<String>,
    #[serde(default)]
    pub msg: Attr<String>,
    #[serde(default)]
    pub error_code: Attr<String>,
    /// Family-specific attributes
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Attr<String>>,
}

impl ConnectionModel {
    /// Start a model for a named connection.
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            connection_name: Attr::Known(name.into()),
            ..Default::default()
        }
    }

    /// Known, non-empty value of a family attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Attr::non_empty)
    }

    /// Raw tri-valued family attribute (null when absent).
    pub fn attr_value(&self, name: &str) -> Attr<String> {
        self.attributes.get(name).cloned().unwrap_or_default()
    }

    /// Set a known family attribute value.
    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.attributes.insert(name.into(), Attr::Known(value.into()));
    }

    /// Builder-style variant of [`ConnectionModel::set_attr`].
    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Drop `*_wo` attributes; write-only values never reach state.
    pub fn strip_write_only(&mut self) {
        self.attributes.retain(|name, _| !name.ends_with("_wo"));
    }

    /// Replace plan-time unknowns with null so the result can be stored.
    pub fn resolve_unknowns(&mut self) {
        for attr in [
            &mut self.id,
            &mut self.connection_name,
            &mut self.connection_type,
            &mut self.description,
            &mut self.default_sav_roles,
            &mut self.email_template,
            &mut self.vault_connection,
            &mut self.vault_configuration,
            &mut self.save_in_vault,
            &mut self.msg,
            &mut self.error_code,
        ] {
            if attr.is_unknown() {
                *attr = Attr::Null;
            }
        }
        if self.connection_key.is_unknown() {
            self.connection_key = Attr::Null;
        }
        self.attributes.retain(|_, value| !value.is_unknown());
    }

    /// True when any member of the vault triple carries a value.
    pub fn has_vault_binding(&self) -> bool {
        self.vault_connection.non_empty().is_some()
            || self.vault_configuration.non_empty().is_some()
            || self.save_in_vault.non_empty().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_attributes_round_trip() {
        let model: ConnectionModel = serde_json::from_value(json!({
            "connection_name": "ok1",
            "connection_type": "Okta",
            "import_url": "https://okta.example.com",
            "import_inactive_apps": true
        }))
        .unwrap();

        assert_eq!(model.connection_name, Attr::text("ok1"));
        assert_eq!(model.attr("import_url"), Some("https://okta.example.com"));
        assert_eq!(model.attr("import_inactive_apps"), Some("true"));
        assert!(model.connection_key.is_null());

        let value = serde_json::to_value(&model).unwrap();
        assert_eq!(value["import_url"], json!("https://okta.example.com"));
        assert_eq!(value["connection_name"], json!("ok1"));
    }

    #[test]
    fn test_resolve_unknowns_and_strip_write_only() {
        let mut model = ConnectionModel::named("c1").with_attr("password_wo", "pw");
        model.id = Attr::Unknown;
        model.connection_key = Attr::Unknown;
        model.attributes.insert("url".into(), Attr::Unknown);

        model.resolve_unknowns();
        model.strip_write_only();

        assert!(model.id.is_null());
        assert!(model.connection_key.is_null());
        assert!(model.attributes.is_empty());
    }

    #[test]
    fn test_vault_binding_detection() {
        let mut model = ConnectionModel::named("c1");
        assert!(!model.has_vault_binding());
        model.vault_connection = Attr::text("");
        assert!(!model.has_vault_binding());
        model.save_in_vault = Attr::text("true");
        assert!(model.has_vault_binding());
    }
}
