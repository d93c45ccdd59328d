//! Transport package export model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::attr::Attr;

/// Object lists to include in a transport package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectsToExport {
    pub sav_roles: Option<Vec<String>>,
    pub email_templates: Option<Vec<String>>,
    pub roles: Option<Vec<String>>,
    pub analytics_v1: Option<Vec<String>>,
    pub analytics_v2: Option<Vec<String>>,
    pub global_config: Option<Vec<String>>,
    pub workflows: Option<Vec<String>>,
    pub connections: Option<Vec<String>>,
    pub app_onboarding: Option<Vec<String>>,
    pub user_groups: Option<Vec<String>>,
    pub scan_rules: Option<Vec<String>>,
    pub organizations: Option<Vec<String>>,
    pub security_systems: Option<Vec<String>>,
}

impl ObjectsToExport {
    /// Wire form; empty lists are omitted.
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, list) in [
            ("savRoles", &self.sav_roles),
            ("emailTemplate", &self.email_templates),
            ("roles", &self.roles),
            ("analyticsV1", &self.analytics_v1),
            ("analyticsV2", &self.analytics_v2),
            ("globalConfig", &self.global_config),
            ("workflows", &self.workflows),
            ("connection", &self.connections),
            ("appOnboarding", &self.app_onboarding),
            ("userGroups", &self.user_groups),
            ("scanRules", &self.scan_rules),
            ("organizations", &self.organizations),
            ("securitySystems", &self.security_systems),
        ] {
            if let Some(items) = list.as_ref().filter(|items| !items.is_empty()) {
                out.insert(
                    key.to_string(),
                    Value::Array(items.iter().cloned().map(Value::String).collect()),
                );
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.to_wire().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportPackageModel {
    #[serde(default)]
    pub id: Attr<String>,
    /// `"true"` to export to the online transport store
    #[serde(default)]
    pub export_online: Attr<String>,
    #[serde(default)]
    pub export_path: Attr<String>,
    #[serde(default)]
    pub update_user: Attr<String>,
    #[serde(default)]
    pub transport_owner: Attr<String>,
    #[serde(default)]
    pub transport_members: Attr<String>,
    #[serde(default)]
    pub business_justification: Attr<String>,
    #[serde(default)]
    pub objects_to_export: Attr<ObjectsToExport>,
    #[serde(default)]
    pub msg: Attr<String>,
    #[serde(default)]
    pub msg_description: Attr<String>,
    #[serde(default)]
    pub file_name: Attr<String>,
    #[serde(default)]
    pub error_code: Attr<String>,
}
