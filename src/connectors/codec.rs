//! Table-driven encode/decode shared by every connector family.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::client::LooseObject;
use crate::connectors::metadata::{ConnectorMetadata, FieldKind, FieldSpec};
use crate::models::attr::{Attr, normalize_bool_str};
use crate::models::connection::ConnectionModel;

/// Local validation and projection failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("attribute '{attr}' is not defined for {family} connections")]
    UnknownAttribute { family: &'static str, attr: String },
    #[error("only one of '{attr}' and '{attr}_wo' may be set")]
    WriteOnlyConflict { attr: String },
    #[error("attribute '{attr}' must be an integer, got '{value}'")]
    InvalidInteger { attr: String, value: String },
    #[error("attribute '{attr}' must be valid JSON: {reason}")]
    InvalidJson { attr: String, reason: String },
    #[error("connection type '{actual}' does not match {expected}")]
    TypeMismatch { expected: &'static str, actual: String },
    #[error("connection_name is required")]
    MissingIdentity,
}

/// The variant block of a `getConnectionDetails` reply.
///
/// The reply either carries the connection fields at the top level or nests
/// them under a single family-specific member (for example
/// `OktaConnectionResponse`).
#[derive(Debug, Clone, Default)]
pub struct ConnectionDetails {
    pub variant: Option<String>,
    pub block: LooseObject,
    pub attributes: LooseObject,
    pub connection_key: Option<i64>,
    pub connection_name: Option<String>,
    pub connection_type: Option<String>,
    pub error_code: Option<String>,
    pub msg: Option<String>,
}

fn has_identity(obj: &LooseObject) -> bool {
    obj.get("connectionname").is_some() || obj.get("connectionkey").is_some()
}

impl ConnectionDetails {
    /// Locate the variant block; `None` when the reply describes no connection.
    pub fn from_reply(reply: &LooseObject) -> Option<Self> {
        let (variant, block) = if has_identity(reply) {
            (None, reply.clone())
        } else {
            reply.as_map().iter().find_map(|(key, value)| {
                LooseObject::from_value(value.clone())
                    .filter(has_identity)
                    .map(|block| (Some(key.clone()), block))
            })?
        };

        let attributes = block.object("connectionattributes").unwrap_or_default();
        Some(Self {
            connection_key: block.get_i64("connectionkey"),
            connection_name: block.get_str("connectionname").filter(|s| !s.is_empty()),
            connection_type: block
                .get_str("connectiontype")
                .filter(|s| !s.is_empty()),
            error_code: block.error_code().or_else(|| reply.error_code()),
            msg: block.msg().or_else(|| reply.msg()),
            variant,
            block,
            attributes,
        })
    }

    pub fn is_success(&self) -> bool {
        self.error_code.as_deref().is_none_or(|code| code == "0")
    }

    /// Whether the block describes a connection of the given family.
    pub fn matches_family(&self, meta: &ConnectorMetadata) -> bool {
        if let Some(ref connection_type) = self.connection_type {
            return meta.accepts_type(connection_type);
        }
        if let Some(ref variant) = self.variant {
            let variant = variant.to_ascii_lowercase();
            return meta
                .accepted_types
                .iter()
                .any(|t| variant.starts_with(&t.to_ascii_lowercase()));
        }
        true
    }

    /// Attribute value from `connectionattributes`, falling back to the block.
    pub fn field_text(&self, api: &str) -> Option<String> {
        self.attributes
            .get_text(api)
            .or_else(|| self.block.get_text(api))
            .filter(|s| !s.is_empty())
    }
}

/// Reject plans the API would accept but that cannot be represented.
pub fn validate(meta: &'static ConnectorMetadata, config: &ConnectionModel) -> Result<(), CodecError> {
    for key in config.attributes.keys() {
        if !meta.knows_attr(key) {
            return Err(CodecError::UnknownAttribute {
                family: meta.display_name,
                attr: key.clone(),
            });
        }
    }

    if let Some(connection_type) = config.connection_type.non_empty()
        && !meta.accepts_type(connection_type)
    {
        return Err(CodecError::TypeMismatch {
            expected: meta.connection_type,
            actual: connection_type.to_string(),
        });
    }

    for field in meta.fields {
        let value = config.attr(field.attr);
        match field.kind {
            FieldKind::Secret => {
                let twin = format!("{}_wo", field.attr);
                if value.is_some() && config.attr(&twin).is_some() {
                    return Err(CodecError::WriteOnlyConflict {
                        attr: field.attr.to_string(),
                    });
                }
            }
            FieldKind::Int => {
                if let Some(value) = value
                    && value.trim().parse::<i64>().is_err()
                {
                    return Err(CodecError::InvalidInteger {
                        attr: field.attr.to_string(),
                        value: value.to_string(),
                    });
                }
            }
            FieldKind::Json => {
                if let Some(value) = value
                    && let Err(err) = serde_json::from_str::<Value>(value)
                {
                    return Err(CodecError::InvalidJson {
                        attr: field.attr.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
            FieldKind::Plain | FieldKind::Bool => {}
        }
    }
    Ok(())
}

fn put(body: &mut Map<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        body.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Value to send for one field. Secrets come from the plan, or failing that
/// from the write-only twin in configuration.
fn field_value(field: &FieldSpec, plan: &ConnectionModel, config: &ConnectionModel) -> Option<String> {
    match field.kind {
        FieldKind::Secret => plan
            .attr(field.attr)
            .or_else(|| config.attr(field.attr))
            .or_else(|| config.attr(&format!("{}_wo", field.attr)))
            .map(str::to_string),
        FieldKind::Bool => plan.attr(field.attr).map(normalize_bool_str),
        FieldKind::Int => plan.attr(field.attr).map(|v| v.trim().to_string()),
        FieldKind::Plain | FieldKind::Json => plan.attr(field.attr).map(str::to_string),
    }
}

/// Build the flat `testConnection` payload.
///
/// The vault triple is all-or-nothing: any member set sends all three, and a
/// triple that was set in `prior` but cleared in `plan` is sent as explicit
/// empty strings.
pub fn encode(
    meta: &'static ConnectorMetadata,
    plan: &ConnectionModel,
    config: &ConnectionModel,
    prior: Option<&ConnectionModel>,
) -> Result<Map<String, Value>, CodecError> {
    let name = plan
        .connection_name
        .non_empty()
        .ok_or(CodecError::MissingIdentity)?;

    let mut body = Map::new();
    body.insert("connectiontype".into(), Value::String(meta.connection_type.into()));
    body.insert("connectionName".into(), Value::String(name.to_string()));
    put(&mut body, "description", plan.description.non_empty());
    put(&mut body, "defaultSavRoles", plan.default_sav_roles.non_empty());
    put(&mut body, "emailTemplate", plan.email_template.non_empty());

    let clearing = prior.is_some_and(ConnectionModel::has_vault_binding);
    if plan.has_vault_binding() || clearing {
        for (key, value) in [
            ("vaultConnection", &plan.vault_connection),
            ("vaultConfiguration", &plan.vault_configuration),
            ("saveInVault", &plan.save_in_vault),
        ] {
            let value = value.non_empty().unwrap_or_default();
            let value = if key == "saveInVault" && !value.is_empty() {
                normalize_bool_str(value)
            } else {
                value.to_string()
            };
            body.insert(key.into(), Value::String(value));
        }
    }

    for field in meta.fields {
        put(&mut body, field.api, field_value(field, plan, config).as_deref());
    }
    Ok(body)
}

fn overwrite(target: &mut Attr<String>, server: Option<String>) {
    if let Some(value) = server.filter(|v| !v.is_empty()) {
        *target = Attr::Known(value);
    }
}

/// Project a details block onto the model.
///
/// Starts from `prior`; a non-empty server value replaces the prior one and
/// anything the server leaves out is kept. Secret fields are never read back,
/// and write-only twins never reach state.
pub fn decode(
    meta: &'static ConnectorMetadata,
    details: &ConnectionDetails,
    prior: &ConnectionModel,
) -> ConnectionModel {
    let mut model = prior.clone();

    if let Some(key) = details.connection_key {
        model.connection_key = Attr::Known(key);
        model.id = Attr::Known(key.to_string());
    }
    overwrite(&mut model.connection_name, details.connection_name.clone());
    if !model.connection_type.is_known() {
        model.connection_type = Attr::Known(
            details
                .connection_type
                .clone()
                .unwrap_or_else(|| meta.connection_type.to_string()),
        );
    }
    overwrite(&mut model.description, details.block.get_str("description"));
    overwrite(&mut model.default_sav_roles, details.block.get_str("defaultsavroles"));
    overwrite(&mut model.email_template, details.block.get_str("emailtemplate"));
    overwrite(&mut model.vault_connection, details.block.get_str("vaultconnection"));
    overwrite(&mut model.vault_configuration, details.block.get_str("vaultconfiguration"));
    overwrite(
        &mut model.save_in_vault,
        details.block.get_str("saveinvault").map(|v| normalize_bool_str(&v)),
    );
    overwrite(&mut model.msg, details.msg.clone());
    overwrite(&mut model.error_code, details.error_code.clone());

    for field in meta.fields {
        let server = match field.kind {
            FieldKind::Secret => continue,
            FieldKind::Bool => details.field_text(field.api).map(|v| normalize_bool_str(&v)),
            FieldKind::Json => details.field_text(field.api).map(|server| {
                match model.attr(field.attr) {
                    Some(prior) if json_equivalent(prior, &server) => prior.to_string(),
                    _ => canonical_json(&server).unwrap_or(server),
                }
            }),
            FieldKind::Plain | FieldKind::Int => details.field_text(field.api),
        };
        if let Some(value) = server {
            model.set_attr(field.attr, value);
        }
    }

    model.strip_write_only();
    model
}

/// Attributes safe to expose when the caller did not ask for secrets.
pub fn redact_secrets(meta: &ConnectorMetadata, model: &mut ConnectionModel) {
    for field in meta.secret_fields() {
        model.attributes.remove(field.attr);
    }
    model.strip_write_only();
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_value(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(text: &str) -> Option<String> {
    serde_json::from_str::<Value>(text)
        .ok()
        .map(|value| sort_value(value).to_string())
}

/// Whether two strings hold the same JSON document.
pub fn json_equivalent(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<Value>(a),
        serde_json::from_str::<Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
