//! Endpoint codec
//!
//! Projects [`EndpointModel`] onto the flat `createEndpoint`/`updateEndpoint`
//! payload and back from a `getEndpoints` entry. Besides the plain field
//! table this handles the three structured quirks of the endpoint API:
//!
//! - enumerations stored as numeric codes (owner type, request option, show-on)
//! - `RoleTypeAsJson`, a map of role type to `opt__req__rq__sq__sh`
//! - `disableaccountrequest`, one JSON blob carrying four boolean flags

use std::collections::HashSet;
use std::sync::OnceLock;

use serde_json::{Map, Value, json};

use crate::client::LooseObject;
use crate::connectors::codec::{CodecError, canonical_json, json_equivalent};
use crate::connectors::metadata::{FieldKind, FieldSpec};
use crate::models::attr::{Attr, normalize_bool_str};
use crate::models::endpoint::{EmailTemplate, EndpointModel, MappedEndpoint, RequestableRoleType};

pub const CUSTOM_PROPERTY_COUNT: usize = 45;
pub const ACCOUNT_LABEL_COUNT: usize = 30;
pub const CUSTOM_LABEL_RANGE: std::ops::RangeInclusive<usize> = 31..=60;

/// Keys inside the `disableaccountrequest` blob, in model order.
pub const DISABLE_ACCOUNT_KEYS: [&str; 4] = [
    "DISABLENEWACCOUNT",
    "DISABLEREMOVEACCOUNT",
    "DISABLEMODIFYACCOUNT",
    "BLOCKINFLIGHTREQUEST",
];

/// Individual request keys for the same four flags.
const DISABLE_ACCOUNT_FIELDS: [&str; 4] = [
    "disableNewAccountRequestIfAccountExists",
    "disableRemoveAccount",
    "disableModifyAccount",
    "blockInflightRequest",
];

const ROLE_PART_SEPARATOR: &str = "__";

static OWNER_TYPES: &[(&str, &str)] = &[("1", "User"), ("2", "Usergroup")];

static REQUEST_OPTIONS: &[(&str, &str)] = &[("0", "None"), ("1", "Single"), ("2", "Multiple")];

static SHOW_ON: &[(&str, &str)] = &[
    ("1", "Application request"),
    ("2", "Role request"),
    ("3", "Access request"),
    ("4", "Account request"),
    ("5", "Request form"),
];

static ROLE_TYPES: &[(&str, &str)] = &[
    ("ENTERPRISE", "Enterprise"),
    ("ENABLER", "Enabler"),
    ("TRANSACTIONAL", "Transactional"),
    ("FIREFIGHTER", "Firefighter"),
    ("APPLICATION", "Application"),
    ("ENTITLEMENT", "Entitlement"),
];

static ENDPOINT_FLAG_FIELDS: &[FieldSpec] = &[
    FieldSpec::boolean("enable_copy_access", "enableCopyAccess"),
    FieldSpec::boolean("requestable", "requestable"),
    FieldSpec::boolean("create_ent_task_for_remove_acc", "createEntTaskforRemoveAcc"),
    FieldSpec::boolean("allow_remove_all_role_on_request", "allowRemoveAllRoleOnRequest"),
    FieldSpec::plain("out_of_band_action", "outOfBandAction"),
    FieldSpec::plain("user_account_correlation_rule", "userAccountCorrelationRule"),
    FieldSpec::plain("parent_account_pattern", "parentAccountPattern"),
    FieldSpec::plain("parent_endpoint", "parentEndpoint"),
    FieldSpec::plain("child_endpoints", "childEndpoints"),
    FieldSpec::plain("service_account_name_rule", "serviceAccountNameRule"),
    FieldSpec::plain("service_account_access_query", "serviceAccountAccessQuery"),
    FieldSpec::plain("change_password_access_query", "changePasswordAccessQuery"),
    FieldSpec::plain("allow_change_password_sql_query", "allowChangePasswordSqlquery"),
    FieldSpec::plain("primary_account_type", "primaryAccountType"),
    FieldSpec::plain("account_type_no_password_change", "accountTypeNoPasswordChange"),
    FieldSpec::plain("account_type_no_deprovision", "accountTypeNoDeprovision"),
    FieldSpec::plain("account_name_rule", "accountNameRule"),
    FieldSpec::plain("account_name_validator_regex", "accountNameValidatorRegex"),
    FieldSpec::plain("enable_account_name_rule", "enableAccountNameRule"),
    FieldSpec::plain("user_account_name_rule", "userAccountNameRule"),
    FieldSpec::plain("ent_type_label", "entTypeLabel"),
    FieldSpec::json("status_config", "statusConfig"),
    FieldSpec::json("plugin_configs", "pluginConfigs"),
    FieldSpec::json("task_email_templates", "taskEmailTemplates"),
];

/// Attribute name, API name and kind of one endpoint field.
#[derive(Debug, Clone)]
struct EndpointField {
    attr: String,
    api: String,
    kind: FieldKind,
}

/// Flag table plus the generated custom-property namespace.
///
/// Labels 1-30 keep the `account_custom_property_{i}_label` spelling; labels
/// 31-60 are `custom_property{i}_label`.
fn endpoint_fields() -> &'static [EndpointField] {
    static FIELDS: OnceLock<Vec<EndpointField>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        let mut fields: Vec<EndpointField> = ENDPOINT_FLAG_FIELDS
            .iter()
            .map(|spec| EndpointField {
                attr: spec.attr.to_string(),
                api: spec.api.to_string(),
                kind: spec.kind,
            })
            .collect();
        for i in 1..=CUSTOM_PROPERTY_COUNT {
            fields.push(EndpointField {
                attr: format!("custom_property{i}"),
                api: format!("customproperty{i}"),
                kind: FieldKind::Plain,
            });
        }
        for i in 1..=ACCOUNT_LABEL_COUNT {
            fields.push(EndpointField {
                attr: format!("account_custom_property_{i}_label"),
                api: format!("accountCustomProperty{i}Label"),
                kind: FieldKind::Plain,
            });
        }
        for i in CUSTOM_LABEL_RANGE {
            fields.push(EndpointField {
                attr: format!("custom_property{i}_label"),
                api: format!("customproperty{i}Label"),
                kind: FieldKind::Plain,
            });
        }
        fields
    })
}

fn known_attrs() -> &'static HashSet<String> {
    static KNOWN: OnceLock<HashSet<String>> = OnceLock::new();
    KNOWN.get_or_init(|| endpoint_fields().iter().map(|f| f.attr.clone()).collect())
}

/// Server code to display name; unknown codes pass through.
fn to_display(table: &[(&str, &str)], code: &str) -> String {
    table
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Display name to server code; unknown names pass through.
fn to_code(table: &[(&str, &str)], name: &str) -> String {
    table
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(code, _)| code.to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn owner_type_name(code: &str) -> String {
    to_display(OWNER_TYPES, code)
}

pub fn request_option_name(code: &str) -> String {
    to_display(REQUEST_OPTIONS, code)
}

pub fn show_on_name(code: &str) -> String {
    to_display(SHOW_ON, code)
}

pub fn role_type_name(code: &str) -> String {
    to_display(ROLE_TYPES, code)
}

/// Parse `RoleTypeAsJson` into role records.
///
/// Each value is `opt__req__rq__sq__sh`; missing positions decode as empty
/// strings and only `"1"` marks the role type as required. The server map
/// carries no order, so records follow `order` (usually the prior list) and
/// role types it does not mention come after, in server order.
pub fn decode_role_types(raw: &str, order: &[RequestableRoleType]) -> Option<Vec<RequestableRoleType>> {
    let Value::Object(map) = serde_json::from_str::<Value>(raw).ok()? else {
        return None;
    };
    let mut roles: Vec<RequestableRoleType> = map
        .iter()
        .map(|(role_code, encoded)| {
            let encoded = match encoded {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            let parts: Vec<&str> = encoded.split(ROLE_PART_SEPARATOR).collect();
            let part = |i: usize| parts.get(i).copied().unwrap_or_default();
            RequestableRoleType {
                role_type: role_type_name(role_code),
                request_option: request_option_name(part(0)),
                required: part(1) == "1",
                requested_query: part(2).to_string(),
                selected_query: part(3).to_string(),
                show_on: show_on_name(part(4)),
            }
        })
        .collect();
    let rank = |role: &RequestableRoleType| {
        order
            .iter()
            .position(|known| known.role_type.eq_ignore_ascii_case(&role.role_type))
            .unwrap_or(order.len())
    };
    roles.sort_by_key(rank);
    Some(roles)
}

/// Inverse of [`decode_role_types`].
pub fn encode_role_types(roles: &[RequestableRoleType]) -> String {
    let mut map = Map::new();
    for role in roles {
        let encoded = [
            to_code(REQUEST_OPTIONS, &role.request_option),
            if role.required { "1" } else { "0" }.to_string(),
            role.requested_query.clone(),
            role.selected_query.clone(),
            to_code(SHOW_ON, &role.show_on),
        ]
        .join(ROLE_PART_SEPARATOR);
        map.insert(to_code(ROLE_TYPES, &role.role_type), Value::String(encoded));
    }
    Value::Object(map).to_string()
}

/// Split the `disableaccountrequest` blob into the four model flags.
pub fn decode_disable_account(raw: &str) -> Option<[Option<String>; 4]> {
    let blob = LooseObject::from_value(serde_json::from_str::<Value>(raw).ok()?)?;
    Some(DISABLE_ACCOUNT_KEYS.map(|key| blob.get_str(key).map(|v| normalize_bool_str(&v))))
}

/// Join the four model flags into the `disableaccountrequest` blob.
///
/// Returns `None` when no flag is set.
pub fn encode_disable_account(model: &EndpointModel) -> Option<String> {
    let flags = model.disable_flags();
    if flags.iter().all(|flag| flag.non_empty().is_none()) {
        return None;
    }
    let mut blob = Map::new();
    for (key, flag) in DISABLE_ACCOUNT_KEYS.iter().zip(flags) {
        let value = flag.non_empty().map(normalize_bool_str).unwrap_or_else(|| "false".to_string());
        blob.insert(key.to_string(), Value::String(value));
    }
    Some(Value::Object(blob).to_string())
}

/// Local checks run before any remote call.
pub fn validate(model: &EndpointModel) -> Result<(), CodecError> {
    for key in model.attributes.keys() {
        if !known_attrs().contains(key) {
            return Err(CodecError::UnknownAttribute {
                family: "endpoint",
                attr: key.clone(),
            });
        }
    }
    if let Some(config) = model.connection_config.non_empty()
        && let Err(err) = serde_json::from_str::<Value>(config)
    {
        return Err(CodecError::InvalidJson {
            attr: "connection_config".to_string(),
            reason: err.to_string(),
        });
    }
    for field in endpoint_fields() {
        if field.kind == FieldKind::Json
            && let Some(value) = model.attr(&field.attr)
            && let Err(err) = serde_json::from_str::<Value>(value)
        {
            return Err(CodecError::InvalidJson {
                attr: field.attr.clone(),
                reason: err.to_string(),
            });
        }
    }
    Ok(())
}

fn put(body: &mut Map<String, Value>, key: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        body.insert(key.to_string(), Value::String(value));
    }
}

/// Build the create/update payload.
pub fn encode(plan: &EndpointModel) -> Result<Map<String, Value>, CodecError> {
    let name = plan
        .endpoint_name
        .non_empty()
        .ok_or(CodecError::MissingIdentity)?;

    let mut body = Map::new();
    body.insert("endpointname".into(), Value::String(name.to_string()));
    put(&mut body, "displayName", plan.display_name.non_empty().map(str::to_string));
    put(&mut body, "securitysystem", plan.security_system.non_empty().map(str::to_string));
    put(&mut body, "description", plan.description.non_empty().map(str::to_string));
    put(
        &mut body,
        "ownerType",
        plan.owner_type.non_empty().map(|v| to_code(OWNER_TYPES, v)),
    );
    put(&mut body, "owner", plan.owner.non_empty().map(str::to_string));
    put(
        &mut body,
        "resourceOwnerType",
        plan.resource_owner_type.non_empty().map(|v| to_code(OWNER_TYPES, v)),
    );
    put(&mut body, "resourceOwner", plan.resource_owner.non_empty().map(str::to_string));
    put(&mut body, "accessquery", plan.access_query.non_empty().map(str::to_string));
    put(&mut body, "connectionconfig", plan.connection_config.non_empty().map(str::to_string));

    for (key, flag) in DISABLE_ACCOUNT_FIELDS.iter().zip(plan.disable_flags()) {
        put(&mut body, key, flag.non_empty().map(normalize_bool_str));
    }
    put(&mut body, "disableaccountrequest", encode_disable_account(plan));

    if let Some(roles) = plan.requestable_role_types.as_known() {
        body.insert("RoleTypeAsJson".into(), Value::String(encode_role_types(roles)));
    }
    if let Some(mapped) = plan.mapped_endpoints.as_known() {
        let entries = mapped
            .iter()
            .map(|m| {
                json!({
                    "securitySystem": m.security_system,
                    "endpoint": m.endpoint,
                    "requestable": m.requestable,
                    "operation": m.operation,
                })
            })
            .collect();
        body.insert("mappedEndpoints".into(), Value::Array(entries));
    }
    if let Some(templates) = plan.email_templates.as_known() {
        let entries = templates
            .iter()
            .map(|t| {
                json!({
                    "emailTemplateType": t.email_template_type,
                    "taskType": t.task_type,
                    "emailTemplate": t.email_template,
                })
            })
            .collect();
        body.insert("emailTemplate".into(), Value::Array(entries));
    }

    for field in endpoint_fields() {
        let value = plan.attr(&field.attr).map(|v| match field.kind {
            FieldKind::Bool => normalize_bool_str(v),
            _ => v.to_string(),
        });
        put(&mut body, &field.api, value);
    }
    Ok(body)
}

fn overwrite(target: &mut Attr<String>, server: Option<String>) {
    if let Some(value) = server.filter(|v| !v.is_empty()) {
        *target = Attr::Known(value);
    }
}

/// Semantically equal JSON keeps the prior spelling; otherwise canonical form.
fn reconcile_json(prior: Option<&str>, server: String) -> String {
    match prior {
        Some(prior) if json_equivalent(prior, &server) => prior.to_string(),
        _ => canonical_json(&server).unwrap_or(server),
    }
}

/// Project one `getEndpoints` entry onto the model, keeping prior values the
/// server leaves out.
pub fn decode(entry: &LooseObject, prior: &EndpointModel) -> EndpointModel {
    let mut model = prior.clone();

    overwrite(&mut model.endpoint_name, entry.get_str("endpointname"));
    if let Some(name) = model.endpoint_name.non_empty() {
        model.id = Attr::Known(EndpointModel::state_id(name));
    }
    overwrite(&mut model.display_name, entry.get_str("displayName"));
    overwrite(&mut model.security_system, entry.get_str("securitysystem"));
    overwrite(&mut model.description, entry.get_str("description"));
    overwrite(&mut model.owner_type, entry.get_str("ownerType").map(|v| owner_type_name(&v)));
    overwrite(&mut model.owner, entry.get_str("owner"));
    overwrite(
        &mut model.resource_owner_type,
        entry.get_str("resourceOwnerType").map(|v| owner_type_name(&v)),
    );
    overwrite(&mut model.resource_owner, entry.get_str("resourceOwner"));
    overwrite(&mut model.access_query, entry.get_str("accessquery"));

    if let Some(config) = entry.get_text("connectionconfig").filter(|v| !v.is_empty()) {
        let value = reconcile_json(model.connection_config.non_empty(), config);
        model.connection_config = Attr::Known(value);
    }

    let blob_flags = entry
        .get_text("disableaccountrequest")
        .and_then(|raw| decode_disable_account(&raw));
    for (i, flag) in model.disable_flags_mut().into_iter().enumerate() {
        let server = match blob_flags {
            Some(ref flags) => flags[i].clone(),
            None => entry
                .get_str(DISABLE_ACCOUNT_FIELDS[i])
                .map(|v| normalize_bool_str(&v)),
        };
        overwrite(flag, server);
    }

    let prior_roles = model.requestable_role_types.as_known().cloned().unwrap_or_default();
    if let Some(roles) = entry
        .get_text("RoleTypeAsJson")
        .and_then(|raw| decode_role_types(&raw, &prior_roles))
    {
        model.requestable_role_types = Attr::Known(roles);
    }

    let mapped = entry.objects("mappedEndpoints");
    if !mapped.is_empty() {
        model.mapped_endpoints = Attr::Known(
            mapped
                .iter()
                .map(|m| MappedEndpoint {
                    security_system: m.get_str("securitySystem").unwrap_or_default(),
                    endpoint: m.get_str("endpoint").unwrap_or_default(),
                    requestable: m.get_str("requestable").map(|v| normalize_bool_str(&v)).unwrap_or_default(),
                    operation: m.get_str("operation").unwrap_or_default(),
                })
                .collect(),
        );
    }

    let templates = entry.objects("emailTemplate");
    if !templates.is_empty() {
        model.email_templates = Attr::Known(
            templates
                .iter()
                .map(|t| EmailTemplate {
                    email_template_type: t.get_str("emailTemplateType").unwrap_or_default(),
                    task_type: t.get_str("taskType").unwrap_or_default(),
                    email_template: t.get_str("emailTemplate").unwrap_or_default(),
                })
                .collect(),
        );
    }

    for field in endpoint_fields() {
        let Some(server) = entry.get_text(&field.api).filter(|v| !v.is_empty()) else {
            continue;
        };
        let value = match field.kind {
            FieldKind::Bool => normalize_bool_str(&server),
            FieldKind::Json => reconcile_json(model.attr(&field.attr), server),
            _ => server,
        };
        model.set_attr(field.attr.clone(), value);
    }

    overwrite(&mut model.msg, entry.msg());
    overwrite(&mut model.error_code, entry.error_code());
    model
}

/// Find the entry for `name` in a `getEndpoints` reply.
pub fn find_endpoint(reply: &LooseObject, name: &str) -> Option<LooseObject> {
    reply
        .objects("endpoints")
        .into_iter()
        .find(|entry| entry.get_str("endpointname").is_some_and(|n| n == name))
}
