//! Datasources
//!
//! Read-only lookups: one connection datasource per connector family and an
//! endpoint listing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::connection::{Lookup, lookup_connection};
use super::endpoint::{ENDPOINT_FAMILY, fetch_endpoints};
use super::{ClientSlot, codec_error, rejected, respond};
use crate::client::{ConnectionLookup, EndpointFilter};
use crate::connectors::{CodecError, VariantCodec, codec};
use crate::endpoint;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{self, DataSource, ProviderData, ReadDataRequest, ResourceResponse};
use crate::models::attr::{Attr, normalize_bool_str};
use crate::models::connection::ConnectionModel;
use crate::models::endpoint::EndpointModel;
use crate::provider::ProviderClients;
use crate::telemetry::OperationContext;

pub const ENDPOINTS_DATASOURCE_TYPE: &str = "iga_endpoints_datasource";

const AUTHENTICATE_ATTR: &str = "authenticate";

/// Looks up one connection of a family by name or key.
pub struct ConnectionDataSource {
    codec: Arc<dyn VariantCodec>,
    clients: ClientSlot,
}

impl ConnectionDataSource {
    pub fn new(codec: Arc<dyn VariantCodec>) -> Self {
        Self {
            codec,
            clients: ClientSlot::default(),
        }
    }

    pub fn with_clients(codec: Arc<dyn VariantCodec>, clients: Arc<ProviderClients>) -> Self {
        Self {
            codec,
            clients: ClientSlot(Some(clients)),
        }
    }

    fn family(&self) -> &'static str {
        self.codec.family().slug()
    }

    async fn read_inner(&self, ctx: &OperationContext, request: ReadDataRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Read;
        let mut config: ConnectionModel = host::extract(family, op, ErrorKind::ConfigExtraction, &request.config)?;
        let authenticate = config
            .attributes
            .remove(AUTHENTICATE_ATTR)
            .and_then(Attr::known)
            .is_some_and(|flag| normalize_bool_str(&flag) == "true");

        let lookup = match (config.connection_name.non_empty(), config.connection_key.as_known()) {
            (Some(name), _) => {
                ctx.bind_connection_name(name);
                ConnectionLookup::Name(name.to_string())
            }
            (None, Some(key)) => ConnectionLookup::Key(*key),
            (None, None) => {
                return Err(ProviderError::new(
                    family,
                    op,
                    ErrorKind::MissingIdentifier,
                    "connection_name or connection_key is required",
                    "",
                ));
            }
        };

        let clients = self.clients.get(family, op)?;
        let details = match lookup_connection(&clients, &request.cancel, &lookup)
            .await
            .map_err(|err| err.into_provider_error(family, op, "failed to read connection"))?
        {
            Lookup::Found(details) if details.is_success() => details,
            Lookup::Found(details) => {
                return Err(ProviderError::new(
                    family,
                    op,
                    ErrorKind::ApiError,
                    "IGA rejected the lookup",
                    format!(
                        "errorCode {}: {}",
                        details.error_code.unwrap_or_default(),
                        details.msg.unwrap_or_default()
                    ),
                ));
            }
            Lookup::Empty(reply) if !reply.is_success() => {
                return Err(rejected(family, op, "IGA rejected the lookup", &reply));
            }
            Lookup::Absent | Lookup::Empty(_) => {
                return Err(ProviderError::new(
                    family,
                    op,
                    ErrorKind::ReadFailed,
                    "connection not found",
                    format!("no connection matches {lookup:?}"),
                ));
            }
        };

        let meta = self.codec.metadata();
        if !details.matches_family(meta) {
            let actual = details
                .connection_type
                .clone()
                .or_else(|| details.variant.clone())
                .unwrap_or_default();
            return Err(codec_error(
                family,
                op,
                CodecError::TypeMismatch {
                    expected: meta.connection_type,
                    actual,
                },
            ));
        }

        let mut model = self.codec.decode(&details, &config);
        let mut response = if authenticate {
            for field in meta.secret_fields() {
                if let Some(value) = details.field_text(field.api) {
                    model.set_attr(field.attr, value);
                }
            }
            ResourceResponse::default()
        } else {
            codec::redact_secrets(meta, &mut model);
            ResourceResponse::default().warn(
                "sensitive attributes omitted",
                "set authenticate = true to include sensitive attributes in the result",
            )
        };
        model.resolve_unknowns();
        let mut state = host::encode_state(family, op, &model)?;
        if let Value::Object(ref mut map) = state {
            map.insert(AUTHENTICATE_ATTR.to_string(), Value::Bool(authenticate));
        }
        debug!(authenticate, "connection datasource read");
        response.state = Some(state);
        Ok(response)
    }
}

#[async_trait]
impl DataSource for ConnectionDataSource {
    fn type_name(&self) -> String {
        self.codec.family().datasource_type_name()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(self.family(), provider_data)
    }

    async fn read(&self, request: ReadDataRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Read);
        respond(ctx.scope(self.read_inner(&ctx, request)).await)
    }
}

/// Filter accepted by the endpoints datasource.
#[derive(Debug, Clone, Default, Deserialize)]
struct EndpointsQuery {
    #[serde(default)]
    endpoint_name: Attr<String>,
    #[serde(default)]
    security_system: Attr<String>,
    #[serde(default)]
    max: Attr<u32>,
    #[serde(default)]
    offset: Attr<u32>,
}

#[derive(Debug, Serialize)]
struct EndpointsState {
    endpoint_name: Attr<String>,
    security_system: Attr<String>,
    endpoints: Vec<EndpointModel>,
    msg: Attr<String>,
    error_code: Attr<String>,
}

/// Lists endpoints, optionally filtered by name and security system.
#[derive(Default)]
pub struct EndpointsDataSource {
    clients: ClientSlot,
}

impl EndpointsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: Arc<ProviderClients>) -> Self {
        Self {
            clients: ClientSlot(Some(clients)),
        }
    }

    async fn read_inner(&self, request: ReadDataRequest) -> Result<ResourceResponse, ProviderError> {
        let op = Operation::Read;
        let query: EndpointsQuery = host::extract(ENDPOINT_FAMILY, op, ErrorKind::ConfigExtraction, &request.config)?;
        let clients = self.clients.get(ENDPOINT_FAMILY, op)?;

        let filter = EndpointFilter {
            endpoint_name: query.endpoint_name.non_empty().map(str::to_string),
            security_system: query.security_system.non_empty().map(str::to_string),
            max: query.max.as_known().copied(),
            offset: query.offset.as_known().copied(),
        };
        let reply = fetch_endpoints(&clients, &request.cancel, &filter)
            .await
            .map_err(|err| err.into_provider_error(ENDPOINT_FAMILY, op, "failed to list endpoints"))?;
        if !reply.is_success() {
            return Err(rejected(ENDPOINT_FAMILY, op, "IGA rejected the lookup", &reply));
        }

        let endpoints: Vec<EndpointModel> = reply
            .objects("endpoints")
            .iter()
            .map(|entry| {
                let mut model = endpoint::decode(entry, &EndpointModel::default());
                model.resolve_unknowns();
                model
            })
            .collect();
        debug!(count = endpoints.len(), "endpoints listed");

        let state = EndpointsState {
            endpoint_name: query.endpoint_name,
            security_system: query.security_system,
            endpoints,
            msg: Attr::from_non_empty(reply.msg()),
            error_code: Attr::from_non_empty(reply.error_code()),
        };
        Ok(ResourceResponse::with_state(host::encode_state(ENDPOINT_FAMILY, op, &state)?))
    }
}

#[async_trait]
impl DataSource for EndpointsDataSource {
    fn type_name(&self) -> String {
        ENDPOINTS_DATASOURCE_TYPE.to_string()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(ENDPOINT_FAMILY, provider_data)
    }

    async fn read(&self, request: ReadDataRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Read);
        respond(ctx.scope(self.read_inner(request)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::OktaConnector;
    use crate::resources::connection::tests::{ScriptedApi, clients};
    use serde_json::json;

    fn okta_reply() -> Value {
        json!({
            "connectionname": "ok1",
            "connectionkey": 42,
            "connectiontype": "Okta",
            "errorCode": "0",
            "connectionattributes": {
                "OKTA_DOMAIN_URL": "https://acme.okta.com",
                "AUTHTOKEN": "server-secret"
            }
        })
    }

    #[tokio::test]
    async fn test_lookup_requires_identifier() {
        let api = ScriptedApi::with(vec![]);
        let source = ConnectionDataSource::with_clients(Arc::new(OktaConnector), clients(api.clone()));
        let response = source.read(ReadDataRequest { config: json!({}), ..Default::default() }).await;

        let code = response.diagnostics.errors().next().and_then(|d| d.code.clone());
        assert_eq!(code.as_deref(), Some("okta_read_missing_identifier"));
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_lookup_omits_secrets() {
        let api = ScriptedApi::with(vec![Ok(okta_reply())]);
        let source = ConnectionDataSource::with_clients(Arc::new(OktaConnector), clients(api));
        let response = source
            .read(ReadDataRequest { config: json!({ "connection_name": "ok1" }), ..Default::default() })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(response.diagnostics.warnings().count(), 1);
        let state = response.state.unwrap();
        assert_eq!(state["connection_key"], json!(42));
        assert_eq!(state["authenticate"], json!(false));
        assert!(state.get("auth_token").is_none_or(Value::is_null));
    }

    #[tokio::test]
    async fn test_authenticated_lookup_by_key_includes_secrets() {
        let api = ScriptedApi::with(vec![Ok(okta_reply())]);
        let source = ConnectionDataSource::with_clients(Arc::new(OktaConnector), clients(api));
        let response = source
            .read(ReadDataRequest {
                config: json!({ "connection_key": 42, "authenticate": true }),
                ..Default::default()
            })
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["connection_name"], json!("ok1"));
        assert_eq!(state["auth_token"], json!("server-secret"));
    }

    #[tokio::test]
    async fn test_endpoints_listing() {
        let api = ScriptedApi::with(vec![Ok(json!({
            "Endpoints": [
                { "endpointname": "ep1", "securitysystem": "sys1" },
                { "endpointname": "ep2", "securitysystem": "sys1" }
            ],
            "errorCode": "0",
            "msg": "Successful"
        }))]);
        let source = EndpointsDataSource::with_clients(clients(api));
        let response = source
            .read(ReadDataRequest { config: json!({ "security_system": "sys1" }), ..Default::default() })
            .await;

        let state = response.state.unwrap();
        let endpoints = state["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1]["id"], json!("endpoint-ep2"));
        assert_eq!(state["security_system"], json!("sys1"));
    }
}
