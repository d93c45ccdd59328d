//! Connection resource
//!
//! One instance per connector family, parametrised by the family's
//! [`VariantCodec`]. The IGA API only offers upsert, so create and update
//! share the same call; delete is a state-only tombstone.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ClientSlot, codec_error, rejected, respond, tombstone};
use crate::client::{ConnectionLookup, LooseObject};
use crate::connectors::{ConnectionDetails, VariantCodec};
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{
    self, CreateRequest, DeleteRequest, ImportRequest, ProviderData, ReadRequest, Resource,
    ResourceResponse, UpdateRequest,
};
use crate::models::attr::Attr;
use crate::models::connection::ConnectionModel;
use crate::provider::ProviderClients;
use crate::retry::RetryError;
use crate::telemetry::OperationContext;

/// Outcome of a `getConnectionDetails` lookup.
#[derive(Debug)]
pub(crate) enum Lookup {
    /// HTTP 412
    Absent,
    /// The reply carried a connection block.
    Found(ConnectionDetails),
    /// The reply carried no connection block.
    Empty(LooseObject),
}

pub(crate) async fn lookup_connection(
    clients: &ProviderClients,
    cancel: &CancellationToken,
    lookup: &ConnectionLookup,
) -> Result<Lookup, RetryError> {
    let api = &clients.api;
    let result = clients
        .retry
        .call(cancel, "get_connection_details", move |token| async move {
            api.get_connection_details(&token, lookup).await
        })
        .await;

    match result {
        Ok(reply) => Ok(match ConnectionDetails::from_reply(&reply) {
            Some(details) => Lookup::Found(details),
            None => Lookup::Empty(reply),
        }),
        Err(err) if err.is_not_found() => Ok(Lookup::Absent),
        Err(err) => Err(err),
    }
}

pub struct ConnectionResource {
    codec: Arc<dyn VariantCodec>,
    clients: ClientSlot,
}

impl ConnectionResource {
    pub fn new(codec: Arc<dyn VariantCodec>) -> Self {
        Self {
            codec,
            clients: ClientSlot::default(),
        }
    }

    /// Resource already bound to configured clients.
    pub fn with_clients(codec: Arc<dyn VariantCodec>, clients: Arc<ProviderClients>) -> Self {
        Self {
            codec,
            clients: ClientSlot(Some(clients)),
        }
    }

    fn family(&self) -> &'static str {
        self.codec.family().slug()
    }

    async fn upsert(
        &self,
        clients: &ProviderClients,
        cancel: &CancellationToken,
        operation: Operation,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ProviderError> {
        let family = self.family();
        let api = &clients.api;
        let reply = clients
            .retry
            .call(cancel, "create_or_update_connection", move |token| async move {
                api.create_or_update_connection(&token, body).await
            })
            .await
            .map_err(|err| err.into_provider_error(family, operation, "connection request failed"))?;

        if !reply.is_success() {
            return Err(rejected(family, operation, "IGA rejected the connection", &reply));
        }
        Ok(reply)
    }

    fn finish(&self, operation: Operation, mut model: ConnectionModel) -> Result<ResourceResponse, ProviderError> {
        model.resolve_unknowns();
        model.strip_write_only();
        Ok(ResourceResponse::with_state(host::encode_state(
            self.family(),
            operation,
            &model,
        )?))
    }

    async fn create_inner(&self, ctx: &OperationContext, request: CreateRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Create;
        let clients = self.clients.get(family, op)?;
        let config: ConnectionModel = host::extract(family, op, ErrorKind::ConfigExtraction, &request.config)?;
        let plan: ConnectionModel = host::extract(family, op, ErrorKind::PlanExtraction, &request.plan)?;

        let name = plan
            .connection_name
            .non_empty()
            .ok_or_else(|| ProviderError::new(family, op, ErrorKind::PlanExtraction, "connection_name is required", ""))?
            .to_string();
        ctx.bind_connection_name(&name);
        self.codec.validate(&config).map_err(|err| codec_error(family, op, err))?;

        let _guard = clients.locks.acquire(&self.type_name(), &name).await;

        let existing = lookup_connection(&clients, &request.cancel, &ConnectionLookup::Name(name.clone()))
            .await
            .map_err(|err| err.into_provider_error(family, op, "failed to check for an existing connection"))?;
        if let Lookup::Found(details) = existing
            && details.is_success()
        {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::DuplicateName,
                "a connection with this name already exists",
                format!(
                    "connection '{name}' (key {}) already exists; import it instead of creating it",
                    details.connection_key.map(|k| k.to_string()).unwrap_or_default()
                ),
            ));
        }

        let body = self.codec.encode(&plan, &config, None).map_err(|err| codec_error(family, op, err))?;
        let reply = self.upsert(&clients, &request.cancel, op, &body).await?;

        let mut state = plan;
        if let Some(key) = reply.get_i64("connectionkey") {
            state.connection_key = Attr::Known(key);
            state.id = Attr::Known(key.to_string());
        } else if let Lookup::Found(details) =
            lookup_connection(&clients, &request.cancel, &ConnectionLookup::Name(name.clone()))
                .await
                .map_err(|err| err.into_provider_error(family, op, "failed to read the new connection"))?
        {
            state = self.codec.decode(&details, &state);
        }
        if !state.connection_type.is_known() {
            state.connection_type = Attr::text(self.codec.metadata().connection_type);
        }
        state.msg = Attr::from_non_empty(reply.msg());
        state.error_code = Attr::from_non_empty(reply.error_code());

        info!(connection_key = ?state.connection_key.as_known(), "connection created");
        self.finish(op, state)
    }

    async fn read_inner(&self, ctx: &OperationContext, request: ReadRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Read;
        let clients = self.clients.get(family, op)?;
        let state: ConnectionModel = host::extract(family, op, ErrorKind::StateExtraction, &request.state)?;
        let name = state
            .connection_name
            .non_empty()
            .ok_or_else(|| {
                ProviderError::new(family, op, ErrorKind::StateExtraction, "connection_name is missing from state", "")
            })?
            .to_string();
        ctx.bind_connection_name(&name);

        let _guard = clients.locks.acquire(&self.type_name(), &name).await;

        let lookup = lookup_connection(&clients, &request.cancel, &ConnectionLookup::Name(name.clone()))
            .await
            .map_err(|err| err.into_provider_error(family, op, "failed to read connection"))?;

        let details = match lookup {
            Lookup::Absent => {
                info!("connection no longer exists, removing from state");
                return Ok(ResourceResponse::removed().warn(
                    "connection not found",
                    format!("connection '{name}' was not found in IGA and has been removed from state"),
                ));
            }
            Lookup::Empty(reply) if !reply.is_success() => {
                return Err(rejected(family, op, "IGA rejected the lookup", &reply));
            }
            Lookup::Empty(_) => {
                return Ok(ResourceResponse::removed().warn(
                    "connection not found",
                    format!("connection '{name}' was not found in IGA and has been removed from state"),
                ));
            }
            Lookup::Found(details) => details,
        };

        if !details.is_success() {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::ApiError,
                "IGA rejected the lookup",
                format!(
                    "errorCode {}: {}",
                    details.error_code.clone().unwrap_or_default(),
                    details.msg.clone().unwrap_or_default()
                ),
            ));
        }

        let meta = self.codec.metadata();
        if !details.matches_family(meta) {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::TypeMismatch,
                "connection belongs to a different connector family",
                format!(
                    "connection '{name}' is of type {}, expected {}",
                    details
                        .connection_type
                        .clone()
                        .or(details.variant.clone())
                        .unwrap_or_default(),
                    meta.connection_type
                ),
            ));
        }

        let model = self.codec.decode(&details, &state);
        debug!("connection refreshed from IGA");
        self.finish(op, model)
    }

    async fn update_inner(&self, ctx: &OperationContext, request: UpdateRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Update;
        let config: ConnectionModel = host::extract(family, op, ErrorKind::ConfigExtraction, &request.config)?;
        let plan: ConnectionModel = host::extract(family, op, ErrorKind::PlanExtraction, &request.plan)?;
        let state: ConnectionModel = host::extract(family, op, ErrorKind::StateExtraction, &request.state)?;

        let name = state
            .connection_name
            .non_empty()
            .ok_or_else(|| {
                ProviderError::new(family, op, ErrorKind::StateExtraction, "connection_name is missing from state", "")
            })?
            .to_string();
        ctx.bind_connection_name(&name);

        let planned_name = plan.connection_name.non_empty().unwrap_or_default();
        if planned_name != name {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::NameImmutable,
                "connection_name cannot be changed",
                format!("'{name}' -> '{planned_name}'; create a new connection instead"),
            ));
        }
        if let (Some(before), Some(after)) = (state.connection_type.non_empty(), plan.connection_type.non_empty())
            && !before.eq_ignore_ascii_case(after)
        {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::TypeImmutable,
                "connection_type cannot be changed",
                format!("'{before}' -> '{after}'"),
            ));
        }

        let clients = self.clients.get(family, op)?;
        self.codec.validate(&config).map_err(|err| codec_error(family, op, err))?;
        let _guard = clients.locks.acquire(&self.type_name(), &name).await;

        let body = self
            .codec
            .encode(&plan, &config, Some(&state))
            .map_err(|err| codec_error(family, op, err))?;
        let reply = self.upsert(&clients, &request.cancel, op, &body).await?;

        // Read back so server-side normalisation lands in state.
        let mut prior = plan;
        prior.id = state.id.clone();
        prior.connection_key = state.connection_key.clone();
        if let Some(key) = reply.get_i64("connectionkey") {
            prior.connection_key = Attr::Known(key);
            prior.id = Attr::Known(key.to_string());
        }
        prior.msg = Attr::from_non_empty(reply.msg());
        prior.error_code = Attr::from_non_empty(reply.error_code());

        let model = match lookup_connection(&clients, &request.cancel, &ConnectionLookup::Name(name.clone()))
            .await
            .map_err(|err| err.into_provider_error(family, op, "failed to read connection after update"))?
        {
            Lookup::Found(details) if details.is_success() => self.codec.decode(&details, &prior),
            _ => {
                return Err(ProviderError::new(
                    family,
                    op,
                    ErrorKind::UpdateFailed,
                    "connection could not be read after update",
                    format!("connection '{name}' was not returned by IGA"),
                ));
            }
        };

        info!("connection updated");
        self.finish(op, model)
    }

    fn delete_inner(&self, ctx: &OperationContext, request: DeleteRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Delete;
        let state: ConnectionModel = host::extract(family, op, ErrorKind::StateExtraction, &request.state)?;
        let name = state.connection_name.non_empty().unwrap_or_default();
        tombstone(ctx, "connection", name)
    }

    fn import_inner(&self, ctx: &OperationContext, request: ImportRequest) -> Result<ResourceResponse, ProviderError> {
        let family = self.family();
        let op = Operation::Import;
        let name = request.id.trim();
        if name.is_empty() {
            return Err(ProviderError::new(
                family,
                op,
                ErrorKind::MissingIdentifier,
                "import id must be the connection name",
                "",
            ));
        }
        ctx.bind_connection_name(name);
        Ok(ResourceResponse::with_state(json!({ "connection_name": name })))
    }
}

#[async_trait]
impl Resource for ConnectionResource {
    fn type_name(&self) -> String {
        self.codec.family().resource_type_name()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(self.family(), provider_data)
    }

    fn validate_config(&self, config: &Value) -> Result<(), ProviderError> {
        let family = self.family();
        let model: ConnectionModel =
            host::extract(family, Operation::Validate, ErrorKind::ConfigExtraction, config)?;
        self.codec
            .validate(&model)
            .map_err(|err| codec_error(family, Operation::Validate, err))
    }

    async fn create(&self, request: CreateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Create);
        respond(ctx.scope(self.create_inner(&ctx, request)).await)
    }

    async fn read(&self, request: ReadRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Read);
        respond(ctx.scope(self.read_inner(&ctx, request)).await)
    }

    async fn update(&self, request: UpdateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Update);
        respond(ctx.scope(self.update_inner(&ctx, request)).await)
    }

    async fn delete(&self, request: DeleteRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Delete);
        respond(ctx.scope(async { self.delete_inner(&ctx, request) }).await)
    }

    async fn import_state(&self, request: ImportRequest) -> ResourceResponse {
        let ctx = OperationContext::new(self.family(), Operation::Import);
        respond(ctx.scope(async { self.import_inner(&ctx, request) }).await)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::{ApiCallError, EndpointFilter, IgaApi, SchemaUpload};
    use crate::config::ACCEPTANCE_TEST_VAR;
    use crate::connectors::{OktaConnector, SalesforceConnector};
    use crate::host::Severity;
    use crate::retry::RetryEngine;
    use crate::token_refresh::testing::{CountingIssuer, seeded_store};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serializes tests that set or clear the acceptance-test variable.
    pub(crate) static ACCEPTANCE_ENV: Mutex<()> = Mutex::new(());

    /// Scripted [`IgaApi`] that records every call.
    #[derive(Default)]
    pub(crate) struct ScriptedApi {
        pub calls: Mutex<Vec<(String, String)>>,
        pub replies: Mutex<VecDeque<Result<LooseObject, ApiCallError>>>,
    }

    impl ScriptedApi {
        pub fn with(replies: Vec<Result<Value, ApiCallError>>) -> Arc<Self> {
            let replies = replies
                .into_iter()
                .map(|r| r.map(|v| LooseObject::from_value(v).unwrap()))
                .collect();
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            })
        }

        fn next(&self, op: &str, token: &str) -> Result<LooseObject, ApiCallError> {
            self.calls.lock().unwrap().push((op.to_string(), token.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiCallError::new(Some(500), "unscripted call")))
        }

        pub fn ops(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(op, _)| op.clone()).collect()
        }
    }

    #[async_trait]
    impl IgaApi for ScriptedApi {
        async fn create_or_update_connection(&self, token: &str, _: &Map<String, Value>) -> Result<LooseObject, ApiCallError> {
            self.next("upsert", token)
        }
        async fn get_connection_details(&self, token: &str, _: &ConnectionLookup) -> Result<LooseObject, ApiCallError> {
            self.next("details", token)
        }
        async fn create_endpoint(&self, token: &str, _: &Map<String, Value>) -> Result<LooseObject, ApiCallError> {
            self.next("create_endpoint", token)
        }
        async fn update_endpoint(&self, token: &str, _: &Map<String, Value>) -> Result<LooseObject, ApiCallError> {
            self.next("update_endpoint", token)
        }
        async fn get_endpoints(&self, token: &str, _: &EndpointFilter) -> Result<LooseObject, ApiCallError> {
            self.next("get_endpoints", token)
        }
        async fn upload_schema_file(&self, token: &str, _: &SchemaUpload) -> Result<LooseObject, ApiCallError> {
            self.next("upload", token)
        }
        async fn export_transport_package(&self, token: &str, _: &Map<String, Value>) -> Result<LooseObject, ApiCallError> {
            self.next("export", token)
        }
    }

    pub(crate) fn clients(api: Arc<ScriptedApi>) -> Arc<ProviderClients> {
        let store = seeded_store(Arc::new(CountingIssuer::new()));
        Arc::new(ProviderClients::new(api, RetryEngine::new(Arc::new(store))))
    }

    fn not_found() -> ApiCallError {
        ApiCallError::new(Some(412), "not found")
    }

    fn error_code(response: &ResourceResponse) -> Option<String> {
        response.diagnostics.errors().next().and_then(|d| d.code.clone())
    }

    #[tokio::test]
    async fn test_create_sets_computed_fields_and_drops_twins() {
        let api = ScriptedApi::with(vec![
            Err(not_found()),
            Ok(json!({ "connectionKey": 42, "errorCode": "0", "msg": "success" })),
        ]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api.clone()));

        let plan = json!({ "connection_name": "ok1", "import_url": "https://okta.example.com", "auth_token_wo": "t" });
        let response = resource
            .create(CreateRequest { config: plan.clone(), plan, ..Default::default() })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["id"], json!("42"));
        assert_eq!(state["connection_key"], json!(42));
        assert_eq!(state["connection_type"], json!("Okta"));
        assert_eq!(state["import_url"], json!("https://okta.example.com"));
        assert!(state.get("auth_token_wo").is_none());
        assert_eq!(api.ops(), vec!["details", "upsert"]);
    }

    #[tokio::test]
    async fn test_create_api_error_is_sanitized() {
        let api = ScriptedApi::with(vec![
            Err(not_found()),
            Ok(json!({ "errorCode": "1", "msg": "bad request password=hunter2" })),
        ]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api));
        let plan = json!({ "connection_name": "ok1" });
        let response = resource
            .create(CreateRequest { config: plan.clone(), plan, ..Default::default() })
            .await;

        assert_eq!(error_code(&response).as_deref(), Some("okta_create_api_error"));
        let detail = &response.diagnostics.errors().next().unwrap().detail;
        assert!(!detail.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_create_rejects_conflicting_twins_before_calls() {
        let api = ScriptedApi::with(vec![]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api.clone()));
        let plan = json!({ "connection_name": "ok1", "auth_token": "a", "auth_token_wo": "b" });
        let response = resource
            .create(CreateRequest { config: plan.clone(), plan, ..Default::default() })
            .await;

        assert_eq!(error_code(&response).as_deref(), Some("okta_create_invalid_config"));
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_read_preserves_write_only_values() {
        let api = ScriptedApi::with(vec![Ok(json!({
            "Connectionkey": 42,
            "Connectionname": "ok1",
            "Connectiontype": "Okta",
            "Connectionattributes": { "IMPORTURL": "https://new.example.com", "AUTHTOKEN": null },
            "Errorcode": 0
        }))]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api));
        let state = json!({ "connection_name": "ok1", "auth_token": "keep", "import_url": "https://old.example.com" });

        let response = resource.read(ReadRequest { state, ..Default::default() }).await;

        let state = response.state.unwrap();
        assert_eq!(state["auth_token"], json!("keep"));
        assert_eq!(state["import_url"], json!("https://new.example.com"));
        assert_eq!(state["id"], json!("42"));
    }

    #[tokio::test]
    async fn test_read_missing_connection_removes_state() {
        let api = ScriptedApi::with(vec![Err(not_found())]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api));
        let response = resource
            .read(ReadRequest { state: json!({ "connection_name": "gone" }), ..Default::default() })
            .await;

        assert!(response.state.is_none());
        assert_eq!(response.diagnostics.warnings().count(), 1);
    }

    #[tokio::test]
    async fn test_read_type_mismatch_fails_loudly() {
        let api = ScriptedApi::with(vec![Ok(json!({
            "SAPConnectionResponse": { "connectionname": "ok1", "connectiontype": "SAP", "errorcode": 0 }
        }))]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api));
        let response = resource
            .read(ReadRequest { state: json!({ "connection_name": "ok1" }), ..Default::default() })
            .await;

        assert_eq!(error_code(&response).as_deref(), Some("okta_read_type_mismatch"));
    }

    #[tokio::test]
    async fn test_read_without_name_is_state_error() {
        let api = ScriptedApi::with(vec![]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api.clone()));
        let response = resource.read(ReadRequest { state: json!({}), ..Default::default() }).await;
        assert_eq!(error_code(&response).as_deref(), Some("okta_read_state_extraction"));
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_update_type_change_refused_without_calls() {
        let api = ScriptedApi::with(vec![]);
        let resource = ConnectionResource::with_clients(Arc::new(SalesforceConnector), clients(api.clone()));
        let response = resource
            .update(UpdateRequest {
                config: json!({ "connection_name": "sf1", "connection_type": "SAP" }),
                plan: json!({ "connection_name": "sf1", "connection_type": "SAP" }),
                state: json!({ "connection_name": "sf1", "connection_type": "SalesForce" }),
                ..Default::default()
            })
            .await;

        assert_eq!(error_code(&response).as_deref(), Some("salesforce_update_type_immutable"));
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_update_reads_back_after_write() {
        let api = ScriptedApi::with(vec![
            Ok(json!({ "errorCode": "0", "msg": "updated" })),
            Ok(json!({
                "connectionkey": 42,
                "connectionname": "ok1",
                "connectiontype": "Okta",
                "description": "normalised by server",
                "errorcode": "0"
            })),
        ]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api.clone()));
        let plan = json!({ "connection_name": "ok1", "description": "desc", "auth_token": "t" });

        let response = resource
            .update(UpdateRequest {
                config: plan.clone(),
                plan,
                state: json!({ "connection_name": "ok1", "connection_key": 42, "id": "42" }),
                ..Default::default()
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state["description"], json!("normalised by server"));
        assert_eq!(state["auth_token"], json!("t"));
        assert_eq!(state["connection_key"], json!(42));
        assert_eq!(api.ops(), vec!["upsert", "details"]);
    }

    #[tokio::test]
    async fn test_delete_without_acceptance_mode_is_refused() {
        let _env = ACCEPTANCE_ENV.lock().unwrap_or_else(|poison| poison.into_inner());
        // SAFETY: every test touching the acceptance variable holds ACCEPTANCE_ENV.
        unsafe { std::env::remove_var(ACCEPTANCE_TEST_VAR) };
        let api = ScriptedApi::with(vec![]);
        let resource = ConnectionResource::with_clients(Arc::new(OktaConnector), clients(api.clone()));

        let refused = resource
            .delete(DeleteRequest { state: json!({ "connection_name": "ok1" }), ..Default::default() })
            .await;
        assert_eq!(error_code(&refused).as_deref(), Some("okta_delete_delete_unsupported"));

        unsafe { std::env::set_var(ACCEPTANCE_TEST_VAR, "1") };
        let tombstoned = resource
            .delete(DeleteRequest { state: json!({ "connection_name": "ok1" }), ..Default::default() })
            .await;
        unsafe { std::env::remove_var(ACCEPTANCE_TEST_VAR) };

        assert!(tombstoned.state.is_none());
        assert!(!tombstoned.diagnostics.has_errors());
        assert_eq!(
            tombstoned.diagnostics.iter().next().map(|d| d.severity),
            Some(Severity::Warning)
        );
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_import_seeds_identity() {
        let resource = ConnectionResource::new(Arc::new(OktaConnector));
        let response = resource
            .import_state(ImportRequest { id: "ok1".into(), ..Default::default() })
            .await;
        assert_eq!(response.state, Some(json!({ "connection_name": "ok1" })));
    }

    #[tokio::test]
    async fn test_unconfigured_resource_reports_provider_config() {
        let resource = ConnectionResource::new(Arc::new(OktaConnector));
        let response = resource
            .read(ReadRequest { state: json!({ "connection_name": "ok1" }), ..Default::default() })
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("okta_read_provider_config"));
    }
}
