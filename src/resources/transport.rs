//! Transport package export resource
//!
//! Each apply asks IGA to export the listed objects into a transport
//! package. There is nothing to read back, so read keeps state and update
//! simply exports again.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ClientSlot, respond, state_text, tombstone};
use crate::client::LooseObject;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{
    self, CreateRequest, DeleteRequest, ProviderData, ReadRequest, Resource, ResourceResponse,
    UpdateRequest,
};
use crate::models::attr::Attr;
use crate::models::transport::TransportPackageModel;
use crate::provider::ProviderClients;
use crate::telemetry::OperationContext;

pub const TRANSPORT_FAMILY: &str = "transport_package";
pub const TRANSPORT_RESOURCE_TYPE: &str = "iga_transport_package_export_resource";

/// Request body for `exportTransportPackage`.
pub fn export_body(plan: &TransportPackageModel) -> Map<String, Value> {
    let mut body = Map::new();
    let scalars = [
        ("exportonline", &plan.export_online),
        ("exportpath", &plan.export_path),
        ("updateuser", &plan.update_user),
        ("transportowner", &plan.transport_owner),
        ("transportmembers", &plan.transport_members),
        ("businessjustification", &plan.business_justification),
    ];
    for (key, attr) in scalars {
        if let Some(value) = attr.non_empty() {
            body.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    if let Some(objects) = plan.objects_to_export.as_known() {
        body.insert("objectstoexport".to_string(), Value::Object(objects.to_wire()));
    }
    body
}

fn export_failed(operation: Operation, reply: &LooseObject) -> ProviderError {
    let code = reply.error_code().unwrap_or_default();
    let msg = reply.msg().unwrap_or_default();
    let description = reply.get_str("msgDescription").unwrap_or_default();
    ProviderError::new(
        TRANSPORT_FAMILY,
        operation,
        ErrorKind::ApiError,
        "transport package export failed",
        format!("errorCode {code}: {msg} {description}").trim_end().to_string(),
    )
}

#[derive(Default)]
pub struct TransportPackageResource {
    clients: ClientSlot,
}

impl TransportPackageResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: std::sync::Arc<ProviderClients>) -> Self {
        Self {
            clients: ClientSlot(Some(clients)),
        }
    }

    async fn export(
        &self,
        operation: Operation,
        plan: TransportPackageModel,
        prior_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse, ProviderError> {
        let clients = self.clients.get(TRANSPORT_FAMILY, operation)?;
        if plan.objects_to_export.as_known().is_none_or(|objects| objects.is_empty()) {
            return Err(ProviderError::new(
                TRANSPORT_FAMILY,
                operation,
                ErrorKind::InvalidConfig,
                "nothing to export",
                "objects_to_export must list at least one object",
            ));
        }

        let id = prior_id.unwrap_or_else(|| format!("transport-{}", Uuid::new_v4()));
        let _guard = clients.locks.acquire(TRANSPORT_RESOURCE_TYPE, &id).await;

        let body = export_body(&plan);
        let api = &clients.api;
        let body = &body;
        let reply = match clients
            .retry
            .call(cancel, "export_transport_package", move |token| async move {
                api.export_transport_package(&token, body).await
            })
            .await
        {
            Ok(reply) => reply,
            Err(err) if err.is_not_found() => {
                let reply = err.api_error().and_then(|e| e.body_object()).unwrap_or_default();
                return Err(export_failed(operation, &reply));
            }
            Err(err) => {
                return Err(err.into_provider_error(TRANSPORT_FAMILY, operation, "transport package export failed"));
            }
        };

        if !reply.is_success() {
            return Err(export_failed(operation, &reply));
        }

        let mut model = plan;
        model.id = Attr::Known(id);
        model.msg = Attr::from_non_empty(reply.msg());
        model.msg_description = Attr::from_non_empty(reply.get_str("msgDescription"));
        model.file_name = Attr::from_non_empty(reply.get_str("fileName"));
        model.error_code = Attr::from_non_empty(reply.error_code());

        let file_name = model.file_name.non_empty().unwrap_or("<unnamed>").to_string();
        info!(file_name = %file_name, "transport package exported");
        Ok(
            ResourceResponse::with_state(host::encode_state(TRANSPORT_FAMILY, operation, &model)?).warn(
                "transport package exported",
                format!("IGA generated the package file '{file_name}'"),
            ),
        )
    }
}

#[async_trait]
impl Resource for TransportPackageResource {
    fn type_name(&self) -> String {
        TRANSPORT_RESOURCE_TYPE.to_string()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(TRANSPORT_FAMILY, provider_data)
    }

    async fn create(&self, request: CreateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(TRANSPORT_FAMILY, Operation::Create);
        respond(
            ctx.scope(async {
                let plan: TransportPackageModel = host::extract(
                    TRANSPORT_FAMILY,
                    Operation::Create,
                    ErrorKind::PlanExtraction,
                    &request.plan,
                )?;
                self.export(Operation::Create, plan, None, &request.cancel).await
            })
            .await,
        )
    }

    async fn read(&self, request: ReadRequest) -> ResourceResponse {
        let ctx = OperationContext::new(TRANSPORT_FAMILY, Operation::Read);
        ctx.scope(async {
            debug!("transport export has no remote lookup, keeping state");
            ResourceResponse::with_state(request.state)
        })
        .await
    }

    async fn update(&self, request: UpdateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(TRANSPORT_FAMILY, Operation::Update);
        respond(
            ctx.scope(async {
                let op = Operation::Update;
                let plan: TransportPackageModel =
                    host::extract(TRANSPORT_FAMILY, op, ErrorKind::PlanExtraction, &request.plan)?;
                let state: TransportPackageModel =
                    host::extract(TRANSPORT_FAMILY, op, ErrorKind::StateExtraction, &request.state)?;
                let prior_id = state.id.non_empty().map(str::to_string);
                self.export(op, plan, prior_id, &request.cancel).await
            })
            .await,
        )
    }

    async fn delete(&self, request: DeleteRequest) -> ResourceResponse {
        let ctx = OperationContext::new(TRANSPORT_FAMILY, Operation::Delete);
        let name = state_text(&request.state, "id");
        respond(ctx.scope(async { tombstone(&ctx, "transport package", &name) }).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiCallError;
    use crate::host::Severity;
    use crate::resources::connection::tests::{ScriptedApi, clients};
    use serde_json::json;

    fn plan() -> Value {
        json!({
            "export_online": "false",
            "export_path": "/tmp/export",
            "business_justification": "release",
            "objects_to_export": { "connections": ["ok1"] }
        })
    }

    #[test]
    fn test_export_body() {
        let model: TransportPackageModel = serde_json::from_value(plan()).unwrap();
        assert_eq!(
            Value::Object(export_body(&model)),
            json!({
                "exportonline": "false",
                "exportpath": "/tmp/export",
                "businessjustification": "release",
                "objectstoexport": { "connection": ["ok1"] }
            })
        );
    }

    #[tokio::test]
    async fn test_export_success_warns_with_file_name() {
        let api = ScriptedApi::with(vec![Ok(json!({
            "msg": "Success",
            "msgDescription": "Transport Package exported",
            "fileName": "transport_2026.zip",
            "errorCode": "0"
        }))]);
        let resource = TransportPackageResource::with_clients(clients(api));
        let response = resource.create(CreateRequest { plan: plan(), ..Default::default() }).await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        let state = response.state.clone().unwrap();
        assert_eq!(state["file_name"], json!("transport_2026.zip"));
        assert!(state["id"].as_str().unwrap().starts_with("transport-"));
        let warning = response.diagnostics.warnings().next().unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.detail.contains("transport_2026.zip"));
    }

    #[tokio::test]
    async fn test_export_412_body_is_decoded() {
        let api = ScriptedApi::with(vec![Err(ApiCallError::new(Some(412), "precondition failed")
            .with_body(r#"{"msg":"Failure","msgDescription":"Invalid connection ok9","errorcode":1}"#))]);
        let resource = TransportPackageResource::with_clients(clients(api));
        let response = resource.create(CreateRequest { plan: plan(), ..Default::default() }).await;

        assert!(response.state.is_none());
        let error = response.diagnostics.errors().next().unwrap();
        assert_eq!(error.code.as_deref(), Some("transport_package_create_api_error"));
        assert!(error.detail.contains("Invalid connection ok9"));
        assert!(error.detail.contains("errorCode 1"));
    }

    #[tokio::test]
    async fn test_empty_export_rejected_locally() {
        let api = ScriptedApi::with(vec![]);
        let resource = TransportPackageResource::with_clients(clients(api.clone()));
        let response = resource
            .create(CreateRequest { plan: json!({ "export_online": "true" }), ..Default::default() })
            .await;
        assert!(response.diagnostics.has_errors());
        assert!(api.ops().is_empty());
    }
}
