//! Endpoint resource
//!
//! Same reconciliation contract as connections, with separate create and
//! update calls and `getEndpoints` as the lookup.

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{ClientSlot, codec_error, rejected, respond, state_text, tombstone};
use crate::client::{EndpointFilter, LooseObject};
use crate::endpoint;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{
    self, CreateRequest, DeleteRequest, ImportRequest, ProviderData, ReadRequest, Resource,
    ResourceResponse, UpdateRequest,
};
use crate::models::attr::Attr;
use crate::models::endpoint::EndpointModel;
use crate::provider::ProviderClients;
use crate::retry::RetryError;
use crate::telemetry::OperationContext;

pub const ENDPOINT_FAMILY: &str = "endpoint";
pub const ENDPOINT_RESOURCE_TYPE: &str = "iga_endpoint_resource";

/// Look up endpoints; a 412 reads as an empty result.
pub(crate) async fn fetch_endpoints(
    clients: &ProviderClients,
    cancel: &CancellationToken,
    filter: &EndpointFilter,
) -> Result<LooseObject, RetryError> {
    let api = &clients.api;
    match clients
        .retry
        .call(cancel, "get_endpoints", move |token| async move {
            api.get_endpoints(&token, filter).await
        })
        .await
    {
        Err(err) if err.is_not_found() => Ok(LooseObject::default()),
        other => other,
    }
}

async fn find_by_name(
    clients: &ProviderClients,
    cancel: &CancellationToken,
    name: &str,
) -> Result<Option<LooseObject>, RetryError> {
    let reply = fetch_endpoints(clients, cancel, &EndpointFilter::by_name(name)).await?;
    Ok(endpoint::find_endpoint(&reply, name))
}

#[derive(Default)]
pub struct EndpointResource {
    clients: ClientSlot,
}

impl EndpointResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: std::sync::Arc<ProviderClients>) -> Self {
        Self {
            clients: ClientSlot(Some(clients)),
        }
    }

    fn finish(operation: Operation, mut model: EndpointModel) -> Result<ResourceResponse, ProviderError> {
        model.resolve_unknowns();
        Ok(ResourceResponse::with_state(host::encode_state(
            ENDPOINT_FAMILY,
            operation,
            &model,
        )?))
    }

    /// Send a create or update and read the endpoint back.
    async fn write(
        &self,
        ctx: &OperationContext,
        operation: Operation,
        plan: EndpointModel,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse, ProviderError> {
        let clients = self.clients.get(ENDPOINT_FAMILY, operation)?;
        let name = plan
            .endpoint_name
            .non_empty()
            .ok_or_else(|| {
                ProviderError::new(ENDPOINT_FAMILY, operation, ErrorKind::PlanExtraction, "endpoint_name is required", "")
            })?
            .to_string();
        ctx.bind_connection_name(&name);
        endpoint::validate(&plan).map_err(|err| codec_error(ENDPOINT_FAMILY, operation, err))?;

        let _guard = clients.locks.acquire(ENDPOINT_RESOURCE_TYPE, &name).await;

        if operation == Operation::Create {
            let existing = find_by_name(&clients, cancel, &name)
                .await
                .map_err(|err| err.into_provider_error(ENDPOINT_FAMILY, operation, "failed to check for an existing endpoint"))?;
            if existing.is_some() {
                return Err(ProviderError::new(
                    ENDPOINT_FAMILY,
                    operation,
                    ErrorKind::DuplicateName,
                    "an endpoint with this name already exists",
                    format!("endpoint '{name}' already exists; import it instead of creating it"),
                ));
            }
        }

        let body = endpoint::encode(&plan).map_err(|err| codec_error(ENDPOINT_FAMILY, operation, err))?;
        let api = &clients.api;
        let body = &body;
        let reply = match operation {
            Operation::Create => {
                clients
                    .retry
                    .call(cancel, "create_endpoint", move |token| async move {
                        api.create_endpoint(&token, body).await
                    })
                    .await
            }
            _ => {
                clients
                    .retry
                    .call(cancel, "update_endpoint", move |token| async move {
                        api.update_endpoint(&token, body).await
                    })
                    .await
            }
        }
        .map_err(|err| err.into_provider_error(ENDPOINT_FAMILY, operation, "endpoint request failed"))?;

        if !reply.is_success() {
            return Err(rejected(ENDPOINT_FAMILY, operation, "IGA rejected the endpoint", &reply));
        }

        let mut prior = plan;
        prior.id = Attr::Known(EndpointModel::state_id(&name));
        prior.msg = Attr::from_non_empty(reply.msg());
        prior.error_code = Attr::from_non_empty(reply.error_code());

        let entry = find_by_name(&clients, cancel, &name)
            .await
            .map_err(|err| err.into_provider_error(ENDPOINT_FAMILY, operation, "failed to read endpoint back"))?;
        let mut model = match entry {
            Some(entry) => endpoint::decode(&entry, &prior),
            None => prior,
        };
        // The write reply's status describes this apply, not the lookup.
        model.msg = Attr::from_non_empty(reply.msg());
        model.error_code = Attr::from_non_empty(reply.error_code());

        info!(operation = %operation, "endpoint written");
        Self::finish(operation, model)
    }

    async fn create_inner(&self, ctx: &OperationContext, request: CreateRequest) -> Result<ResourceResponse, ProviderError> {
        let op = Operation::Create;
        let plan: EndpointModel = host::extract(ENDPOINT_FAMILY, op, ErrorKind::PlanExtraction, &request.plan)?;
        self.write(ctx, op, plan, &request.cancel).await
    }

    async fn read_inner(&self, ctx: &OperationContext, request: ReadRequest) -> Result<ResourceResponse, ProviderError> {
        let op = Operation::Read;
        let clients = self.clients.get(ENDPOINT_FAMILY, op)?;
        let state: EndpointModel = host::extract(ENDPOINT_FAMILY, op, ErrorKind::StateExtraction, &request.state)?;
        let name = state
            .endpoint_name
            .non_empty()
            .ok_or_else(|| {
                ProviderError::new(ENDPOINT_FAMILY, op, ErrorKind::StateExtraction, "endpoint_name is missing from state", "")
            })?
            .to_string();
        ctx.bind_connection_name(&name);

        let _guard = clients.locks.acquire(ENDPOINT_RESOURCE_TYPE, &name).await;

        let reply = fetch_endpoints(&clients, &request.cancel, &EndpointFilter::by_name(&name))
            .await
            .map_err(|err| err.into_provider_error(ENDPOINT_FAMILY, op, "failed to read endpoint"))?;
        if !reply.is_success() && endpoint::find_endpoint(&reply, &name).is_none() {
            return Err(rejected(ENDPOINT_FAMILY, op, "IGA rejected the lookup", &reply));
        }

        match endpoint::find_endpoint(&reply, &name) {
            Some(entry) => {
                let mut model = endpoint::decode(&entry, &state);
                model.msg = state.msg.clone();
                model.error_code = state.error_code.clone();
                Self::finish(op, model)
            }
            None => Ok(ResourceResponse::removed().warn(
                "endpoint not found",
                format!("endpoint '{name}' was not found in IGA and has been removed from state"),
            )),
        }
    }

    async fn update_inner(&self, ctx: &OperationContext, request: UpdateRequest) -> Result<ResourceResponse, ProviderError> {
        let op = Operation::Update;
        let plan: EndpointModel = host::extract(ENDPOINT_FAMILY, op, ErrorKind::PlanExtraction, &request.plan)?;
        let state: EndpointModel = host::extract(ENDPOINT_FAMILY, op, ErrorKind::StateExtraction, &request.state)?;

        let before = state.endpoint_name.non_empty().unwrap_or_default();
        let after = plan.endpoint_name.non_empty().unwrap_or_default();
        if before != after {
            return Err(ProviderError::new(
                ENDPOINT_FAMILY,
                op,
                ErrorKind::NameImmutable,
                "endpoint_name cannot be changed",
                format!("'{before}' -> '{after}'"),
            ));
        }
        self.write(ctx, op, plan, &request.cancel).await
    }
}

#[async_trait]
impl Resource for EndpointResource {
    fn type_name(&self) -> String {
        ENDPOINT_RESOURCE_TYPE.to_string()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(ENDPOINT_FAMILY, provider_data)
    }

    fn validate_config(&self, config: &Value) -> Result<(), ProviderError> {
        let model: EndpointModel =
            host::extract(ENDPOINT_FAMILY, Operation::Validate, ErrorKind::ConfigExtraction, config)?;
        endpoint::validate(&model).map_err(|err| codec_error(ENDPOINT_FAMILY, Operation::Validate, err))
    }

    async fn create(&self, request: CreateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Create);
        respond(ctx.scope(self.create_inner(&ctx, request)).await)
    }

    async fn read(&self, request: ReadRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Read);
        respond(ctx.scope(self.read_inner(&ctx, request)).await)
    }

    async fn update(&self, request: UpdateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Update);
        respond(ctx.scope(self.update_inner(&ctx, request)).await)
    }

    async fn delete(&self, request: DeleteRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Delete);
        let name = state_text(&request.state, "endpoint_name");
        respond(ctx.scope(async { tombstone(&ctx, "endpoint", &name) }).await)
    }

    async fn import_state(&self, request: ImportRequest) -> ResourceResponse {
        let ctx = OperationContext::new(ENDPOINT_FAMILY, Operation::Import);
        respond(
            ctx.scope(async {
                let name = request.id.trim();
                if name.is_empty() {
                    return Err(ProviderError::new(
                        ENDPOINT_FAMILY,
                        Operation::Import,
                        ErrorKind::MissingIdentifier,
                        "import id must be the endpoint name",
                        "",
                    ));
                }
                ctx.bind_connection_name(name);
                Ok(ResourceResponse::with_state(json!({
                    "endpoint_name": name,
                    "id": EndpointModel::state_id(name),
                })))
            })
            .await,
        )
    }
}
