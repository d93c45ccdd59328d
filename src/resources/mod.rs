//! Resource adapters
//!
//! Map the host's lifecycle calls onto retry-wrapped IGA API calls. Every
//! entry point opens an [`OperationContext`](crate::telemetry::OperationContext)
//! scope, takes the per-instance lock and reports failures as
//! [`ProviderError`] diagnostics.

pub mod connection;
pub mod datasource;
pub mod endpoint;
pub mod file_upload;
pub mod locks;
pub mod transport;

use std::sync::Arc;

use metrics::counter;
use tracing::{error, warn};

use crate::client::LooseObject;
use crate::config::{ACCEPTANCE_TEST_VAR, acceptance_test_mode};
use crate::connectors::CodecError;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{self, ProviderData, ResourceResponse};
use crate::provider::ProviderClients;
use crate::telemetry::OperationContext;

pub use connection::ConnectionResource;
pub use datasource::{ConnectionDataSource, EndpointsDataSource};
pub use endpoint::EndpointResource;
pub use file_upload::FileUploadResource;
pub use locks::InstanceLocks;
pub use transport::TransportPackageResource;

/// Provider data slot shared by every adapter.
#[derive(Debug, Default, Clone)]
pub(crate) struct ClientSlot(Option<Arc<ProviderClients>>);

impl ClientSlot {
    pub(crate) fn configure(&mut self, family: &str, data: Option<ProviderData>) -> Result<(), ProviderError> {
        if let Some(clients) = host::downcast_provider_data::<ProviderClients>(family, data)? {
            self.0 = Some(clients);
        }
        Ok(())
    }

    pub(crate) fn get(&self, family: &str, operation: Operation) -> Result<Arc<ProviderClients>, ProviderError> {
        self.0.clone().ok_or_else(|| {
            ProviderError::new(
                family,
                operation,
                ErrorKind::ProviderConfig,
                "provider is not configured",
                "",
            )
        })
    }
}

/// Map a local codec failure onto the taxonomy.
pub(crate) fn codec_error(family: &str, operation: Operation, err: CodecError) -> ProviderError {
    let kind = match err {
        CodecError::MissingIdentity => match operation {
            Operation::Read => ErrorKind::StateExtraction,
            _ => ErrorKind::PlanExtraction,
        },
        CodecError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
        _ => ErrorKind::InvalidConfig,
    };
    ProviderError::new(family, operation, kind, "invalid configuration", err.to_string())
}

/// `api_error` for a reply whose `errorCode` is not `0`.
pub(crate) fn rejected(family: &str, operation: Operation, summary: &str, reply: &LooseObject) -> ProviderError {
    let code = reply.error_code().unwrap_or_default();
    let msg = reply.msg().unwrap_or_default();
    ProviderError::new(
        family,
        operation,
        ErrorKind::ApiError,
        summary,
        format!("errorCode {code}: {msg}"),
    )
}

/// String attribute of a raw state object, empty when absent.
pub(crate) fn state_text(state: &serde_json::Value, key: &str) -> String {
    state.get(key).and_then(serde_json::Value::as_str).unwrap_or_default().to_string()
}

/// State-only delete, allowed only in acceptance-test mode.
pub(crate) fn tombstone(ctx: &OperationContext, noun: &str, name: &str) -> Result<ResourceResponse, ProviderError> {
    let family = ctx.connector_family();
    if !name.is_empty() {
        ctx.bind_connection_name(name);
    }
    if acceptance_test_mode() {
        tracing::info!("removing {noun} from state only");
        return Ok(ResourceResponse::removed().warn(
            format!("{noun} removed from state only"),
            format!("{noun} '{name}' still exists in IGA; the provider never deletes it remotely"),
        ));
    }
    Err(ProviderError::new(
        family,
        Operation::Delete,
        ErrorKind::DeleteUnsupported,
        format!("{noun}s cannot be deleted"),
        format!("{noun} '{name}' must be removed in IGA itself ({ACCEPTANCE_TEST_VAR} enables state-only removal)"),
    ))
}

/// Turn an adapter result into a host response, logging and counting errors.
pub(crate) fn respond(result: Result<ResourceResponse, ProviderError>) -> ResourceResponse {
    match result {
        Ok(response) => response,
        Err(err) => {
            let remote = matches!(
                err.kind(),
                ErrorKind::ApiError
                    | ErrorKind::ReadFailed
                    | ErrorKind::CreateFailed
                    | ErrorKind::UpdateFailed
                    | ErrorKind::AuthRefreshFailed
                    | ErrorKind::AuthExhausted
            );
            if remote {
                counter!(
                    "iga_api_error_total",
                    "family" => err.code.family.clone(),
                    "operation" => err.code.operation.as_str()
                )
                .increment(1);
                error!(code = %err.code, detail = %err.detail, "{}", err.summary);
            } else {
                warn!(code = %err.code, detail = %err.detail, "{}", err.summary);
            }
            ResourceResponse::error(err)
        }
    }
}
