//! Host-runtime surface
//!
//! Request and response envelopes exchanged with the declarative host, the
//! diagnostics it renders, and the [`Resource`] / [`DataSource`] traits every
//! reconcilable object implements. Models travel as JSON values so the host
//! protocol stays independent of the typed models.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorKind, Operation, ProviderError};
use crate::telemetry;

/// Opaque provider data handed to resources after `configure`.
pub type ProviderData = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Machine-parseable error code, errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Correlation id of the operation that raised it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl Diagnostic {
    pub fn warning<S: Into<String>, D: Into<String>>(summary: S, detail: D) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            code: None,
            correlation_id: telemetry::current_correlation_id(),
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        Self {
            severity: Severity::Error,
            summary: format!("[{}] {}", err.code, err.summary),
            detail: err.detail,
            code: Some(err.code.to_string()),
            correlation_id: err.correlation_id,
        }
    }
}

/// Ordered diagnostics of one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn warn<S: Into<String>, D: Into<String>>(&mut self, summary: S, detail: D) {
        self.push(Diagnostic::warning(summary, detail));
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub config: Value,
    pub plan: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    pub state: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub config: Value,
    pub plan: Value,
    pub state: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteRequest {
    pub state: Value,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub id: String,
    pub cancel: CancellationToken,
}

/// Datasource lookup arguments.
#[derive(Debug, Clone, Default)]
pub struct ReadDataRequest {
    pub config: Value,
    pub cancel: CancellationToken,
}

/// Result of a lifecycle call. `state: None` removes the instance from state.
#[derive(Debug, Clone, Default)]
pub struct ResourceResponse {
    pub state: Option<Value>,
    pub diagnostics: Diagnostics,
}

impl ResourceResponse {
    pub fn with_state(state: Value) -> Self {
        Self {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn removed() -> Self {
        Self::default()
    }

    pub fn error(err: ProviderError) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(err.into());
        Self {
            state: None,
            diagnostics,
        }
    }

    pub fn warn<S: Into<String>, D: Into<String>>(mut self, summary: S, detail: D) -> Self {
        self.diagnostics.warn(summary, detail);
        self
    }
}

/// Decode a host value into a typed model.
pub fn extract<T: DeserializeOwned>(
    family: &str,
    operation: Operation,
    kind: ErrorKind,
    value: &Value,
) -> Result<T, ProviderError> {
    serde_json::from_value(value.clone())
        .map_err(|err| ProviderError::new(family, operation, kind, "failed to decode request", err.to_string()))
}

/// Encode a typed model back into a host state value.
pub fn encode_state<T: Serialize>(family: &str, operation: Operation, model: &T) -> Result<Value, ProviderError> {
    serde_json::to_value(model).map_err(|err| {
        ProviderError::new(
            family,
            operation,
            ErrorKind::StateUpdate,
            "failed to encode state",
            err.to_string(),
        )
    })
}

/// Downcast provider data to the concrete type a resource expects.
pub fn downcast_provider_data<T: Send + Sync + 'static>(
    family: &str,
    data: Option<ProviderData>,
) -> Result<Option<Arc<T>>, ProviderError> {
    match data {
        None => Ok(None),
        Some(data) => data.downcast::<T>().map(Some).map_err(|_| {
            ProviderError::new(
                family,
                Operation::Configure,
                ErrorKind::ProviderConfig,
                "unexpected provider data type",
                format!("expected {}", std::any::type_name::<T>()),
            )
        }),
    }
}

/// A reconcilable object type.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> String;

    /// Receive provider data. `None` happens before the provider is configured.
    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError>;

    /// Schema-level checks on configuration, run before any lifecycle call.
    fn validate_config(&self, _config: &Value) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn create(&self, request: CreateRequest) -> ResourceResponse;

    async fn read(&self, request: ReadRequest) -> ResourceResponse;

    async fn update(&self, request: UpdateRequest) -> ResourceResponse;

    async fn delete(&self, request: DeleteRequest) -> ResourceResponse;

    async fn import_state(&self, _request: ImportRequest) -> ResourceResponse {
        let family = self.type_name();
        ResourceResponse::error(ProviderError::new(
            family,
            Operation::Import,
            ErrorKind::ImportUnsupported,
            "import is not supported for this resource",
            "",
        ))
    }
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> String;

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError>;

    async fn read(&self, request: ReadDataRequest) -> ResourceResponse;
}
