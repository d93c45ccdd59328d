//! Telemetry utilities for operation-scoped tracing metadata and global subscriber management.

use std::any::type_name_of_val;
use std::future::Future;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing::{Instrument, Span, field};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::Layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::Operation;

task_local! {
    static ACTIVE_CORRELATION_ID: String;
}

/// Errors that can occur while initializing global telemetry.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install log tracer bridge: {0}")]
    LogTracer(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static TELEMETRY_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize global tracing/logging exactly once, wiring `log::` macros into the tracing pipeline.
///
/// Events are written to stderr; stdout is reserved for the host-runtime protocol.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if TELEMETRY_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        // Another component may already have registered a LogTracer.
        let logger_type = type_name_of_val(log::logger());
        if !logger_type.contains("LogTracer") {
            eprintln!(
                "Warning: Failed to install log tracer bridge: {}. legacy `log::` macros will not emit structured tracing events.",
                err
            );
        }
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        _ => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        TELEMETRY_INITIALIZED.store(false, Ordering::SeqCst);
        eprintln!(
            "Warning: Failed to set global tracing subscriber: {}. Default subscriber remains in effect.",
            err
        );
    }

    Ok(())
}

/// Correlation scope for one adapter entry point.
///
/// Holds the connector family, operation phase and a freshly minted
/// correlation id. The connection name is bound at most once, after the
/// plan or state has been extracted.
#[derive(Debug)]
pub struct OperationContext {
    connector_family: String,
    operation: Operation,
    connection_name: OnceLock<String>,
    correlation_id: String,
    span: Span,
}

impl OperationContext {
    pub fn new<S: Into<String>>(connector_family: S, operation: Operation) -> Self {
        let connector_family = connector_family.into();
        let correlation_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "iga_operation",
            connector_family = %connector_family,
            operation = %operation,
            correlation_id = %correlation_id,
            connection_name = field::Empty,
        );
        Self {
            connector_family,
            operation,
            connection_name: OnceLock::new(),
            correlation_id,
            span,
        }
    }

    pub fn connector_family(&self) -> &str {
        &self.connector_family
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn connection_name(&self) -> Option<&str> {
        self.connection_name.get().map(String::as_str)
    }

    /// Bind the connection name; later calls are ignored.
    pub fn bind_connection_name<S: Into<String>>(&self, name: S) {
        let name = name.into();
        if self.connection_name.set(name.clone()).is_ok() {
            self.span.record("connection_name", field::display(&name));
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `future` inside this context's span with its correlation id task-local.
    pub async fn scope<Fut, R>(&self, future: Fut) -> R
    where
        Fut: Future<Output = R>,
    {
        ACTIVE_CORRELATION_ID
            .scope(self.correlation_id.clone(), future.instrument(self.span.clone()))
            .await
    }
}

/// Get the correlation id of the operation running on this task, if any.
pub fn current_correlation_id() -> Option<String> {
    ACTIVE_CORRELATION_ID.try_with(|id| id.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scope_exposes_correlation_id() {
        let ctx = OperationContext::new("okta", Operation::Create);
        let expected = ctx.correlation_id().to_string();

        let seen = ctx.scope(async { current_correlation_id() }).await;
        assert_eq!(seen, Some(expected));
        assert_eq!(current_correlation_id(), None);
    }

    #[test]
    fn test_connection_name_binds_once() {
        let ctx = OperationContext::new("sap", Operation::Update);
        assert_eq!(ctx.connection_name(), None);
        ctx.bind_connection_name("first");
        ctx.bind_connection_name("second");
        assert_eq!(ctx.connection_name(), Some("first"));
        assert_eq!(ctx.connector_family(), "sap");
        assert_eq!(ctx.operation(), Operation::Update);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = OperationContext::new("rest", Operation::Read);
        let b = OperationContext::new("rest", Operation::Read);
        assert_ne!(a.correlation_id(), b.correlation_id());
    }

    #[tokio::test]
    async fn test_errors_inside_scope_carry_correlation_id() {
        use crate::error::{ErrorKind, ProviderError};

        let ctx = OperationContext::new("okta", Operation::Read);
        let err = ctx
            .scope(async {
                ProviderError::new("okta", Operation::Read, ErrorKind::ReadFailed, "x", "")
            })
            .await;
        assert_eq!(err.correlation_id.as_deref(), Some(ctx.correlation_id()));
    }
}
