//! Provider
//!
//! Entry point the host runtime talks to first: `configure` opens the IGA
//! session and produces the shared clients every resource and datasource
//! receives as provider data.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::client::{HttpIgaClient, IgaApi};
use crate::config::{AppConfig, ConfigError, ConfigLoader, ProviderBlock};
use crate::connectors::Registry;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{self, DataSource, ProviderData, Resource};
use crate::resources::{
    ConnectionDataSource, ConnectionResource, EndpointResource, EndpointsDataSource,
    FileUploadResource, InstanceLocks, TransportPackageResource,
};
use crate::retry::RetryEngine;
use crate::telemetry::OperationContext;
use crate::token_refresh::{TokenIssuer, TokenStore};

const FAMILY: &str = "provider";

/// Clients shared by every resource once the provider is configured.
pub struct ProviderClients {
    pub api: Arc<dyn IgaApi>,
    pub retry: RetryEngine,
    pub locks: InstanceLocks,
}

impl ProviderClients {
    pub fn new(api: Arc<dyn IgaApi>, retry: RetryEngine) -> Self {
        Self {
            api,
            retry,
            locks: InstanceLocks::new(),
        }
    }

    /// Type-erased form handed to `configure`.
    pub fn into_provider_data(self: Arc<Self>) -> ProviderData {
        self
    }
}

impl std::fmt::Debug for ProviderClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClients")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn config_error(err: ConfigError) -> ProviderError {
    ProviderError::new(
        FAMILY,
        Operation::Configure,
        ErrorKind::ProviderConfig,
        "invalid provider configuration",
        err.to_string(),
    )
}

pub struct Provider {
    config: AppConfig,
    registry: Registry,
}

impl Provider {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            registry: Registry::with_builtin_connectors(),
        }
    }

    /// Build from `IGA_*` environment settings and layered `.env` files.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ConfigLoader::new().load()?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Merge the host's provider block, log in and build the shared clients.
    pub async fn configure(&self, provider_block: &Value) -> Result<Arc<ProviderClients>, ProviderError> {
        let ctx = OperationContext::new(FAMILY, Operation::Configure);
        ctx.scope(async {
            let block: ProviderBlock = if provider_block.is_null() {
                ProviderBlock::default()
            } else {
                host::extract(
                    FAMILY,
                    Operation::Configure,
                    ErrorKind::ConfigExtraction,
                    provider_block,
                )?
            };

            let mut config = self.config.clone();
            config.merge_provider_block(&block);
            config.validate().map_err(config_error)?;
            let credentials = config.credentials().map_err(config_error)?;

            let client = Arc::new(
                HttpIgaClient::new(credentials.server_url.clone(), &config.user_agent).map_err(|err| {
                    ProviderError::new(
                        FAMILY,
                        Operation::Configure,
                        ErrorKind::ProviderConfig,
                        "failed to build HTTP client",
                        err.to_string(),
                    )
                })?,
            );

            let issuer: Arc<dyn TokenIssuer> = client.clone();
            let tokens = TokenStore::bootstrap(
                issuer,
                credentials.server_url.clone(),
                &credentials.username,
                &credentials.password,
            )
            .await
            .map_err(|err| {
                ProviderError::new(
                    FAMILY,
                    Operation::Configure,
                    ErrorKind::ProviderConfig,
                    "failed to log in to IGA",
                    err.to_string(),
                )
            })?;

            info!(server_url = %credentials.server_url, "provider configured");
            let retry = RetryEngine::with_max_refreshes(Arc::new(tokens), config.max_unauthorized_retries);
            Ok(Arc::new(ProviderClients::new(client, retry)))
        })
        .await
    }

    /// One connection resource per family plus the standalone resources.
    pub fn resources(&self) -> Vec<Box<dyn Resource>> {
        let mut resources: Vec<Box<dyn Resource>> = self
            .registry
            .codecs()
            .into_iter()
            .map(|codec| Box::new(ConnectionResource::new(codec)) as Box<dyn Resource>)
            .collect();
        resources.push(Box::new(EndpointResource::new()));
        resources.push(Box::new(FileUploadResource::new()));
        resources.push(Box::new(TransportPackageResource::new()));
        resources
    }

    pub fn data_sources(&self) -> Vec<Box<dyn DataSource>> {
        let mut sources: Vec<Box<dyn DataSource>> = self
            .registry
            .codecs()
            .into_iter()
            .map(|codec| Box::new(ConnectionDataSource::new(codec)) as Box<dyn DataSource>)
            .collect();
        sources.push(Box::new(EndpointsDataSource::new()));
        sources
    }
}
