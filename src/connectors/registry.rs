//! Connector registry
//!
//! In-memory registry for storing and retrieving connector codecs and metadata.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connectors::{ConnectorMetadata, VariantCodec};

/// Error type for registry operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Connector '{name}' not found")]
    ConnectorNotFound { name: String },
}

/// Registry that stores codecs keyed by family slug
#[derive(Clone)]
pub struct Registry {
    codecs: HashMap<String, Arc<dyn VariantCodec>>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registry holding every built-in connector family
    pub fn with_builtin_connectors() -> Self {
        let mut reg = Self::new();
        crate::connectors::active_directory::register_active_directory_connector(&mut reg);
        crate::connectors::entra_id::register_entra_id_connector(&mut reg);
        crate::connectors::okta::register_okta_connector(&mut reg);
        crate::connectors::salesforce::register_salesforce_connector(&mut reg);
        crate::connectors::sap::register_sap_connector(&mut reg);
        crate::connectors::sftp::register_sftp_connector(&mut reg);
        crate::connectors::rest::register_rest_connector(&mut reg);
        crate::connectors::workday_soap::register_workday_soap_connector(&mut reg);
        crate::connectors::github_rest::register_github_rest_connector(&mut reg);
        reg
    }

    /// Register a codec under its family slug
    pub fn register(&mut self, codec: Arc<dyn VariantCodec>) {
        let slug = codec.family().slug().to_string();
        self.codecs.insert(slug, codec);
    }

    /// Get a codec by family slug
    pub fn get(&self, slug: &str) -> Result<Arc<dyn VariantCodec>, RegistryError> {
        self.codecs
            .get(slug)
            .cloned()
            .ok_or_else(|| RegistryError::ConnectorNotFound {
                name: slug.to_string(),
            })
    }

    /// Find the codec whose family accepts a server-reported connection type
    pub fn get_by_connection_type(
        &self,
        connection_type: &str,
    ) -> Result<Arc<dyn VariantCodec>, RegistryError> {
        self.codecs
            .values()
            .find(|codec| codec.metadata().accepts_type(connection_type))
            .cloned()
            .ok_or_else(|| RegistryError::ConnectorNotFound {
                name: connection_type.to_string(),
            })
    }

    /// All codecs, sorted by slug for stable ordering
    pub fn codecs(&self) -> Vec<Arc<dyn VariantCodec>> {
        let mut codecs: Vec<_> = self.codecs.values().cloned().collect();
        codecs.sort_by_key(|codec| codec.family().slug());
        codecs
    }

    /// Metadata for all families, sorted by slug for stable ordering
    pub fn list_metadata(&self) -> Vec<&'static ConnectorMetadata> {
        self.codecs().iter().map(|codec| codec.metadata()).collect()
    }

    /// Resolve a family by slug, falling back to its connection type
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn VariantCodec>, RegistryError> {
        self.get(name)
            .or_else(|_| self.get_by_connection_type(name))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
