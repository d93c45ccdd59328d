//! Variant codec trait definition
//!
//! Defines the interface every connector family implements. The default
//! methods run the shared table-driven codec; families override them only
//! where their payload deviates.

use serde_json::{Map, Value};

use crate::connectors::codec::{self, CodecError, ConnectionDetails};
use crate::connectors::metadata::{ConnectorFamily, ConnectorMetadata};
use crate::models::connection::ConnectionModel;

/// Per-family projection between [`ConnectionModel`] and the IGA payload.
pub trait VariantCodec: Send + Sync {
    fn metadata(&self) -> &'static ConnectorMetadata;

    fn family(&self) -> ConnectorFamily {
        self.metadata().family
    }

    /// Local checks run before any remote call.
    fn validate(&self, config: &ConnectionModel) -> Result<(), CodecError> {
        codec::validate(self.metadata(), config)
    }

    /// `model + config → request payload`.
    fn encode(
        &self,
        plan: &ConnectionModel,
        config: &ConnectionModel,
        prior: Option<&ConnectionModel>,
    ) -> Result<Map<String, Value>, CodecError> {
        codec::encode(self.metadata(), plan, config, prior)
    }

    /// `response → model`, keeping everything the server does not return.
    fn decode(&self, details: &ConnectionDetails, prior: &ConnectionModel) -> ConnectionModel {
        codec::decode(self.metadata(), details, prior)
    }
}
