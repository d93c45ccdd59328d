//! Connectors module
//!
//! This module provides the connector codec layer including:
//! - The `VariantCodec` trait every connector family implements
//! - Field-table metadata and the shared table-driven codec
//! - The registry used to look families up by slug or connection type
//! - Individual connector family definitions

pub mod active_directory;
pub mod codec;
pub mod entra_id;
pub mod github_rest;
pub mod metadata;
pub mod okta;
pub mod registry;
pub mod rest;
pub mod salesforce;
pub mod sap;
pub mod sftp;
pub mod trait_;
pub mod workday_soap;

pub use codec::{CodecError, ConnectionDetails};
pub use metadata::{ConnectorFamily, ConnectorMetadata, FieldKind, FieldSpec};
pub use registry::{Registry, RegistryError};
pub use trait_::VariantCodec;

pub use active_directory::{ActiveDirectoryConnector, register_active_directory_connector};
pub use entra_id::{EntraIdConnector, register_entra_id_connector};
pub use github_rest::{GithubRestConnector, register_github_rest_connector};
pub use okta::{OktaConnector, register_okta_connector};
pub use rest::{RestConnector, register_rest_connector};
pub use salesforce::{SalesforceConnector, register_salesforce_connector};
pub use sap::{SapConnector, register_sap_connector};
pub use sftp::{SftpConnector, register_sftp_connector};
pub use workday_soap::{WorkdaySoapConnector, register_workday_soap_connector};
