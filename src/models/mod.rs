//! # Data Models
//!
//! Declarative models exchanged with the host runtime. Every attribute is an
//! [`Attr`] so null, unknown and known values survive the round trip.

pub mod attr;
pub mod connection;
pub mod endpoint;
pub mod file_upload;
pub mod transport;

pub use attr::Attr;
pub use connection::ConnectionModel;
pub use endpoint::{EmailTemplate, EndpointModel, MappedEndpoint, RequestableRoleType};
pub use file_upload::FileUploadModel;
pub use transport::{ObjectsToExport, TransportPackageModel};
