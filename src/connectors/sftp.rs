//! SFTP connector
//!
//! File-based import over SFTP. The credential value and key passphrase are
//! write-only.

use std::sync::Arc;

use crate::connectors::codec::{self, CodecError};
use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};
use crate::models::connection::ConnectionModel;

static SFTP_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("host_name", "HOST_NAME"),
    FieldSpec::int("port_number", "PORT_NUMBER"),
    FieldSpec::plain("username", "USERNAME"),
    FieldSpec::plain("auth_credential_type", "AUTH_CREDENTIAL_TYPE"),
    FieldSpec::secret("auth_credential_value", "AUTH_CREDENTIAL_VALUE"),
    FieldSpec::secret("passphrase", "PASSPHRASE"),
    FieldSpec::plain("files_to_get", "FILES_TO_GET"),
    FieldSpec::plain("files_to_put", "FILES_TO_PUT"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static SFTP_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::Sftp,
    display_name: "SFTP",
    connection_type: "SFTP",
    accepted_types: &["SFTP"],
    fields: SFTP_FIELDS,
};

pub struct SftpConnector;

impl VariantCodec for SftpConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &SFTP_METADATA
    }

    fn validate(&self, config: &ConnectionModel) -> Result<(), CodecError> {
        codec::validate(self.metadata(), config)?;
        if let Some(port) = config.attr("port_number")
            && !matches!(port.trim().parse::<u32>(), Ok(1..=65535))
        {
            return Err(CodecError::InvalidInteger {
                attr: "port_number".to_string(),
                value: port.to_string(),
            });
        }
        Ok(())
    }
}

pub fn register_sftp_connector(registry: &mut Registry) {
    registry.register(Arc::new(SftpConnector));
}
