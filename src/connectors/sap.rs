//! SAP connector
//!
//! JCo settings for import and, optionally, a second set for provisioning
//! (`prov_*`). Both passwords are write-only.

use std::sync::Arc;

use crate::connectors::{
    ConnectorFamily, ConnectorMetadata, FieldSpec, Registry, VariantCodec,
};

static SAP_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("message_server", "MESSAGESERVER"),
    FieldSpec::plain("jco_ashost", "JCO_ASHOST"),
    FieldSpec::plain("jco_sysnr", "JCO_SYSNR"),
    FieldSpec::plain("jco_client", "JCO_CLIENT"),
    FieldSpec::plain("jco_user", "JCO_USER"),
    FieldSpec::secret("password", "PASSWORD"),
    FieldSpec::plain("jco_lang", "JCO_LANG"),
    FieldSpec::plain("jco_r3name", "JCO_R3NAME"),
    FieldSpec::plain("jco_mshost", "JCO_MSHOST"),
    FieldSpec::plain("jco_msserv", "JCO_MSSERV"),
    FieldSpec::plain("jco_group", "JCO_GROUP"),
    FieldSpec::plain("snc", "SNC"),
    FieldSpec::plain("jco_snc_mode", "JCO_SNC_MODE"),
    FieldSpec::plain("jco_snc_partnername", "JCO_SNC_PARTNERNAME"),
    FieldSpec::plain("jco_snc_myname", "JCO_SNC_MYNAME"),
    FieldSpec::plain("jco_snc_library", "JCO_SNC_LIBRARY"),
    FieldSpec::plain("jco_snc_qop", "JCO_SNC_QOP"),
    FieldSpec::plain("tables", "TABLES"),
    FieldSpec::plain("systemname", "SYSTEMNAME"),
    FieldSpec::plain("terminated_user_group", "TERMINATEDUSERGROUP"),
    FieldSpec::plain("terminated_user_role_action", "TERMINATED_USER_ROLE_ACTION"),
    FieldSpec::plain("prov_jco_ashost", "PROV_JCO_ASHOST"),
    FieldSpec::plain("prov_jco_sysnr", "PROV_JCO_SYSNR"),
    FieldSpec::plain("prov_jco_client", "PROV_JCO_CLIENT"),
    FieldSpec::plain("prov_jco_user", "PROV_JCO_USER"),
    FieldSpec::secret("prov_password", "PROV_PASSWORD"),
    FieldSpec::json("create_account_json", "CREATEACCOUNTJSON"),
    FieldSpec::json("enable_account_json", "ENABLEACCOUNTJSON"),
    FieldSpec::json("update_account_json", "UPDATEACCOUNTJSON"),
    FieldSpec::json("user_import_json", "USERIMPORTJSON"),
    FieldSpec::json("fire_fighter_id_grant_access_json", "FIREFIGHTERID_GRANT_ACCESS_JSON"),
    FieldSpec::json("status_threshold_config", "STATUS_THRESHOLD_CONFIG"),
    FieldSpec::boolean("set_cua_system", "SETCUASYSTEM"),
    FieldSpec::json("pam_config", "PAM_CONFIG"),
];

pub static SAP_METADATA: ConnectorMetadata = ConnectorMetadata {
    family: ConnectorFamily::Sap,
    display_name: "SAP",
    connection_type: "SAP",
    accepted_types: &["SAP"],
    fields: SAP_FIELDS,
};

pub struct SapConnector;

impl VariantCodec for SapConnector {
    fn metadata(&self) -> &'static ConnectorMetadata {
        &SAP_METADATA
    }
}

pub fn register_sap_connector(registry: &mut Registry) {
    registry.register(Arc::new(SapConnector));
}
