//! File upload model

use serde::{Deserialize, Serialize};

use super::attr::Attr;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUploadModel {
    /// `{path_location}/{file_name}`
    #[serde(default)]
    pub id: Attr<String>,
    /// Local path of the file to upload
    #[serde(default)]
    pub file_path: Attr<String>,
    /// Server-side directory, `Datafiles` or `SAV`
    #[serde(default)]
    pub path_location: Attr<String>,
    #[serde(default)]
    pub file_name: Attr<String>,
    /// Hex SHA-256 of the uploaded content
    #[serde(default)]
    pub file_sha256: Attr<String>,
    /// RFC 3339 timestamp of the last upload
    #[serde(default)]
    pub uploaded_at: Attr<String>,
    #[serde(default)]
    pub msg: Attr<String>,
    #[serde(default)]
    pub error_code: Attr<String>,
}
