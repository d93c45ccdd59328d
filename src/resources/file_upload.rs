//! File upload resource
//!
//! Uploads a local file to one of the server's schema directories. The
//! extension decides the directory; a mismatch fails before the file is
//! opened. A changed content hash triggers a re-upload on update.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ClientSlot, rejected, respond, state_text, tombstone};
use crate::client::SchemaUpload;
use crate::error::{ErrorKind, Operation, ProviderError};
use crate::host::{
    self, CreateRequest, DeleteRequest, ProviderData, ReadRequest, Resource, ResourceResponse,
    UpdateRequest,
};
use crate::models::attr::Attr;
use crate::models::file_upload::FileUploadModel;
use crate::provider::ProviderClients;
use crate::telemetry::OperationContext;

pub const FILE_UPLOAD_FAMILY: &str = "file_upload";
pub const FILE_UPLOAD_RESOURCE_TYPE: &str = "iga_file_upload_resource";

pub const DATAFILES_LOCATION: &str = "Datafiles";
pub const SAV_LOCATION: &str = "SAV";

static EXTENSION_LOCATIONS: &[(&str, &str)] = &[
    ("csv", DATAFILES_LOCATION),
    ("txt", DATAFILES_LOCATION),
    ("json", DATAFILES_LOCATION),
    ("xlsx", DATAFILES_LOCATION),
    ("xls", DATAFILES_LOCATION),
    ("sav", SAV_LOCATION),
];

/// Server directory a file extension belongs to.
pub fn location_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSION_LOCATIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, location)| *location)
}

/// Check the extension and, when given, that `path_location` agrees with it.
pub fn check_location(path: &Path, path_location: Option<&str>) -> Result<&'static str, String> {
    let expected = location_for(path).ok_or_else(|| {
        format!(
            "unsupported file extension for '{}'; expected one of .csv .txt .json .xlsx .xls .sav",
            path.display()
        )
    })?;
    match path_location {
        Some(location) if !location.eq_ignore_ascii_case(expected) => Err(format!(
            "'{}' must be uploaded to {expected}, not {location}",
            path.display()
        )),
        _ => Ok(expected),
    }
}

#[derive(Default)]
pub struct FileUploadResource {
    clients: ClientSlot,
}

impl FileUploadResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: std::sync::Arc<ProviderClients>) -> Self {
        Self {
            clients: ClientSlot(Some(clients)),
        }
    }

    fn invalid(operation: Operation, detail: String) -> ProviderError {
        ProviderError::new(
            FILE_UPLOAD_FAMILY,
            operation,
            ErrorKind::InvalidConfig,
            "invalid file upload",
            detail,
        )
    }

    async fn upload(
        &self,
        ctx: &OperationContext,
        operation: Operation,
        plan: FileUploadModel,
        cancel: &CancellationToken,
    ) -> Result<ResourceResponse, ProviderError> {
        let clients = self.clients.get(FILE_UPLOAD_FAMILY, operation)?;
        let file_path = plan
            .file_path
            .non_empty()
            .ok_or_else(|| Self::invalid(operation, "file_path is required".to_string()))?
            .to_string();
        let path = Path::new(&file_path);
        let location = check_location(path, plan.path_location.non_empty())
            .map_err(|detail| Self::invalid(operation, detail))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Self::invalid(operation, format!("'{file_path}' has no file name")))?
            .to_string();
        ctx.bind_connection_name(&file_name);

        let content = tokio::fs::read(path).await.map_err(|err| {
            ProviderError::new(
                FILE_UPLOAD_FAMILY,
                operation,
                ErrorKind::FileReadFailed,
                "failed to read file",
                format!("{file_path}: {err}"),
            )
        })?;
        let digest = hex::encode(Sha256::digest(&content));

        let _guard = clients.locks.acquire(FILE_UPLOAD_RESOURCE_TYPE, &file_path).await;

        let upload = SchemaUpload {
            file_name: file_name.clone(),
            content,
            path_location: location.to_string(),
        };
        let api = &clients.api;
        let upload = &upload;
        let reply = clients
            .retry
            .call(cancel, "upload_schema_file", move |token| async move {
                api.upload_schema_file(&token, upload).await
            })
            .await
            .map_err(|err| err.into_provider_error(FILE_UPLOAD_FAMILY, operation, "file upload failed"))?;

        if !reply.is_success() {
            return Err(rejected(FILE_UPLOAD_FAMILY, operation, "IGA rejected the file", &reply));
        }

        let model = FileUploadModel {
            id: Attr::Known(format!("{location}/{file_name}")),
            file_path: Attr::Known(file_path),
            path_location: Attr::text(location),
            file_name: Attr::Known(file_name),
            file_sha256: Attr::Known(digest),
            uploaded_at: Attr::Known(Utc::now().to_rfc3339()),
            msg: Attr::from_non_empty(reply.msg()),
            error_code: Attr::from_non_empty(reply.error_code()),
        };
        info!(sha256 = ?model.file_sha256.as_known(), "file uploaded");
        Ok(ResourceResponse::with_state(host::encode_state(
            FILE_UPLOAD_FAMILY,
            operation,
            &model,
        )?))
    }

    async fn update_inner(&self, ctx: &OperationContext, request: UpdateRequest) -> Result<ResourceResponse, ProviderError> {
        let op = Operation::Update;
        let plan: FileUploadModel = host::extract(FILE_UPLOAD_FAMILY, op, ErrorKind::PlanExtraction, &request.plan)?;
        let state: FileUploadModel = host::extract(FILE_UPLOAD_FAMILY, op, ErrorKind::StateExtraction, &request.state)?;

        let unchanged_target = plan.file_path == state.file_path
            && (plan.path_location.non_empty().is_none() || plan.path_location == state.path_location);
        if unchanged_target && let Some(previous) = state.file_sha256.non_empty() {
            let path = plan.file_path.non_empty().unwrap_or_default();
            if let Ok(content) = tokio::fs::read(path).await
                && hex::encode(Sha256::digest(&content)) == previous
            {
                return Ok(ResourceResponse::with_state(request.state.clone()));
            }
        }
        self.upload(ctx, op, plan, &request.cancel).await
    }
}

#[async_trait]
impl Resource for FileUploadResource {
    fn type_name(&self) -> String {
        FILE_UPLOAD_RESOURCE_TYPE.to_string()
    }

    fn configure(&mut self, provider_data: Option<ProviderData>) -> Result<(), ProviderError> {
        self.clients.configure(FILE_UPLOAD_FAMILY, provider_data)
    }

    fn validate_config(&self, config: &Value) -> Result<(), ProviderError> {
        let model: FileUploadModel =
            host::extract(FILE_UPLOAD_FAMILY, Operation::Validate, ErrorKind::ConfigExtraction, config)?;
        if let Some(path) = model.file_path.non_empty() {
            check_location(Path::new(path), model.path_location.non_empty())
                .map_err(|detail| Self::invalid(Operation::Validate, detail))?;
        }
        Ok(())
    }

    async fn create(&self, request: CreateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(FILE_UPLOAD_FAMILY, Operation::Create);
        respond(
            ctx.scope(async {
                let plan: FileUploadModel = host::extract(
                    FILE_UPLOAD_FAMILY,
                    Operation::Create,
                    ErrorKind::PlanExtraction,
                    &request.plan,
                )?;
                self.upload(&ctx, Operation::Create, plan, &request.cancel).await
            })
            .await,
        )
    }

    /// The server offers no lookup for uploaded files; state is kept as is.
    async fn read(&self, request: ReadRequest) -> ResourceResponse {
        let ctx = OperationContext::new(FILE_UPLOAD_FAMILY, Operation::Read);
        ctx.scope(async {
            debug!("uploaded file has no remote lookup, keeping state");
            ResourceResponse::with_state(request.state)
        })
        .await
    }

    async fn update(&self, request: UpdateRequest) -> ResourceResponse {
        let ctx = OperationContext::new(FILE_UPLOAD_FAMILY, Operation::Update);
        respond(ctx.scope(self.update_inner(&ctx, request)).await)
    }

    async fn delete(&self, request: DeleteRequest) -> ResourceResponse {
        let ctx = OperationContext::new(FILE_UPLOAD_FAMILY, Operation::Delete);
        let name = state_text(&request.state, "file_name");
        respond(ctx.scope(async { tombstone(&ctx, "uploaded file", &name) }).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::connection::tests::{ScriptedApi, clients};
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_extension_location_consistency() {
        assert_eq!(check_location(Path::new("users.csv"), Some("Datafiles")), Ok("Datafiles"));
        assert_eq!(check_location(Path::new("schema.SAV"), Some("SAV")), Ok("SAV"));
        assert_eq!(check_location(Path::new("users.xlsx"), None), Ok("Datafiles"));
        assert!(check_location(Path::new("users.csv"), Some("SAV")).is_err());
        assert!(check_location(Path::new("run.exe"), None).is_err());
        assert!(check_location(Path::new("noext"), None).is_err());
    }

    #[tokio::test]
    async fn test_mismatch_fails_before_opening_file() {
        let api = ScriptedApi::with(vec![]);
        let resource = FileUploadResource::with_clients(clients(api.clone()));
        // The path does not exist; a read attempt would surface file_read_failed.
        let response = resource
            .create(CreateRequest {
                plan: json!({ "file_path": "/nonexistent/users.csv", "path_location": "SAV" }),
                ..Default::default()
            })
            .await;

        let code = response.diagnostics.errors().next().and_then(|d| d.code.clone());
        assert_eq!(code.as_deref(), Some("file_upload_create_invalid_config"));
        assert!(api.ops().is_empty());
    }

    #[tokio::test]
    async fn test_upload_records_hash_and_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"id,name\n1,alice\n").unwrap();

        let api = ScriptedApi::with(vec![Ok(json!({ "errorCode": "0", "msg": "File uploaded" }))]);
        let resource = FileUploadResource::with_clients(clients(api.clone()));
        let response = resource
            .create(CreateRequest {
                plan: json!({ "file_path": path.to_str().unwrap(), "path_location": "Datafiles" }),
                ..Default::default()
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        let state = response.state.unwrap();
        assert_eq!(state["id"], json!("Datafiles/users.csv"));
        assert_eq!(state["file_name"], json!("users.csv"));
        assert_eq!(
            state["file_sha256"],
            json!(hex::encode(Sha256::digest(b"id,name\n1,alice\n")))
        );
        assert!(state["uploaded_at"].is_string());

        // Same content: update keeps state without calling the API.
        let update = resource
            .update(UpdateRequest {
                plan: json!({ "file_path": path.to_str().unwrap(), "path_location": "Datafiles" }),
                state: state.clone(),
                ..Default::default()
            })
            .await;
        assert_eq!(update.state, Some(state));
        assert_eq!(api.ops(), vec!["upload"]);
    }
}
