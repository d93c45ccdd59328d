//! HTTP client for the IGA management API.
//!
//! [`IgaApi`] is the seam the resource adapter talks to: every method takes
//! the bearer token for exactly one attempt, so the retry engine can re-invoke
//! it with a refreshed token. [`HttpIgaClient`] is the reqwest implementation
//! and also issues tokens for the [`TokenStore`](crate::token_refresh::TokenStore).

use std::fmt;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

use crate::error::sanitize;
use crate::token_refresh::{IssuedTokens, TokenError, TokenIssuer};

pub const LOGIN_PATH: &str = "ECM/api/login";
pub const ACCESS_TOKEN_PATH: &str = "ECM/oauth/access_token";
pub const CONNECTION_UPSERT_PATH: &str = "ECM/api/v5/testConnection";
pub const CONNECTION_DETAILS_PATH: &str = "ECM/api/v5/getConnectionDetails";
pub const CREATE_ENDPOINT_PATH: &str = "ECM/api/v5/createEndpoint";
pub const UPDATE_ENDPOINT_PATH: &str = "ECM/api/v5/updateEndpoint";
pub const GET_ENDPOINTS_PATH: &str = "ECM/api/v5/getEndpoints";
pub const UPLOAD_SCHEMA_PATH: &str = "ECM/api/v5/uploadSchemaFile";
pub const EXPORT_TRANSPORT_PATH: &str = "ECM/api/v5/exportTransportPackage";

/// HTTP status the IGA API uses to signal that a named object does not exist.
pub const NOT_FOUND_STATUS: u16 = 412;

/// Failure of a single API attempt.
///
/// `status` is set whenever an HTTP response was received. The raw body is
/// kept for decoding structured error payloads; `Display` only ever shows
/// sanitized text.
#[derive(Debug, Clone)]
pub struct ApiCallError {
    pub status: Option<u16>,
    pub message: String,
    pub body: Option<String>,
}

impl ApiCallError {
    pub fn new<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            body: None,
        }
    }

    pub fn with_body<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(body.into());
        self
    }

    fn transport(err: reqwest::Error) -> Self {
        Self::new(err.status().map(|s| s.as_u16()), err.to_string())
    }

    /// 401 classification: the structured status wins; the text is only
    /// consulted when no response status is available.
    pub fn is_unauthorized(&self) -> bool {
        match self.status {
            Some(status) => status == StatusCode::UNAUTHORIZED.as_u16(),
            None => self.to_string().to_lowercase().contains("401"),
        }
    }

    /// HTTP 412, the API's "no such object" answer.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(NOT_FOUND_STATUS)
    }

    /// Structured body of the error response, if it was JSON.
    pub fn body_object(&self) -> Option<LooseObject> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str::<Value>(body).ok())
            .and_then(LooseObject::from_value)
    }
}

impl fmt::Display for ApiCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, sanitize(&self.message))?,
            None => write!(f, "{}", sanitize(&self.message))?,
        }
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            write!(f, " ({})", sanitize(body))?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiCallError {}

/// JSON object with case- and underscore-insensitive member lookup.
///
/// The IGA API spells the same member `Connectionkey`, `connectionkey` or
/// `connection_key` depending on the endpoint; lookups normalise both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LooseObject(Map<String, Value>);

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl LooseObject {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(key) {
            return Some(value);
        }
        let wanted = normalize_key(key);
        self.0
            .iter()
            .find(|(candidate, _)| normalize_key(candidate) == wanted)
            .map(|(_, value)| value)
    }

    /// Scalar member rendered as a string; JSON null and containers are `None`.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Member as a string, serializing objects and arrays to compact JSON.
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::Null => None,
            value @ (Value::Object(_) | Value::Array(_)) => Some(value.to_string()),
            _ => self.get_str(key),
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Nested object, also accepting a string that holds a JSON object.
    pub fn object(&self, key: &str) -> Option<LooseObject> {
        match self.get(key)? {
            Value::Object(map) => Some(Self(map.clone())),
            Value::String(text) => serde_json::from_str::<Value>(text)
                .ok()
                .and_then(Self::from_value),
            _ => None,
        }
    }

    /// Array of objects; non-object entries are skipped.
    pub fn objects(&self, key: &str) -> Vec<LooseObject> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| Self::from_value(item.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `errorCode` normalised to a string.
    pub fn error_code(&self) -> Option<String> {
        self.get_str("errorcode").map(|code| code.trim().to_string())
    }

    pub fn msg(&self) -> Option<String> {
        self.get_str("msg")
    }

    /// A missing error code counts as success.
    pub fn is_success(&self) -> bool {
        self.error_code().is_none_or(|code| code == "0")
    }
}

/// How to look up a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionLookup {
    Name(String),
    Key(i64),
}

impl ConnectionLookup {
    fn to_body(&self) -> Value {
        match self {
            ConnectionLookup::Name(name) => json!({ "connectionname": name }),
            ConnectionLookup::Key(key) => json!({ "connectionkey": key.to_string() }),
        }
    }
}

/// Filter for `getEndpoints`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    pub endpoint_name: Option<String>,
    pub security_system: Option<String>,
    pub max: Option<u32>,
    pub offset: Option<u32>,
}

impl EndpointFilter {
    pub fn by_name<S: Into<String>>(name: S) -> Self {
        Self {
            endpoint_name: Some(name.into()),
            ..Default::default()
        }
    }

    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(ref name) = self.endpoint_name {
            body.insert("endpointname".into(), Value::String(name.clone()));
        }
        if let Some(ref system) = self.security_system {
            body.insert("securitySystem".into(), Value::String(system.clone()));
        }
        if let Some(max) = self.max {
            body.insert("max".into(), Value::String(max.to_string()));
        }
        if let Some(offset) = self.offset {
            body.insert("offset".into(), Value::String(offset.to_string()));
        }
        Value::Object(body)
    }
}

/// One multipart schema-file upload.
#[derive(Debug, Clone)]
pub struct SchemaUpload {
    pub file_name: String,
    pub content: Vec<u8>,
    pub path_location: String,
}

/// IGA management API, one attempt per call.
#[async_trait]
pub trait IgaApi: Send + Sync {
    async fn create_or_update_connection(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError>;

    async fn get_connection_details(
        &self,
        token: &str,
        lookup: &ConnectionLookup,
    ) -> Result<LooseObject, ApiCallError>;

    async fn create_endpoint(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError>;

    async fn update_endpoint(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError>;

    async fn get_endpoints(
        &self,
        token: &str,
        filter: &EndpointFilter,
    ) -> Result<LooseObject, ApiCallError>;

    async fn upload_schema_file(
        &self,
        token: &str,
        upload: &SchemaUpload,
    ) -> Result<LooseObject, ApiCallError>;

    async fn export_transport_package(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError>;
}

/// reqwest-backed [`IgaApi`] and [`TokenIssuer`].
#[derive(Debug, Clone)]
pub struct HttpIgaClient {
    http: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl HttpIgaClient {
    pub fn new(base_url: Url, user_agent: &str) -> Result<Self, ApiCallError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ApiCallError::transport)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(base: &Url, path: &str) -> Result<Url, ApiCallError> {
        base.join(path)
            .map_err(|err| ApiCallError::new(None, format!("invalid api path {path}: {err}")))
    }

    async fn post_json(&self, token: &str, path: &str, body: &Value) -> Result<LooseObject, ApiCallError> {
        let url = Self::url(&self.base_url, path)?;
        debug!(path, "calling IGA api");
        let request = self.http.post(url).bearer_auth(token).json(body);
        Self::send(request, path).await
    }

    async fn send(request: RequestBuilder, path: &str) -> Result<LooseObject, ApiCallError> {
        let response = request.send().await.map_err(ApiCallError::transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiCallError::transport)?;

        if !status.is_success() {
            return Err(ApiCallError::new(
                Some(status.as_u16()),
                format!("{path} returned {status}"),
            )
            .with_body(text));
        }

        if text.trim().is_empty() {
            return Ok(LooseObject::default());
        }

        let value: Value = serde_json::from_str(&text).map_err(|err| {
            ApiCallError::new(Some(status.as_u16()), format!("{path} returned malformed JSON: {err}"))
                .with_body(text.clone())
        })?;

        LooseObject::from_value(value).ok_or_else(|| {
            ApiCallError::new(Some(status.as_u16()), format!("{path} returned a non-object body"))
        })
    }

    async fn request_tokens(request: RequestBuilder, path: &str) -> Result<IssuedTokens, TokenError> {
        let reply = Self::send(request, path).await.map_err(|err| {
            if err.is_unauthorized() {
                TokenError::Unauthorized(err.to_string())
            } else {
                TokenError::Transport(err)
            }
        })?;
        let parsed: TokenResponse = serde_json::from_value(reply.into_value())
            .map_err(|err| TokenError::MalformedResponse(err.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::MissingAccessToken)?;
        Ok(IssuedTokens {
            access_token,
            refresh_token: parsed.refresh_token.filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl IgaApi for HttpIgaClient {
    async fn create_or_update_connection(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, CONNECTION_UPSERT_PATH, &Value::Object(body.clone()))
            .await
    }

    async fn get_connection_details(
        &self,
        token: &str,
        lookup: &ConnectionLookup,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, CONNECTION_DETAILS_PATH, &lookup.to_body())
            .await
    }

    async fn create_endpoint(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, CREATE_ENDPOINT_PATH, &Value::Object(body.clone()))
            .await
    }

    async fn update_endpoint(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, UPDATE_ENDPOINT_PATH, &Value::Object(body.clone()))
            .await
    }

    async fn get_endpoints(
        &self,
        token: &str,
        filter: &EndpointFilter,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, GET_ENDPOINTS_PATH, &filter.to_body())
            .await
    }

    async fn upload_schema_file(
        &self,
        token: &str,
        upload: &SchemaUpload,
    ) -> Result<LooseObject, ApiCallError> {
        let url = Self::url(&self.base_url, UPLOAD_SCHEMA_PATH)?;
        // Parts are consumed by send, so the form is rebuilt for every attempt.
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(upload.content.clone())
                    .file_name(upload.file_name.clone()),
            )
            .text("pathLocation", upload.path_location.clone());
        debug!(file_name = %upload.file_name, path_location = %upload.path_location, "uploading schema file");
        let request = self.http.post(url).bearer_auth(token).multipart(form);
        Self::send(request, UPLOAD_SCHEMA_PATH).await
    }

    async fn export_transport_package(
        &self,
        token: &str,
        body: &Map<String, Value>,
    ) -> Result<LooseObject, ApiCallError> {
        self.post_json(token, EXPORT_TRANSPORT_PATH, &Value::Object(body.clone()))
            .await
    }
}

#[async_trait]
impl TokenIssuer for HttpIgaClient {
    async fn login(
        &self,
        base_url: &Url,
        username: &str,
        password: &str,
    ) -> Result<IssuedTokens, TokenError> {
        let url = Self::url(base_url, LOGIN_PATH).map_err(TokenError::Transport)?;
        let request = self
            .http
            .post(url)
            .json(&json!({ "username": username, "password": password }));
        Self::request_tokens(request, LOGIN_PATH).await
    }

    async fn refresh(&self, base_url: &Url, refresh_token: &str) -> Result<IssuedTokens, TokenError> {
        let url = Self::url(base_url, ACCESS_TOKEN_PATH).map_err(TokenError::Transport)?;
        let request = self.http.post(url).form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ]);
        Self::request_tokens(request, ACCESS_TOKEN_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_prefers_structured_status() {
        assert!(ApiCallError::new(Some(401), "denied").is_unauthorized());
        // A status is present, so the text is not consulted.
        assert!(!ApiCallError::new(Some(500), "upstream said 401").is_unauthorized());
        // No status: fall back to the text.
        assert!(ApiCallError::new(None, "server responded with 401 Unauthorized").is_unauthorized());
        assert!(!ApiCallError::new(None, "connection reset").is_unauthorized());
    }

    #[test]
    fn test_display_is_sanitized() {
        let err = ApiCallError::new(Some(400), "bad request")
            .with_body(r#"{"msg":"nope","password":"pw"}"#);
        let rendered = err.to_string();
        assert!(rendered.starts_with("HTTP 400: bad request"));
        assert!(!rendered.contains("\"pw\""));
    }

    #[test]
    fn test_loose_lookup_ignores_case_and_underscores() {
        let obj = LooseObject::from_value(json!({
            "Connectionkey": 42,
            "connection_name": "ok1",
            "errorCode": 0,
            "Connectionattributes": "{\"IMPORTURL\":\"https://x\"}"
        }))
        .unwrap();

        assert_eq!(obj.get_i64("connection_key"), Some(42));
        assert_eq!(obj.get_str("ConnectionName").as_deref(), Some("ok1"));
        assert_eq!(obj.error_code().as_deref(), Some("0"));
        assert!(obj.is_success());
        let attrs = obj.object("connectionattributes").unwrap();
        assert_eq!(attrs.get_str("importurl").as_deref(), Some("https://x"));
    }

    #[test]
    fn test_missing_error_code_is_success() {
        let obj = LooseObject::from_value(json!({ "msg": "ok" })).unwrap();
        assert!(obj.is_success());
        let failed = LooseObject::from_value(json!({ "errorcode": "1", "msg": "bad" })).unwrap();
        assert!(!failed.is_success());
    }

    #[test]
    fn test_error_body_object() {
        let err = ApiCallError::new(Some(412), "precondition failed")
            .with_body(r#"{"msg":"Failure","msgDescription":"nothing selected","errorcode":1}"#);
        assert!(err.is_not_found());
        let body = err.body_object().unwrap();
        assert_eq!(body.get_str("msgdescription").as_deref(), Some("nothing selected"));
        assert_eq!(body.error_code().as_deref(), Some("1"));
    }

    #[test]
    fn test_endpoint_filter_body() {
        let filter = EndpointFilter {
            endpoint_name: Some("ep1".into()),
            security_system: Some("ss1".into()),
            max: Some(10),
            offset: None,
        };
        assert_eq!(
            filter.to_body(),
            json!({ "endpointname": "ep1", "securitySystem": "ss1", "max": "10" })
        );
    }
}
