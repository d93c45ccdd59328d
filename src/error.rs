//! # Error Handling
//!
//! Every error surfaced to the host runtime is a [`ProviderError`] carrying a
//! stable `[code]` prefix of the form `{family}_{operation}_{kind}` and the
//! correlation id of the operation that produced it. Detail text coming from
//! the IGA API is always passed through [`sanitize`] first.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::telemetry;

/// Replacement text for redacted values.
pub const REDACTED: &str = "***";

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderConfig,
    PlanExtraction,
    ConfigExtraction,
    StateExtraction,
    StateUpdate,
    MissingIdentifier,
    DuplicateName,
    NameImmutable,
    TypeImmutable,
    TypeMismatch,
    ReadFailed,
    CreateFailed,
    UpdateFailed,
    ApiError,
    AuthRefreshFailed,
    AuthExhausted,
    InvalidConfig,
    DeleteUnsupported,
    ImportUnsupported,
    FileReadFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ProviderConfig => "provider_config",
            ErrorKind::PlanExtraction => "plan_extraction",
            ErrorKind::ConfigExtraction => "config_extraction",
            ErrorKind::StateExtraction => "state_extraction",
            ErrorKind::StateUpdate => "state_update",
            ErrorKind::MissingIdentifier => "missing_identifier",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::NameImmutable => "name_immutable",
            ErrorKind::TypeImmutable => "type_immutable",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ReadFailed => "read_failed",
            ErrorKind::CreateFailed => "create_failed",
            ErrorKind::UpdateFailed => "update_failed",
            ErrorKind::ApiError => "api_error",
            ErrorKind::AuthRefreshFailed => "auth_refresh_failed",
            ErrorKind::AuthExhausted => "auth_exhausted",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::DeleteUnsupported => "delete_unsupported",
            ErrorKind::ImportUnsupported => "import_unsupported",
            ErrorKind::FileReadFailed => "file_read_failed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Configure,
    Validate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::Configure => "configure",
            Operation::Validate => "validate",
        }
    }

    /// Transport failure kind for this phase.
    pub fn failure_kind(&self) -> ErrorKind {
        match self {
            Operation::Create => ErrorKind::CreateFailed,
            Operation::Update => ErrorKind::UpdateFailed,
            _ => ErrorKind::ReadFailed,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-parseable error code, rendered as `{family}_{operation}_{kind}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    pub family: String,
    pub operation: Operation,
    pub kind: ErrorKind,
}

impl ErrorCode {
    pub fn new<S: Into<String>>(family: S, operation: Operation, kind: ErrorKind) -> Self {
        Self {
            family: family.into().to_ascii_lowercase(),
            operation,
            kind,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.family, self.operation, self.kind)
    }
}

/// Error surfaced to the host runtime as a diagnostic.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub code: ErrorCode,
    pub summary: String,
    pub detail: String,
    pub correlation_id: Option<String>,
}

impl ProviderError {
    /// Build an error; `detail` is sanitized on the way in.
    pub fn new<F, S, D>(family: F, operation: Operation, kind: ErrorKind, summary: S, detail: D) -> Self
    where
        F: Into<String>,
        S: Into<String>,
        D: AsRef<str>,
    {
        Self {
            code: ErrorCode::new(family, operation, kind),
            summary: summary.into(),
            detail: sanitize(detail.as_ref()),
            correlation_id: telemetry::current_correlation_id(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "[{}] {}", self.code, self.summary)
        } else {
            write!(f, "[{}] {}: {}", self.code, self.summary, self.detail)
        }
    }
}

impl std::error::Error for ProviderError {}

/// Strip credentials from text that may have come from an HTTP exchange.
///
/// JSON documents are redacted structurally: every object member whose name
/// contains `password`, `secret`, `token`, `key` or `passphrase` is replaced
/// with `***`. Anything else is scrubbed with pattern rules covering header
/// lines, bearer tokens, embedded JSON members and form-encoded pairs.
pub fn sanitize(message: &str) -> String {
    let trimmed = message.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(mut value) = serde_json::from_str::<Value>(trimmed)
    {
        redact_value(&mut value);
        return value.to_string();
    }
    sanitize_text(message)
}

fn sanitize_text(message: &str) -> String {
    let rules = rules();
    let out = rules.header_line.replace_all(message, "${1}***");
    let out = rules.bearer.replace_all(&out, "${1} ***");
    let out = rules.json_member.replace_all(&out, "${1}\"***\"");
    let out = rules.escaped_json_member.replace_all(&out, r#"${1}\"***\""#);
    let out = rules.form_pair.replace_all(&out, "${1}***");
    out.into_owned()
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, member) in map.iter_mut() {
                if is_sensitive_name(key) {
                    *member = Value::String(REDACTED.to_string());
                } else {
                    redact_value(member);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        Value::String(text) => {
            let cleaned = sanitize(text);
            if cleaned != *text {
                *text = cleaned;
            }
        }
        _ => {}
    }
}

/// True for field names that must never be surfaced with their value.
pub fn is_sensitive_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["password", "secret", "token", "key", "passphrase"]
        .iter()
        .any(|needle| lower.contains(needle))
}

struct SanitizeRules {
    header_line: Regex,
    bearer: Regex,
    json_member: Regex,
    escaped_json_member: Regex,
    form_pair: Regex,
}

fn rules() -> &'static SanitizeRules {
    static RULES: OnceLock<SanitizeRules> = OnceLock::new();
    RULES.get_or_init(|| SanitizeRules {
        header_line: Regex::new(
            r"(?im)^(\s*(?:authorization|proxy-authorization|cookie|set-cookie|x-api-key|x-auth-token)\s*:\s*).*$",
        )
        .expect("static regex"),
        bearer: Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9\-._~+/]+=*").expect("static regex"),
        json_member: Regex::new(
            r#"(?i)("[^"\\]*(?:password|secret|token|key|passphrase)[^"\\]*"\s*:\s*)("(?:[^"\\]|\\.)*"|[^,}\]\s]+)"#,
        )
        .expect("static regex"),
        escaped_json_member: Regex::new(
            r#"(?i)(\\"[^"\\]*(?:password|secret|token|key|passphrase)[^"\\]*\\"\s*:\s*)(\\"(?:[^"\\]|\\[^"])*\\"|[^,}\]\s\\]+)"#,
        )
        .expect("static regex"),
        form_pair: Regex::new(
            r"(?i)\b([A-Za-z0-9_\-]*(?:password|secret|token|key|passphrase)[A-Za-z0-9_\-]*=)[^&\s]+",
        )
        .expect("static regex"),
    })
}
