//! Connector metadata types
//!
//! Static description of a connector family: its discriminant on the wire and
//! the table mapping declarative attribute names to IGA API attribute names.

use serde::Serialize;

/// Connector families with a dedicated resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorFamily {
    ActiveDirectory,
    EntraId,
    Okta,
    Salesforce,
    Sap,
    Sftp,
    Rest,
    WorkdaySoap,
    GithubRest,
}

impl ConnectorFamily {
    pub const ALL: [ConnectorFamily; 9] = [
        ConnectorFamily::ActiveDirectory,
        ConnectorFamily::EntraId,
        ConnectorFamily::Okta,
        ConnectorFamily::Salesforce,
        ConnectorFamily::Sap,
        ConnectorFamily::Sftp,
        ConnectorFamily::Rest,
        ConnectorFamily::WorkdaySoap,
        ConnectorFamily::GithubRest,
    ];

    /// Token used in resource type names and error codes.
    pub fn slug(&self) -> &'static str {
        match self {
            ConnectorFamily::ActiveDirectory => "ad",
            ConnectorFamily::EntraId => "entraid",
            ConnectorFamily::Okta => "okta",
            ConnectorFamily::Salesforce => "salesforce",
            ConnectorFamily::Sap => "sap",
            ConnectorFamily::Sftp => "sftp",
            ConnectorFamily::Rest => "rest",
            ConnectorFamily::WorkdaySoap => "workday_soap",
            ConnectorFamily::GithubRest => "github_rest",
        }
    }

    /// `iga_{slug}_connection_resource`
    pub fn resource_type_name(&self) -> String {
        format!("iga_{}_connection_resource", self.slug())
    }

    /// `iga_{slug}_connection_datasource`
    pub fn datasource_type_name(&self) -> String {
        format!("iga_{}_connection_datasource", self.slug())
    }
}

/// How an attribute is carried between model and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free-form string.
    Plain,
    /// String-encoded boolean, normalised to `"true"`/`"false"`.
    Bool,
    /// String-encoded integer.
    Int,
    /// JSON document carried as a string; compared semantically on read.
    Json,
    /// Sensitive and never returned by the API. Has an `{attr}_wo` twin.
    Secret,
}

/// One attribute of a connector family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Declarative attribute name.
    pub attr: &'static str,
    /// Attribute name in the IGA API payload.
    pub api: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn plain(attr: &'static str, api: &'static str) -> Self {
        Self { attr, api, kind: FieldKind::Plain }
    }

    pub const fn boolean(attr: &'static str, api: &'static str) -> Self {
        Self { attr, api, kind: FieldKind::Bool }
    }

    pub const fn int(attr: &'static str, api: &'static str) -> Self {
        Self { attr, api, kind: FieldKind::Int }
    }

    pub const fn json(attr: &'static str, api: &'static str) -> Self {
        Self { attr, api, kind: FieldKind::Json }
    }

    pub const fn secret(attr: &'static str, api: &'static str) -> Self {
        Self { attr, api, kind: FieldKind::Secret }
    }

    pub fn is_secret(&self) -> bool {
        self.kind == FieldKind::Secret
    }

    /// Name of the write-only twin, for secret fields.
    pub fn write_only_attr(&self) -> Option<String> {
        self.is_secret().then(|| format!("{}_wo", self.attr))
    }
}

/// Metadata about a connector family.
#[derive(Debug, Serialize)]
pub struct ConnectorMetadata {
    pub family: ConnectorFamily,
    /// Human readable name used in diagnostics.
    pub display_name: &'static str,
    /// Discriminant sent as `connectiontype`.
    pub connection_type: &'static str,
    /// Server spellings of the discriminant accepted on read.
    pub accepted_types: &'static [&'static str],
    pub fields: &'static [FieldSpec],
}

impl ConnectorMetadata {
    pub fn field(&self, attr: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.attr == attr)
    }

    pub fn secret_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_secret())
    }

    /// Whether `attr` names a field or the write-only twin of a secret field.
    pub fn knows_attr(&self, attr: &str) -> bool {
        if self.field(attr).is_some() {
            return true;
        }
        attr.strip_suffix("_wo")
            .and_then(|base| self.field(base))
            .is_some_and(FieldSpec::is_secret)
    }

    /// Case-insensitive match of a server-reported connection type.
    pub fn accepts_type(&self, connection_type: &str) -> bool {
        let wanted = connection_type.trim();
        self.accepted_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FIELDS: &[FieldSpec] = &[
        FieldSpec::plain("url", "URL"),
        FieldSpec::secret("password", "PASSWORD"),
    ];

    static META: ConnectorMetadata = ConnectorMetadata {
        family: ConnectorFamily::ActiveDirectory,
        display_name: "Active Directory",
        connection_type: "AD",
        accepted_types: &["AD"],
        fields: FIELDS,
    };

    #[test]
    fn test_type_names() {
        assert_eq!(
            ConnectorFamily::WorkdaySoap.resource_type_name(),
            "iga_workday_soap_connection_resource"
        );
        assert_eq!(
            ConnectorFamily::Okta.datasource_type_name(),
            "iga_okta_connection_datasource"
        );
    }

    #[test]
    fn test_knows_write_only_twins_of_secrets_only() {
        assert!(META.knows_attr("url"));
        assert!(META.knows_attr("password_wo"));
        assert!(!META.knows_attr("url_wo"));
        assert!(!META.knows_attr("nope"));
    }

    #[test]
    fn test_accepts_type_ignores_case() {
        assert!(META.accepts_type("ad"));
        assert!(!META.accepts_type("AzureAD"));
    }
}
