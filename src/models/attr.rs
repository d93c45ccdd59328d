//! Tri-valued attribute values
//!
//! The host runtime distinguishes an attribute that is absent (`null`), one
//! whose value is only known after apply (`unknown`) and one with a concrete
//! value. [`Attr`] carries that distinction through the declarative models.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Wire marker the host runtime uses for values that are not yet known.
pub const UNKNOWN_SENTINEL: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// A declarative attribute: null, unknown, or known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attr<T> {
    #[default]
    Null,
    Unknown,
    Known(T),
}

impl<T> Attr<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Known(_))
    }

    /// Borrow the value when known.
    pub fn as_known(&self) -> Option<&T> {
        match self {
            Attr::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Consume into the known value.
    pub fn known(self) -> Option<T> {
        match self {
            Attr::Known(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Clone> Attr<T> {
    /// Keep `self` unless it is null, in which case fall back to `prior`.
    ///
    /// Used on read so a value the server does not echo back never erases a
    /// previously known one.
    pub fn or_prior(self, prior: &Attr<T>) -> Attr<T> {
        match self {
            Attr::Null => prior.clone(),
            other => other,
        }
    }
}

impl Attr<String> {
    /// Known, non-empty string value. Null, unknown and `""` all map to `None`.
    pub fn non_empty(&self) -> Option<&str> {
        match self {
            Attr::Known(value) if !value.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Build from an optional string, treating `""` as null.
    pub fn from_non_empty<S: Into<String>>(value: Option<S>) -> Self {
        match value.map(Into::into) {
            Some(value) if !value.is_empty() => Attr::Known(value),
            _ => Attr::Null,
        }
    }

    /// Convenience constructor for known string values.
    pub fn text<S: Into<String>>(value: S) -> Self {
        Attr::Known(value.into())
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Attr::Known(value),
            None => Attr::Null,
        }
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Null => serializer.serialize_none(),
            Attr::Unknown => serializer.serialize_str(UNKNOWN_SENTINEL),
            Attr::Known(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        match raw {
            Value::Null => Ok(Attr::Null),
            Value::String(ref text) if text == UNKNOWN_SENTINEL => Ok(Attr::Unknown),
            other => match serde_json::from_value::<T>(other.clone()) {
                Ok(value) => Ok(Attr::Known(value)),
                // Scalars are accepted in their string form (`true` -> "true").
                Err(err) => match other {
                    Value::Bool(_) | Value::Number(_) => {
                        serde_json::from_value::<T>(Value::String(other.to_string()))
                            .map(Attr::Known)
                            .map_err(|_| D::Error::custom(err))
                    }
                    _ => Err(D::Error::custom(err)),
                },
            },
        }
    }
}

/// Canonical lowercase form of a stringly-typed boolean.
///
/// Values that are not recognisably boolean are returned unchanged.
pub fn normalize_bool_str(value: &str) -> String {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => "true".to_string(),
        "false" | "0" | "no" => "false".to_string(),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        name: Attr<String>,
        #[serde(default)]
        count: Attr<i64>,
        #[serde(default)]
        enabled: Attr<bool>,
    }

    #[test]
    fn test_deserialize_three_states() {
        let sample: Sample = serde_json::from_value(json!({
            "name": UNKNOWN_SENTINEL,
            "count": 3,
            "enabled": null
        }))
        .unwrap();

        assert_eq!(sample.name, Attr::Unknown);
        assert_eq!(sample.count, Attr::Known(3));
        assert_eq!(sample.enabled, Attr::Null);
    }

    #[test]
    fn test_missing_field_is_null() {
        let sample: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(sample.name.is_null());
        assert!(sample.count.is_null());
    }

    #[test]
    fn test_scalar_coerced_into_string() {
        let sample: Sample = serde_json::from_value(json!({ "name": true })).unwrap();
        assert_eq!(sample.name, Attr::text("true"));

        let sample: Sample = serde_json::from_value(json!({ "name": 42 })).unwrap();
        assert_eq!(sample.name, Attr::text("42"));
    }

    #[test]
    fn test_type_mismatch_still_fails() {
        let result = serde_json::from_value::<Sample>(json!({ "count": "many" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_unknown_as_sentinel() {
        let sample = Sample {
            name: Attr::Unknown,
            count: Attr::Null,
            enabled: Attr::Known(false),
        };
        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["name"], json!(UNKNOWN_SENTINEL));
        assert_eq!(value["count"], Value::Null);
        assert_eq!(value["enabled"], json!(false));
    }

    #[test]
    fn test_non_empty_treats_empty_as_null() {
        assert_eq!(Attr::text("").non_empty(), None);
        assert_eq!(Attr::<String>::Unknown.non_empty(), None);
        assert_eq!(Attr::text("x").non_empty(), Some("x"));
        assert_eq!(Attr::from_non_empty(Some("")), Attr::Null);
    }

    #[test]
    fn test_or_prior_keeps_known_value() {
        let prior = Attr::text("secret");
        assert_eq!(Attr::Null.or_prior(&prior), prior);
        assert_eq!(Attr::text("new").or_prior(&prior), Attr::text("new"));
    }

    #[test]
    fn test_normalize_bool_str() {
        assert_eq!(normalize_bool_str("TRUE"), "true");
        assert_eq!(normalize_bool_str(" False "), "false");
        assert_eq!(normalize_bool_str("1"), "true");
        assert_eq!(normalize_bool_str("maybe"), "maybe");
    }
}
