use serde::Serialize;
use serde_json::{Map, Value};

use crate::OAuthError;

pub type RawUser = Map<String, Value>;

/// Normalized end-user record produced by a provider's field mapping and
/// decorated with the token metadata of the exchange that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
    pub verified: bool,
    pub preferred_username: String,
    pub given_name: String,
    pub family_name: String,
    pub birthdate: String,
    pub gender: String,
    pub birthplace: String,
    pub birthcountry: String,
    pub raw: RawUser,
    pub token_id: Option<String>,
    pub token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Scalar field that must be present and non-empty. Numbers are accepted
/// and rendered as strings.
pub fn required_string(raw: &RawUser, field: &str) -> Result<String, OAuthError> {
    match raw.get(field).and_then(scalar_to_string) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(OAuthError::missing_field(field)),
    }
}

/// Scalar field defaulting to an empty string when absent or null.
pub fn optional_string(raw: &RawUser, field: &str) -> String {
    raw.get(field).and_then(scalar_to_string).unwrap_or_default()
}

/// Boolean flag defaulting to false. Providers send these as JSON booleans,
/// 0/1 integers or "true"/"1" strings.
pub fn flag(raw: &RawUser, field: &str) -> bool {
    match raw.get(field) {
        Some(Value::Bool(value)) => *value,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(value)) => matches!(value.as_str(), "true" | "1"),
        _ => false,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(value) => Some(value.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}
