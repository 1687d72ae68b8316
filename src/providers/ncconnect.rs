use crate::OAuthError;
use crate::profile::{RawUser, UserProfile, flag, optional_string, required_string};
use crate::providers::{ClientAuthMethod, OAuthProvider};

// Provider documentation:
// https://docs.google.com/document/d/13zo1E1eVMFUmbV6ECw2YvTiM-uPBL0DBuWh5wLtzCpA/edit

pub const PRODUCTION_BASE_URL: &str = "https://connect.gouv.nc/v2/";
pub const TEST_BASE_URL: &str = "https://connect-dev.gouv.nc/v2/";

const DEFAULT_SCOPES: &[&str] = &["openid", "identite_pivot", "profile", "email"];

#[derive(Debug, Clone)]
pub struct NcConnectProvider {
    production_base_url: String,
    test_base_url: String,
}

impl Default for NcConnectProvider {
    fn default() -> Self {
        Self {
            production_base_url: PRODUCTION_BASE_URL.to_string(),
            test_base_url: TEST_BASE_URL.to_string(),
        }
    }
}

impl NcConnectProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the provider at other hosts, e.g. a local mirror.
    pub fn with_base_urls(
        mut self,
        production: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        self.production_base_url = production.into();
        self.test_base_url = test.into();
        self
    }
}

impl OAuthProvider for NcConnectProvider {
    fn id(&self) -> &'static str {
        "ncconnect"
    }

    fn base_url(&self, production: bool) -> &str {
        if production {
            &self.production_base_url
        } else {
            &self.test_base_url
        }
    }

    fn default_scopes(&self) -> &'static [&'static str] {
        DEFAULT_SCOPES
    }

    fn uses_nonce(&self) -> bool {
        true
    }

    fn client_auth_method(&self) -> ClientAuthMethod {
        ClientAuthMethod::Basic
    }

    fn map_user_profile(&self, raw: RawUser) -> Result<UserProfile, OAuthError> {
        Ok(UserProfile {
            id: required_string(&raw, "sub")?,
            email: required_string(&raw, "email")?,
            email_verified: flag(&raw, "email_verified"),
            verified: flag(&raw, "verified"),
            preferred_username: optional_string(&raw, "preferred_username"),
            given_name: optional_string(&raw, "given_name"),
            family_name: optional_string(&raw, "family_name"),
            birthdate: optional_string(&raw, "birthdate"),
            gender: optional_string(&raw, "gender"),
            birthplace: optional_string(&raw, "birthplace"),
            birthcountry: optional_string(&raw, "birthcountry"),
            raw,
            ..UserProfile::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn raw(value: Value) -> RawUser {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn selects_base_url_by_environment() {
        let provider = NcConnectProvider::new();
        assert_eq!(provider.base_url(true), "https://connect.gouv.nc/v2/");
        assert_eq!(provider.base_url(false), "https://connect-dev.gouv.nc/v2/");
    }

    #[test]
    fn maps_full_identity_payload() {
        let payload = json!({
            "sub": "u1",
            "email": "e@x.com",
            "email_verified": true,
            "verified": 1,
            "preferred_username": "DUPONT",
            "given_name": "Marie",
            "family_name": "Dupont",
            "birthdate": "1990-04-12",
            "gender": "female",
            "birthplace": "98818",
            "birthcountry": "99100",
            "extra_claim": "kept in raw"
        });
        let profile = NcConnectProvider::new()
            .map_user_profile(raw(payload.clone()))
            .unwrap();

        assert_eq!(profile.id, "u1");
        assert_eq!(profile.email, "e@x.com");
        assert!(profile.email_verified);
        assert!(profile.verified);
        assert_eq!(profile.preferred_username, "DUPONT");
        assert_eq!(profile.given_name, "Marie");
        assert_eq!(profile.family_name, "Dupont");
        assert_eq!(profile.birthdate, "1990-04-12");
        assert_eq!(profile.gender, "female");
        assert_eq!(profile.birthplace, "98818");
        assert_eq!(profile.birthcountry, "99100");
        assert_eq!(Value::Object(profile.raw), payload);
        assert!(profile.token.is_empty());
        assert!(profile.token_id.is_none());
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let profile = NcConnectProvider::new()
            .map_user_profile(raw(json!({"sub": "u1", "email": "e@x.com"})))
            .unwrap();
        assert!(!profile.email_verified);
        assert!(!profile.verified);
        assert_eq!(profile.preferred_username, "");
        assert_eq!(profile.birthcountry, "");
    }

    #[test]
    fn missing_subject_is_fatal() {
        let result = NcConnectProvider::new().map_user_profile(raw(json!({"email": "e@x.com"})));
        assert!(matches!(
            result,
            Err(OAuthError::MissingRequiredField { ref field }) if field == "sub"
        ));
    }

    #[test]
    fn missing_email_is_fatal() {
        let result = NcConnectProvider::new().map_user_profile(raw(json!({"sub": "u1"})));
        assert!(matches!(
            result,
            Err(OAuthError::MissingRequiredField { ref field }) if field == "email"
        ));
    }

    #[test]
    fn mapping_is_deterministic() {
        let provider = NcConnectProvider::new();
        let payload = raw(json!({"sub": "u1", "email": "e@x.com", "gender": "male"}));
        let first = provider.map_user_profile(payload.clone()).unwrap();
        let second = provider.map_user_profile(payload).unwrap();
        assert_eq!(first, second);
    }
}
