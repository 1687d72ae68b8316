use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::OAuthError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(200);

/// Deployment environment of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    #[default]
    Test,
}

impl Environment {
    /// Maps an application environment name. Only the exact name
    /// `production` selects [`Environment::Production`].
    pub fn from_app_env(name: &str) -> Self {
        if name == "production" {
            Self::Production
        } else {
            Self::Test
        }
    }
}

impl FromStr for Environment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_app_env(s))
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Test => f.write_str("test"),
        }
    }
}

/// Bounded retry with exponential backoff for the user-info request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
        }
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Option<Vec<String>>,
    pub environment: Environment,
    pub force_dev: bool,
    pub logout_redirect_uri: Option<String>,
    pub authorize_params: Vec<(String, String)>,
    pub token_params: Vec<(String, String)>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("environment", &self.environment)
            .field("force_dev", &self.force_dev)
            .field("logout_redirect_uri", &self.logout_redirect_uri)
            .field("authorize_params", &self.authorize_params)
            .field("token_params", &self.token_params)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: None,
            environment: Environment::default(),
            force_dev: false,
            logout_redirect_uri: None,
            authorize_params: Vec::new(),
            token_params: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_force_dev(mut self, force_dev: bool) -> Self {
        self.force_dev = force_dev;
        self
    }

    pub fn with_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.logout_redirect_uri = Some(uri.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_authorize_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorize_params.push((key.into(), value.into()));
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.push((key.into(), value.into()));
        self
    }

    /// True only when the application runs in production and the provider
    /// has not been forced onto its development endpoints.
    pub fn uses_production(&self) -> bool {
        self.environment == Environment::Production && !self.force_dev
    }
}

/// Provider options as found in application configuration. Unknown keys
/// are rejected.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect: String,
    #[serde(default)]
    pub logout_redirect: Option<String>,
    #[serde(default)]
    pub force_dev: bool,
}

impl ProviderSettings {
    pub fn from_json(json: &str) -> Result<Self, OAuthError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|err| OAuthError::InvalidConfig(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), OAuthError> {
        for (name, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect", &self.redirect),
        ] {
            if value.trim().is_empty() {
                return Err(OAuthError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn into_client_config(self, environment: Environment) -> ClientConfig {
        let mut config = ClientConfig::new(self.client_id, self.client_secret, self.redirect)
            .with_environment(environment)
            .with_force_dev(self.force_dev);
        config.logout_redirect_uri = self.logout_redirect;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: Environment, force_dev: bool) -> ClientConfig {
        ClientConfig::new("id", "secret", "https://app/callback")
            .with_environment(environment)
            .with_force_dev(force_dev)
    }

    #[test]
    fn test_environment_never_uses_production() {
        assert!(!config(Environment::Test, false).uses_production());
        assert!(!config(Environment::Test, true).uses_production());
    }

    #[test]
    fn force_dev_overrides_production() {
        assert!(config(Environment::Production, false).uses_production());
        assert!(!config(Environment::Production, true).uses_production());
    }

    #[test]
    fn environment_matches_exact_name() {
        assert_eq!(Environment::from_app_env("production"), Environment::Production);
        assert_eq!(Environment::from_app_env("Production"), Environment::Test);
        assert_eq!("local".parse::<Environment>().unwrap(), Environment::Test);
    }

    #[test]
    fn settings_reject_unknown_keys() {
        let result = ProviderSettings::from_json(
            r#"{"client_id":"a","client_secret":"b","redirect":"c","logout_redirect_uri":"d"}"#,
        );
        assert!(matches!(result, Err(OAuthError::InvalidConfig(_))));
    }

    #[test]
    fn settings_reject_empty_client_id() {
        let result = ProviderSettings::from_json(
            r#"{"client_id":" ","client_secret":"b","redirect":"c"}"#,
        );
        assert!(matches!(result, Err(OAuthError::InvalidConfig(_))));
    }

    #[test]
    fn settings_convert_into_client_config() {
        let settings = ProviderSettings::from_json(
            r#"{"client_id":"a","client_secret":"b","redirect":"https://app/cb","logout_redirect":"https://app/done","force_dev":true}"#,
        )
        .unwrap();
        let config = settings.into_client_config(Environment::Production);
        assert_eq!(config.client_id, "a");
        assert_eq!(config.redirect_uri, "https://app/cb");
        assert_eq!(config.logout_redirect_uri.as_deref(), Some("https://app/done"));
        assert!(config.force_dev);
        assert!(!config.uses_production());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn debug_output_redacts_client_secret() {
        let output = format!("{:?}", config(Environment::Test, false));
        assert!(output.contains("client_id: \"id\""));
        assert!(output.contains("<redacted>"));
        assert!(!output.contains("\"secret\""));
    }

    #[test]
    fn retry_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }
}
