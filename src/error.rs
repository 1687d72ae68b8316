use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header value for {name}")]
    InvalidHeader { name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("state mismatch (expected={expected}, received={received})")]
    InvalidState { expected: String, received: String },

    #[error("token exchange failed{}: {message}", status_suffix(.status))]
    ExchangeFailed {
        status: Option<u16>,
        message: String,
        body: String,
    },

    #[error("user info request failed{}: {message}", status_suffix(.status))]
    UserInfoFailed {
        status: Option<u16>,
        message: String,
        body: String,
    },

    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("authorization denied: {error}")]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("missing authorization code in callback url")]
    MissingAuthorizationCode,
}

impl OAuthError {
    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
        }
    }

    /// Transport failures and server-side statuses (5xx, 429) on the
    /// user-info endpoint. Token endpoint failures are never retryable since
    /// authorization codes are single-use.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UserInfoFailed { status: None, .. } => true,
            Self::UserInfoFailed {
                status: Some(status),
                ..
            } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" (http status {status})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::OAuthError;

    fn user_info_failure(status: Option<u16>) -> OAuthError {
        OAuthError::UserInfoFailed {
            status,
            message: "boom".to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn user_info_server_errors_are_retryable() {
        assert!(user_info_failure(None).is_retryable());
        assert!(user_info_failure(Some(503)).is_retryable());
        assert!(user_info_failure(Some(429)).is_retryable());
        assert!(!user_info_failure(Some(401)).is_retryable());
    }

    #[test]
    fn exchange_failures_are_never_retryable() {
        let error = OAuthError::ExchangeFailed {
            status: Some(503),
            message: "unavailable".to_string(),
            body: String::new(),
        };
        assert!(!error.is_retryable());
    }

    #[test]
    fn invalid_header_is_local_and_hides_value() {
        let error = OAuthError::InvalidHeader {
            name: "authorization".to_string(),
        };
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "invalid header value for authorization");
    }

    #[test]
    fn display_includes_status_when_known() {
        assert_eq!(
            user_info_failure(Some(502)).to_string(),
            "user info request failed (http status 502): boom"
        );
        assert_eq!(
            user_info_failure(None).to_string(),
            "user info request failed: boom"
        );
    }
}
