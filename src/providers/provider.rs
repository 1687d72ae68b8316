use crate::OAuthError;
use crate::profile::{RawUser, UserProfile};

/// How the client authenticates itself at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic base64(client_id:client_secret)`.
    Basic,
    /// `client_secret` sent as a form field.
    Post,
}

/// Static description of an identity provider. The generic
/// [`OAuthClient`](crate::OAuthClient) drives the flow; implementors only
/// supply endpoints, scopes and the user-info field mapping.
pub trait OAuthProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// Base URL for the selected environment. Endpoint paths are appended
    /// verbatim.
    fn base_url(&self, production: bool) -> &str;

    fn default_scopes(&self) -> &'static [&'static str];

    fn map_user_profile(&self, raw: RawUser) -> Result<UserProfile, OAuthError>;

    fn authorize_path(&self) -> &'static str {
        "/authorize"
    }

    fn token_path(&self) -> &'static str {
        "/token"
    }

    fn userinfo_path(&self) -> &'static str {
        "/userinfo"
    }

    fn logout_path(&self) -> &'static str {
        "/logout"
    }

    fn scope_separator(&self) -> &'static str {
        " "
    }

    /// Whether authorization requests carry a fresh `nonce`.
    fn uses_nonce(&self) -> bool {
        false
    }

    fn client_auth_method(&self) -> ClientAuthMethod {
        ClientAuthMethod::Post
    }

    fn authorize_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn token_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}
