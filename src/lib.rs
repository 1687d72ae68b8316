//! OAuth 2.0 / OpenID Connect authorization code client for NcConnect.
//!
//! The flow itself lives in a provider-agnostic [`OAuthClient`]; the
//! identity provider only contributes endpoints, scopes and the mapping
//! from its user-info document to a [`UserProfile`]. Sessions and HTTP are
//! supplied by the host through [`SessionStore`] and [`HttpTransport`].

mod client;
mod config;
mod error;
mod profile;
mod providers;
mod random;
mod session;
#[cfg(test)]
mod test_support;
mod transport;
mod types;

pub use client::OAuthClient;
pub use config::{ClientConfig, Environment, ProviderSettings, RetryPolicy};
pub use error::OAuthError;
pub use profile::{RawUser, UserProfile, flag, optional_string, required_string};
pub use providers::{
    ClientAuthMethod, NcConnectProvider, OAuthProvider, PRODUCTION_BASE_URL, TEST_BASE_URL,
};
pub use random::{generate_nonce, generate_state};
pub use session::{LOGOUT_TOKEN_ID_KEY, MemorySession, STATE_KEY, SessionStore};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{AuthorizationRequest, AuthorizationResponse, TokenResponse};
