use base64::{Engine as _, engine::general_purpose::STANDARD};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, info, warn};
use url::{Url, form_urlencoded};

use crate::profile::RawUser;
use crate::random::{generate_nonce, generate_state};
use crate::session::{LOGOUT_TOKEN_ID_KEY, STATE_KEY, SessionStore};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::{
    AuthorizationRequest, AuthorizationResponse, ClientAuthMethod, ClientConfig, OAuthError,
    OAuthProvider, TokenResponse, UserProfile,
};

const RESERVED_AUTHORIZE_PARAMS: &[&str] = &[
    "client_id",
    "redirect_uri",
    "scope",
    "response_type",
    "state",
    "nonce",
];

#[derive(Debug, Clone)]
pub struct OAuthClient<P: OAuthProvider, T: HttpTransport = ReqwestTransport> {
    provider: P,
    config: ClientConfig,
    transport: T,
}

impl<P: OAuthProvider> OAuthClient<P> {
    pub fn new(provider: P, config: ClientConfig) -> Result<Self, OAuthError> {
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self {
            provider,
            config,
            transport,
        })
    }
}

impl<P: OAuthProvider, T: HttpTransport> OAuthClient<P, T> {
    pub fn with_transport(provider: P, config: ClientConfig, transport: T) -> Self {
        Self {
            provider,
            config,
            transport,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_url(&self) -> &str {
        self.provider.base_url(self.config.uses_production())
    }

    // Paths are appended verbatim, so a base URL ending in `/` yields `//`.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn scope(&self) -> String {
        let separator = self.provider.scope_separator();
        match &self.config.scopes {
            Some(scopes) => scopes.join(separator),
            None => self.provider.default_scopes().join(separator),
        }
    }

    /// Starts a login attempt with a freshly generated state.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest, OAuthError> {
        self.authorization_url(generate_state()?)
    }

    /// Builds the redirect to the provider for a caller-supplied state.
    pub fn authorization_url(
        &self,
        state: impl Into<String>,
    ) -> Result<AuthorizationRequest, OAuthError> {
        let state = state.into();
        let nonce = if self.provider.uses_nonce() {
            Some(generate_nonce()?)
        } else {
            None
        };
        let scope = self.scope();

        let mut url = Url::parse(&self.endpoint(self.provider.authorize_path()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_id", &self.config.client_id);
            pairs.append_pair("redirect_uri", &self.config.redirect_uri);
            pairs.append_pair("scope", &scope);
            pairs.append_pair("response_type", "code");
            pairs.append_pair("state", &state);
            for (key, value) in self.provider.authorize_params() {
                pairs.append_pair(&key, &value);
            }
            if let Some(nonce) = &nonce {
                pairs.append_pair("nonce", nonce);
            }
            for (key, value) in &self.config.authorize_params {
                if RESERVED_AUTHORIZE_PARAMS.contains(&key.as_str()) {
                    warn!(param = %key, "ignoring reserved authorization parameter override");
                    continue;
                }
                pairs.append_pair(key, value);
            }
        }

        debug!(provider = self.provider.id(), "built authorization url");

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            nonce,
            scope,
        })
    }

    /// Generates a state, stores it in the session and returns the redirect.
    pub fn begin_login<S>(&self, session: &S) -> Result<AuthorizationRequest, OAuthError>
    where
        S: SessionStore + ?Sized,
    {
        let request = self.authorization_request()?;
        session.put(STATE_KEY, request.state.clone());
        Ok(request)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
        ];
        self.send_token_request(form).await
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, OAuthError> {
        let form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];
        self.send_token_request(form).await
    }

    // Never retried: authorization codes are single-use.
    async fn send_token_request(
        &self,
        mut form: Vec<(String, String)>,
    ) -> Result<TokenResponse, OAuthError> {
        form.push(("client_id".to_string(), self.config.client_id.clone()));
        if self.provider.client_auth_method() == ClientAuthMethod::Post {
            form.push((
                "client_secret".to_string(),
                self.config.client_secret.clone(),
            ));
        }
        form.extend(self.provider.token_params());
        form.extend(self.config.token_params.iter().cloned());

        let mut request = HttpRequest::post_form(self.endpoint(self.provider.token_path()), form)
            .with_header("Accept", "application/json");
        if self.provider.client_auth_method() == ClientAuthMethod::Basic {
            request = request.with_header("Authorization", self.basic_credentials());
        }

        let response =
            self.transport
                .send(request)
                .await
                .map_err(exchange_transport_error)?;

        if !response.is_success() {
            warn!(
                provider = self.provider.id(),
                status = response.status,
                "token endpoint rejected the request"
            );
            return Err(OAuthError::ExchangeFailed {
                status: Some(response.status),
                message: "token endpoint returned an error status".to_string(),
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|err| OAuthError::ExchangeFailed {
            status: Some(response.status),
            message: err.to_string(),
            body: response.body,
        })
    }

    fn basic_credentials(&self) -> String {
        let credentials = format!("{}:{}", self.config.client_id, self.config.client_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// Fetches the raw user-info document, retrying transient failures
    /// according to the configured [`RetryPolicy`](crate::RetryPolicy).
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<RawUser, OAuthError> {
        let policy = self.config.retry;
        let mut attempt = 0;
        loop {
            match self.request_user_info(access_token).await {
                Ok(user) => return Ok(user),
                Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.backoff(attempt);
                    attempt += 1;
                    warn!(
                        provider = self.provider.id(),
                        attempt,
                        ?delay,
                        error = %err,
                        "retrying user info request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_user_info(&self, access_token: &str) -> Result<RawUser, OAuthError> {
        let request = HttpRequest::get(self.endpoint(self.provider.userinfo_path()))
            .with_header("Authorization", format!("Bearer {access_token}"))
            .with_header("Accept", "application/json");

        let response =
            self.transport
                .send(request)
                .await
                .map_err(user_info_transport_error)?;

        if !response.is_success() {
            return Err(OAuthError::UserInfoFailed {
                status: Some(response.status),
                message: "user info endpoint returned an error status".to_string(),
                body: response.body,
            });
        }

        match serde_json::from_str(&response.body) {
            Ok(serde_json::Value::Object(user)) => Ok(user),
            Ok(_) => Err(OAuthError::UserInfoFailed {
                status: Some(response.status),
                message: "user info response is not a JSON object".to_string(),
                body: response.body,
            }),
            Err(err) => Err(OAuthError::UserInfoFailed {
                status: Some(response.status),
                message: err.to_string(),
                body: response.body,
            }),
        }
    }

    fn user_info_deadline_exceeded(&self) -> OAuthError {
        warn!(
            provider = self.provider.id(),
            timeout = ?self.config.timeout,
            "user info lookup timed out"
        );
        OAuthError::UserInfoFailed {
            status: None,
            message: format!("timed out after {:?}", self.config.timeout),
            body: String::new(),
        }
    }

    fn map_user(&self, raw: RawUser) -> Result<UserProfile, OAuthError> {
        self.provider.map_user_profile(raw).inspect_err(|err| {
            error!(
                provider = self.provider.id(),
                error = %err,
                "user info payload does not match the provider contract"
            );
        })
    }

    /// Maps the user behind an access token obtained elsewhere. Retries
    /// included, the lookup is bounded by the configured timeout.
    pub async fn user_from_token(&self, access_token: &str) -> Result<UserProfile, OAuthError> {
        let deadline = Instant::now() + self.config.timeout;
        let raw = match timeout_at(deadline, self.fetch_user_info(access_token)).await {
            Ok(result) => result?,
            Err(_) => return Err(self.user_info_deadline_exceeded()),
        };
        let mut profile = self.map_user(raw)?;
        profile.token = access_token.to_string();
        Ok(profile)
    }

    /// Completes a login: verifies `state` against `expected_state` before
    /// any network traffic, exchanges the code, then maps the user. Both
    /// calls share one deadline of [`ClientConfig::timeout`].
    pub async fn authenticate(
        &self,
        code: &str,
        state: &str,
        expected_state: &str,
    ) -> Result<UserProfile, OAuthError> {
        if expected_state.is_empty() || state != expected_state {
            warn!(provider = self.provider.id(), "rejecting callback with invalid state");
            return Err(OAuthError::InvalidState {
                expected: expected_state.to_string(),
                received: state.to_string(),
            });
        }

        let deadline = Instant::now() + self.config.timeout;
        let token = match timeout_at(deadline, self.exchange_code(code)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(OAuthError::ExchangeFailed {
                    status: None,
                    message: format!("timed out after {:?}", self.config.timeout),
                    body: String::new(),
                });
            }
        };
        let raw = match timeout_at(deadline, self.fetch_user_info(&token.access_token)).await {
            Ok(result) => result?,
            Err(_) => return Err(self.user_info_deadline_exceeded()),
        };
        let mut profile = self.map_user(raw)?;

        let TokenResponse {
            access_token,
            id_token,
            refresh_token,
            expires_in,
            ..
        } = token;
        profile.token_id = id_token;
        profile.token = access_token;
        profile.refresh_token = refresh_token;
        profile.expires_in = expires_in;

        info!(provider = self.provider.id(), user = %profile.id, "user authenticated");
        Ok(profile)
    }

    /// Session-driven variant of [`authenticate`](Self::authenticate). The
    /// stored state is consumed whatever the outcome, and the id token is
    /// kept for [`logout_url_from_session`](Self::logout_url_from_session).
    pub async fn complete_login<S>(
        &self,
        session: &S,
        response: &AuthorizationResponse,
    ) -> Result<UserProfile, OAuthError>
    where
        S: SessionStore + ?Sized,
    {
        let expected_state = session.pull(STATE_KEY).unwrap_or_default();
        let state = response.state.as_deref().unwrap_or_default();
        let profile = self
            .authenticate(&response.code, state, &expected_state)
            .await?;

        if let Some(token_id) = &profile.token_id {
            session.put(LOGOUT_TOKEN_ID_KEY, token_id.clone());
        }
        Ok(profile)
    }

    pub fn logout_url(&self, stored_token_id: &str) -> Result<String, OAuthError> {
        let redirect = self
            .config
            .logout_redirect_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| OAuthError::missing_field("logout_redirect"))?;
        if stored_token_id.is_empty() {
            return Err(OAuthError::missing_field("id_token_hint"));
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("post_logout_redirect_uri", redirect)
            .append_pair("id_token_hint", stored_token_id)
            .finish();

        Ok(format!(
            "{}?{}",
            self.endpoint(self.provider.logout_path()),
            query
        ))
    }

    pub fn logout_url_from_session<S>(&self, session: &S) -> Result<String, OAuthError>
    where
        S: SessionStore + ?Sized,
    {
        let token_id = session.get(LOGOUT_TOKEN_ID_KEY).unwrap_or_default();
        self.logout_url(&token_id)
    }
}

// Failures raised while building a request never reached the provider
// and are surfaced unchanged.
fn exchange_transport_error(err: OAuthError) -> OAuthError {
    match err {
        OAuthError::InvalidHeader { .. } => err,
        err => OAuthError::ExchangeFailed {
            status: None,
            message: err.to_string(),
            body: String::new(),
        },
    }
}

fn user_info_transport_error(err: OAuthError) -> OAuthError {
    match err {
        OAuthError::InvalidHeader { .. } => err,
        err => OAuthError::UserInfoFailed {
            status: None,
            message: err.to_string(),
            body: String::new(),
        },
    }
}
