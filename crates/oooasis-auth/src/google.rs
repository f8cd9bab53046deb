//! Google OAuth2 client for Calendar access.

use std::borrow::Cow;

use oauth2::basic::{BasicClient, BasicErrorResponse, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse,
    TokenUrl,
};
use oooasis_core::AuthError;

use crate::secrets::ClientSecrets;
use crate::storage::TokenSet;

/// Read/write access to calendars and events.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A pending authorization: the URL to show the user plus the secrets
/// needed to validate and redeem the answer.
pub struct AuthorizationRequest {
    url: url::Url,
    csrf_token: CsrfToken,
    pkce_verifier: PkceCodeVerifier,
    redirect_url: RedirectUrl,
}

impl AuthorizationRequest {
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn state(&self) -> &str {
        self.csrf_token.secret()
    }

    fn into_parts(self) -> (PkceCodeVerifier, RedirectUrl) {
        (self.pkce_verifier, self.redirect_url)
    }
}

pub struct GoogleOAuth {
    client: BasicClient,
}

impl GoogleOAuth {
    pub fn new(secrets: &ClientSecrets) -> Result<Self, AuthError> {
        let invalid = |what: &str, e: url::ParseError| {
            AuthError::ClientSecrets(format!("Invalid {}: {}", what, e))
        };

        let client = BasicClient::new(
            ClientId::new(secrets.client_id.clone()),
            Some(ClientSecret::new(secrets.client_secret.clone())),
            AuthUrl::new(secrets.auth_uri.clone()).map_err(|e| invalid("auth URL", e))?,
            Some(TokenUrl::new(secrets.token_uri.clone()).map_err(|e| invalid("token URL", e))?),
        )
        // Google expects the client credentials in the form body.
        .set_auth_type(AuthType::RequestBody);

        Ok(Self { client })
    }

    /// Build the consent URL sending the user back to `redirect_uri`.
    /// Offline access is requested so the grant includes a refresh token.
    pub fn authorization_request(
        &self,
        scopes: &[&str],
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, AuthError> {
        let redirect_url = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| AuthError::OAuthFailed(format!("Invalid redirect URI: {}", e)))?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_redirect_uri(Cow::Borrowed(&redirect_url));
        for scope in scopes {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (url, csrf_token) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(AuthorizationRequest {
            url,
            csrf_token,
            pkce_verifier,
            redirect_url,
        })
    }

    /// Exchange authorization code for tokens.
    #[tracing::instrument(skip_all, level = "info")]
    pub async fn exchange_code(
        &self,
        code: String,
        request: AuthorizationRequest,
    ) -> Result<TokenSet, AuthError> {
        let (pkce_verifier, redirect_url) = request.into_parts();
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_redirect_uri(Cow::Owned(redirect_url))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::OAuthFailed(describe(&e)))?;

        Ok(token_set(&response, None))
    }

    /// Refresh an expired access token. Google does not always rotate the
    /// refresh token, in which case the old one is kept.
    #[tracing::instrument(skip_all, level = "info")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| AuthError::RefreshFailed(describe(&e)))?;

        Ok(token_set(&response, Some(refresh_token)))
    }
}

fn token_set(response: &BasicTokenResponse, previous_refresh: Option<&str>) -> TokenSet {
    let expires_in = response
        .expires_in()
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

    TokenSet {
        access_token: response.access_token().secret().clone(),
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at: chrono::Utc::now().timestamp() + expires_in,
        scopes: response
            .scopes()
            .map(|s| s.iter().map(|scope| scope.to_string()).collect())
            .unwrap_or_default(),
    }
}

fn describe<RE>(err: &RequestTokenError<RE, BasicErrorResponse>) -> String
where
    RE: std::error::Error + 'static,
{
    match err {
        RequestTokenError::ServerResponse(response) => match response.error_description() {
            Some(description) => format!("{}: {}", response.error(), description),
            None => response.error().to_string(),
        },
        other => other.to_string(),
    }
}
