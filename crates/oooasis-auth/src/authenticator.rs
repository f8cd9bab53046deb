use oooasis_core::AuthError;

use crate::consent::UserConsent;
use crate::google::GoogleOAuth;
use crate::storage::{CredentialStore, TokenSet};

/// Produces a usable access token, in order of preference from the cache,
/// from a silent refresh, or from a fresh interactive sign-in.
pub struct Authenticator<S, C> {
    oauth: GoogleOAuth,
    store: S,
    consent: C,
}

impl<S: CredentialStore, C: UserConsent> Authenticator<S, C> {
    pub fn new(oauth: GoogleOAuth, store: S, consent: C) -> Self {
        Self {
            oauth,
            store,
            consent,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn consent(&self) -> &C {
        &self.consent
    }

    /// Return a token valid for `scopes`. Any new or refreshed token is
    /// persisted before it is returned.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn credential(&self, scopes: &[&str]) -> Result<TokenSet, AuthError> {
        if let Some(cached) = self.store.read()? {
            if !cached.covers(scopes) {
                tracing::info!("Cached token lacks requested scopes, re-authorizing");
            } else if !cached.needs_refresh() {
                tracing::debug!("Using cached access token");
                return Ok(cached);
            } else if cached.refresh_token.is_some() {
                match self.refresh(scopes).await {
                    Ok(token_set) => return Ok(token_set),
                    Err(e) => tracing::warn!("{}; falling back to interactive sign-in", e),
                }
            } else {
                tracing::info!("Cached token expired without a refresh token");
            }
        }

        self.authorize(scopes).await
    }

    async fn refresh(&self, scopes: &[&str]) -> Result<TokenSet, AuthError> {
        let _lock = self.store.lock()?;

        // Another invocation may have refreshed while we waited for the lock.
        let Some(current) = self.store.read()?.filter(|t| t.covers(scopes)) else {
            return Err(AuthError::RefreshFailed(
                "Token cache changed during refresh".to_string(),
            ));
        };
        if !current.needs_refresh() {
            tracing::debug!("Token was refreshed concurrently");
            return Ok(current);
        }

        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::RefreshFailed("No refresh token".to_string()))?;

        let mut refreshed = self.oauth.refresh(refresh_token).await?;
        if refreshed.scopes.is_empty() {
            refreshed.scopes = current.scopes.clone();
        }
        self.store.write(&refreshed)?;

        tracing::info!("Refreshed access token");
        Ok(refreshed)
    }

    async fn authorize(&self, scopes: &[&str]) -> Result<TokenSet, AuthError> {
        let redirect_uri = self.consent.redirect_uri()?;
        let request = self.oauth.authorization_request(scopes, &redirect_uri)?;
        let code = self
            .consent
            .obtain_code(request.url(), request.state())
            .await?;

        let mut token_set = self.oauth.exchange_code(code, request).await?;
        if token_set.scopes.is_empty() {
            token_set.scopes = scopes.iter().map(|s| s.to_string()).collect();
        }
        self.store.write(&token_set)?;

        tracing::info!("Authorization complete");
        Ok(token_set)
    }
}
