//! Credentials for live execution.
//!
//! Tokens are acquired once, sequentially, before any test runs and then only read.

use crate::config::AuthConfig;
use async_trait::async_trait;
use docsnip_core::{Credential, Result, Scope, SnippetError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, warn};

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A user token carrying a single delegated scope.
    async fn delegated(&self, scope: &Scope) -> Result<Credential>;

    /// The application-permission token.
    async fn application(&self) -> Result<Credential>;
}

/// OAuth2 token endpoint client.
///
/// Delegated tokens use the resource owner password grant for the configured test
/// account; the application token uses the client credentials grant.
pub struct TokenEndpointProvider {
    client: reqwest::Client,
    auth: AuthConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TokenEndpointProvider {
    pub fn new(auth: AuthConfig) -> Self {
        Self::with_client(reqwest::Client::new(), auth)
    }

    pub fn with_client(client: reqwest::Client, auth: AuthConfig) -> Self {
        Self { client, auth }
    }

    async fn request_token(&self, params: &[(&str, String)]) -> Result<Credential> {
        let response = self
            .client
            .post(&self.auth.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| SnippetError::http(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SnippetError::http(format!("token request failed: {} - {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SnippetError::http(format!("invalid token response: {}", e)))?;
        Ok(Credential::bearer(token.access_token))
    }

    fn resource_scope(&self, scope: &str) -> String {
        format!("{}/{}", self.auth.resource.trim_end_matches('/'), scope)
    }
}

#[async_trait]
impl CredentialProvider for TokenEndpointProvider {
    async fn delegated(&self, scope: &Scope) -> Result<Credential> {
        self.request_token(&[
            ("grant_type", "password".to_string()),
            ("client_id", self.auth.client_id.clone()),
            ("client_secret", self.auth.client_secret.clone()),
            ("username", self.auth.username.clone()),
            ("password", self.auth.password.clone()),
            ("scope", self.resource_scope(&scope.value)),
        ])
        .await
    }

    async fn application(&self) -> Result<Credential> {
        self.request_token(&[
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.auth.client_id.clone()),
            ("client_secret", self.auth.client_secret.clone()),
            ("scope", self.resource_scope(".default")),
        ])
        .await
    }
}

/// Credentials keyed by delegated scope name, plus the application credential.
#[derive(Debug, Clone, Default)]
pub struct CredentialCache {
    delegated: HashMap<String, Credential>,
    application: Option<Credential>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delegated(mut self, scope: impl Into<String>, credential: Credential) -> Self {
        self.delegated.insert(scope.into(), credential);
        self
    }

    pub fn with_application(mut self, credential: Credential) -> Self {
        self.application = Some(credential);
        self
    }

    /// Acquires one token per scope, in order, then the application token.
    ///
    /// A scope whose token cannot be acquired is left out; executions needing it
    /// record a failed attempt.
    pub async fn populate(provider: &dyn CredentialProvider, scopes: &[Scope]) -> Self {
        let mut cache = Self::new();
        for scope in scopes {
            if cache.delegated.contains_key(&scope.value) {
                continue;
            }
            match provider.delegated(scope).await {
                Ok(credential) => {
                    cache.delegated.insert(scope.value.clone(), credential);
                }
                Err(e) => warn!(scope = %scope.value, error = %e, "delegated token unavailable"),
            }
        }
        match provider.application().await {
            Ok(credential) => cache.application = Some(credential),
            Err(e) => warn!(error = %e, "application token unavailable"),
        }

        info!(
            delegated = cache.delegated.len(),
            application = cache.application.is_some(),
            "credential cache populated"
        );
        cache
    }

    pub fn delegated(&self, scope: &Scope) -> Option<&Credential> {
        self.delegated.get(&scope.value)
    }

    pub fn application(&self) -> Option<&Credential> {
        self.application.as_ref()
    }

    pub fn len(&self) -> usize {
        self.delegated.len() + usize::from(self.application.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
