//! Permission advisory: which scopes can call a given request.

use async_trait::async_trait;
use docsnip_core::{RequestInfo, Result, Scope, ScopeType, SnippetError};
use std::path::PathBuf;
use tracing::debug;

/// The request a snippet sends, plus the page it is documented on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionQuery {
    pub method: String,
    pub url: String,
    pub page: Option<PathBuf>,
}

impl PermissionQuery {
    pub fn new(request: &RequestInfo, page: Option<PathBuf>) -> Self {
        Self { method: request.method.clone(), url: request.url.clone(), page }
    }

    /// Path of the request below the API version segment, without query string.
    ///
    /// `https://graph.microsoft.com/v1.0/me/events?$top=5` becomes `/me/events`.
    pub fn request_path(&self) -> String {
        let without_query = self.url.split(['?', '#']).next().unwrap_or_default();
        let without_scheme = without_query
            .split_once("://")
            .map(|(_, rest)| rest.split_once('/').map_or("", |(_, path)| path))
            .unwrap_or_else(|| without_query.trim_start_matches('/'));

        let path = match without_scheme.split_once('/') {
            Some((first, rest)) if is_version_segment(first) => rest,
            _ if is_version_segment(without_scheme) => "",
            _ => without_scheme,
        };
        format!("/{}", path)
    }
}

fn is_version_segment(segment: &str) -> bool {
    segment.eq_ignore_ascii_case("v1.0") || segment.eq_ignore_ascii_case("beta")
}

#[async_trait]
pub trait PermissionAdvisor: Send + Sync {
    /// Scopes of one type that allow the request, in preference order.
    async fn scopes(&self, query: &PermissionQuery, scope_type: ScopeType) -> Result<Vec<Scope>>;
}

/// Client for the permission advisory web service.
pub struct HttpPermissionAdvisor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPermissionAdvisor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl PermissionAdvisor for HttpPermissionAdvisor {
    async fn scopes(&self, query: &PermissionQuery, scope_type: ScopeType) -> Result<Vec<Scope>> {
        let request_path = query.request_path();
        debug!(method = %query.method, path = %request_path, scope_type = %scope_type, "querying permission advisor");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("requesturl", request_path.as_str()),
                ("method", query.method.as_str()),
                ("scopeType", scope_type.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SnippetError::http(format!("permission advisor request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SnippetError::http(format!(
                "permission advisor returned {}: {}",
                status, body
            )));
        }

        response
            .json::<Vec<Scope>>()
            .await
            .map_err(|e| SnippetError::http(format!("invalid permission advisor response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: &str) -> PermissionQuery {
        PermissionQuery { method: "GET".to_string(), url: url.to_string(), page: None }
    }

    #[test]
    fn test_request_path() {
        assert_eq!(query("https://graph.microsoft.com/v1.0/me/events?$top=5").request_path(), "/me/events");
        assert_eq!(query("https://graph.microsoft.com/beta/teams/t1").request_path(), "/teams/t1");
        assert_eq!(query("/users/u1").request_path(), "/users/u1");
        assert_eq!(query("https://graph.microsoft.com/v1.0").request_path(), "/");
    }
}
