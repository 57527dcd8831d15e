//! Configuration for snippet validation runs.
//!
//! Configuration is read from a TOML file, then overridden by `DOCSNIP_*`
//! environment variables (a `.env` file is honoured), then validated so a run fails
//! fast with a descriptive error instead of halfway through a suite.
//!
//! ```toml
//! docs_root = "../microsoft-graph-docs"
//!
//! [identifiers]
//! kind = "local"
//! path = "identifiers.json"
//!
//! [execution]
//! concurrency = 8
//! attempt_timeout_secs = 120
//! ```

use docsnip_core::{Result, SnippetError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default permission advisory endpoint.
pub const DEFAULT_ADVISOR_URL: &str = "https://graphexplorerapi.azurewebsites.net/permissions";

/// Upper bound on parallel test cases.
pub const MAX_CONCURRENCY: usize = 256;

/// Upper bound on automatic retries of the transient build condition.
pub const MAX_TRANSIENT_RETRIES: u32 = 3;

/// Validation error with context and suggestions.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Description of the error
    pub message: String,
    /// Suggested fix or valid values
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), suggestion: None }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for SnippetError {
    fn from(err: ValidationError) -> Self {
        SnippetError::Config(err.to_string())
    }
}

/// Where a JSON document is read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    /// A file on local storage.
    Local { path: PathBuf },
    /// A blob or web URL fetched once per run.
    Remote { url: String },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Local { path: PathBuf::from("identifiers.json") }
    }
}

impl DataSource {
    /// Reads the whole document.
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<String> {
        match self {
            DataSource::Local { path } => Ok(tokio::fs::read_to_string(path).await?),
            DataSource::Remote { url } => {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| SnippetError::http(format!("fetching {}: {}", url, e)))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SnippetError::http(format!("fetching {} returned {}", url, status)));
                }
                response.text().await.map_err(|e| SnippetError::http(e.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionConfig {
    /// Permission advisory service endpoint.
    #[serde(default = "default_advisor_url")]
    pub advisor_url: String,
    /// Permission-descriptions document used for scope identities.
    #[serde(default)]
    pub catalog: Option<DataSource>,
    /// Answer permission queries from documentation tables instead of the service.
    #[serde(default)]
    pub use_doc_tables: bool,
}

fn default_advisor_url() -> String {
    DEFAULT_ADVISOR_URL.to_string()
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self { advisor_url: default_advisor_url(), catalog: None, use_doc_tables: false }
    }
}

/// OAuth2 token endpoint settings. Secrets are only read from the environment.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing)]
    pub client_secret: String,
    /// Account used for delegated tokens.
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Resource prefix for scopes, e.g. `https://graph.microsoft.com`.
    #[serde(default = "default_resource")]
    pub resource: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redacted(secret: &str) -> &'static str {
            if secret.is_empty() { "" } else { "<redacted>" }
        }
        f.debug_struct("AuthConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("resource", &self.resource)
            .finish()
    }
}

fn default_resource() -> String {
    "https://graph.microsoft.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Limit for one compile or execute attempt.
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
    /// Limit for the one-time environment preparation.
    #[serde(default = "default_environment_timeout")]
    pub environment_timeout_secs: u64,
    /// Limit for the whole suite; unset means unlimited.
    #[serde(default)]
    pub suite_timeout_secs: Option<u64>,
    #[serde(default = "default_retry_delay")]
    pub transient_retry_delay_secs: u64,
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
}

fn default_concurrency() -> usize {
    4
}

fn default_attempt_timeout() -> u64 {
    120
}

fn default_environment_timeout() -> u64 {
    600
}

fn default_retry_delay() -> u64 {
    10
}

fn default_max_transient_retries() -> u32 {
    1
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            attempt_timeout_secs: default_attempt_timeout(),
            environment_timeout_secs: default_environment_timeout(),
            suite_timeout_secs: None,
            transient_retry_delay_secs: default_retry_delay(),
            max_transient_retries: default_max_transient_retries(),
        }
    }
}

impl ExecutionConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn environment_timeout(&self) -> Duration {
        Duration::from_secs(self.environment_timeout_secs)
    }

    pub fn suite_timeout(&self) -> Option<Duration> {
        self.suite_timeout_secs.map(Duration::from_secs)
    }

    pub fn transient_retry_delay(&self) -> Duration {
        Duration::from_secs(self.transient_retry_delay_secs)
    }
}

/// Complete configuration of a validation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Root of the documentation corpus checkout.
    pub docs_root: PathBuf,
    /// Known-issue data replacing the built-in registry.
    #[serde(default)]
    pub known_issues_path: Option<PathBuf>,
    #[serde(default)]
    pub identifiers: DataSource,
    #[serde(default)]
    pub permissions: PermissionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl SuiteConfig {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
            known_issues_path: None,
            identifiers: DataSource::default(),
            permissions: PermissionConfig::default(),
            auth: AuthConfig { resource: default_resource(), ..Default::default() },
            execution: ExecutionConfig::default(),
        }
    }

    pub fn with_identifiers(mut self, source: DataSource) -> Self {
        self.identifiers = source;
        self
    }

    pub fn with_known_issues(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_issues_path = Some(path.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.execution.concurrency = concurrency;
        self
    }

    pub fn with_attempt_timeout(mut self, secs: u64) -> Self {
        self.execution.attempt_timeout_secs = secs;
        self
    }

    /// Parse TOML text, apply environment overrides and validate.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: SuiteConfig = toml::from_str(text)
            .map_err(|e| SnippetError::config(format!("invalid configuration: {}", e)))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Build configuration from environment variables alone.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let docs_root = env::var("DOCSNIP_DOCS_ROOT").map_err(|_| {
            ValidationError::new("DOCSNIP_DOCS_ROOT", "is not set")
                .with_suggestion("Point it at a documentation corpus checkout")
        })?;
        let mut config = SuiteConfig::new(docs_root);
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("DOCSNIP_DOCS_ROOT") {
            self.docs_root = PathBuf::from(v);
        }
        if let Ok(v) = env::var("DOCSNIP_KNOWN_ISSUES") {
            self.known_issues_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("DOCSNIP_IDENTIFIERS_URL") {
            self.identifiers = DataSource::Remote { url: v };
        } else if let Ok(v) = env::var("DOCSNIP_IDENTIFIERS_PATH") {
            self.identifiers = DataSource::Local { path: PathBuf::from(v) };
        }
        if let Ok(v) = env::var("DOCSNIP_ADVISOR_URL") {
            self.permissions.advisor_url = v;
        }
        if let Ok(v) = env::var("DOCSNIP_TOKEN_ENDPOINT") {
            self.auth.token_endpoint = v;
        }
        if let Ok(v) = env::var("DOCSNIP_CLIENT_ID") {
            self.auth.client_id = v;
        }
        if let Ok(v) = env::var("DOCSNIP_CLIENT_SECRET") {
            self.auth.client_secret = v;
        }
        if let Ok(v) = env::var("DOCSNIP_USERNAME") {
            self.auth.username = v;
        }
        if let Ok(v) = env::var("DOCSNIP_PASSWORD") {
            self.auth.password = v;
        }
        if let Some(n) = env::var("DOCSNIP_CONCURRENCY").ok().and_then(|v| v.parse().ok()) {
            self.execution.concurrency = n;
        }
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.docs_root.as_os_str().is_empty() {
            return Err(ValidationError::new("docs_root", "must not be empty"));
        }

        let execution = &self.execution;
        if execution.concurrency == 0 || execution.concurrency > MAX_CONCURRENCY {
            return Err(ValidationError::new(
                "execution.concurrency",
                format!("{} is out of range", execution.concurrency),
            )
            .with_suggestion(format!("Use a value between 1 and {}", MAX_CONCURRENCY)));
        }
        if execution.attempt_timeout_secs == 0 {
            return Err(ValidationError::new("execution.attempt_timeout_secs", "must be positive"));
        }
        if execution.environment_timeout_secs == 0 {
            return Err(ValidationError::new(
                "execution.environment_timeout_secs",
                "must be positive",
            ));
        }
        if execution.suite_timeout_secs == Some(0) {
            return Err(ValidationError::new("execution.suite_timeout_secs", "must be positive")
                .with_suggestion("Remove the field for an unlimited suite"));
        }
        if execution.max_transient_retries > MAX_TRANSIENT_RETRIES {
            return Err(ValidationError::new(
                "execution.max_transient_retries",
                format!("{} exceeds {}", execution.max_transient_retries, MAX_TRANSIENT_RETRIES),
            ));
        }

        if !is_http_url(&self.permissions.advisor_url) {
            return Err(ValidationError::new("permissions.advisor_url", "must be an http(s) URL"));
        }
        for (field, source) in [
            ("identifiers", Some(&self.identifiers)),
            ("permissions.catalog", self.permissions.catalog.as_ref()),
        ] {
            if let Some(DataSource::Remote { url }) = source {
                if !is_http_url(url) {
                    return Err(ValidationError::new(field, "remote source must be an http(s) URL"));
                }
            }
        }
        if !self.auth.token_endpoint.is_empty() && !is_http_url(&self.auth.token_endpoint) {
            return Err(ValidationError::new("auth.token_endpoint", "must be an http(s) URL"));
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = SuiteConfig::new("/docs");
        config.auth.client_id = "client-123".to_string();
        config.auth.client_secret = "s3cr3t-value".to_string();
        config.auth.password = "hunter2-pw".to_string();

        let printed = format!("{:?}", config);
        assert!(printed.contains("client-123"));
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("s3cr3t-value"));
        assert!(!printed.contains("hunter2-pw"));
    }

    #[test]
    fn test_defaults_validate() {
        let config = SuiteConfig::new("/docs");
        assert!(config.validate().is_ok());
        assert_eq!(config.execution.max_transient_retries, 1);
        assert_eq!(config.permissions.advisor_url, DEFAULT_ADVISOR_URL);
    }

    #[test]
    fn test_parse_toml() {
        let config: SuiteConfig = toml::from_str(
            r#"
            docs_root = "/docs"

            [identifiers]
            kind = "remote"
            url = "https://example.blob.core.windows.net/ids/identifiers.json"

            [execution]
            concurrency = 8
            suite_timeout_secs = 3600
            "#,
        )
        .unwrap();
        assert_eq!(config.execution.concurrency, 8);
        assert_eq!(config.execution.attempt_timeout_secs, 120);
        assert_eq!(config.execution.suite_timeout(), Some(Duration::from_secs(3600)));
        assert!(matches!(config.identifiers, DataSource::Remote { .. }));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let err = SuiteConfig::new("/docs").with_concurrency(0).validate().unwrap_err();
        assert_eq!(err.field, "execution.concurrency");
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_remote_source_must_be_http() {
        let config = SuiteConfig::new("/docs")
            .with_identifiers(DataSource::Remote { url: "ftp://ids".to_string() });
        assert_eq!(config.validate().unwrap_err().field, "identifiers");
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("field", "is wrong").with_suggestion("Fix it");
        assert_eq!(err.to_string(), "field: is wrong. Fix it");
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = SuiteConfig::new("/docs");
        config.auth.password = "hunter2".to_string();
        let text = toml::to_string(&config).unwrap();
        assert!(!text.contains("hunter2"));
    }
}
