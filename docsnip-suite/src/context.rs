//! Run-wide state shared by every worker.

use crate::config::SuiteConfig;
use crate::credentials::{CredentialCache, TokenEndpointProvider};
use crate::known_issues::KnownIssueRegistry;
use crate::permissions::{
    DocTablePermissionAdvisor, HttpPermissionAdvisor, PermissionAdvisor, PermissionCatalog,
};
use docsnip_core::{IdentifierTree, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Immutable after construction, apart from the identifier tree which is loaded on
/// first use. Concurrent first callers wait on the same load.
pub struct SuiteContext {
    config: SuiteConfig,
    http: reqwest::Client,
    identifiers: OnceCell<IdentifierTree>,
    known_issues: Arc<KnownIssueRegistry>,
    catalog: Arc<PermissionCatalog>,
    advisor: Arc<dyn PermissionAdvisor>,
    credentials: CredentialCache,
}

impl SuiteContext {
    pub fn new(
        config: SuiteConfig,
        known_issues: Arc<KnownIssueRegistry>,
        advisor: Arc<dyn PermissionAdvisor>,
        credentials: CredentialCache,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            identifiers: OnceCell::new(),
            known_issues,
            catalog: Arc::new(PermissionCatalog::default()),
            advisor,
            credentials,
        }
    }

    /// Uses an already loaded identifier tree instead of the configured source.
    pub fn with_identifier_tree(mut self, tree: IdentifierTree) -> Self {
        self.identifiers = OnceCell::new_with(Some(tree));
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<PermissionCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Builds everything the configuration describes.
    ///
    /// Loads the known-issue registry and permission catalog, picks the advisor and,
    /// when a token endpoint is configured, acquires every delegated token listed in
    /// the catalog before returning.
    pub async fn from_config(config: SuiteConfig) -> Result<Self> {
        let http = reqwest::Client::new();

        let known_issues = match &config.known_issues_path {
            Some(path) => KnownIssueRegistry::load(path)?,
            None => KnownIssueRegistry::builtin()?,
        };

        let catalog = match &config.permissions.catalog {
            Some(source) => PermissionCatalog::load(source, &http).await?,
            None => PermissionCatalog::default(),
        };
        let catalog = Arc::new(catalog);

        let advisor: Arc<dyn PermissionAdvisor> = if config.permissions.use_doc_tables {
            Arc::new(DocTablePermissionAdvisor::new(catalog.clone()))
        } else {
            Arc::new(HttpPermissionAdvisor::with_client(
                http.clone(),
                config.permissions.advisor_url.clone(),
            ))
        };

        let credentials = if config.auth.token_endpoint.is_empty() {
            CredentialCache::new()
        } else {
            let provider = TokenEndpointProvider::with_client(http.clone(), config.auth.clone());
            CredentialCache::populate(&provider, catalog.delegated_scopes()).await
        };

        info!(
            known_issues = known_issues.len(),
            credentials = credentials.len(),
            doc_tables = config.permissions.use_doc_tables,
            "suite context ready"
        );

        Ok(Self {
            config,
            http,
            identifiers: OnceCell::new(),
            known_issues: Arc::new(known_issues),
            catalog,
            advisor,
            credentials,
        })
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// The identifier tree, loaded from the configured source on first call.
    pub async fn identifiers(&self) -> Result<&IdentifierTree> {
        self.identifiers
            .get_or_try_init(|| async {
                let text = self.config.identifiers.fetch(&self.http).await?;
                let tree = IdentifierTree::from_json_str(&text)?;
                info!("identifier tree loaded");
                Ok::<_, docsnip_core::SnippetError>(tree)
            })
            .await
    }

    pub fn known_issues(&self) -> &Arc<KnownIssueRegistry> {
        &self.known_issues
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn advisor(&self) -> &dyn PermissionAdvisor {
        self.advisor.as_ref()
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }
}
