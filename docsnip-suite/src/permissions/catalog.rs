//! Permission descriptions: the full list of delegated and application scopes with
//! their identities and admin-consent flags.

use crate::config::DataSource;
use docsnip_core::{Result, Scope, ScopeType};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    #[serde(default)]
    delegated_scopes_list: Vec<Scope>,
    #[serde(default)]
    application_scopes_list: Vec<Scope>,
}

/// Scope lookup by permission name. Names compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    delegated: Vec<Scope>,
    application: Vec<Scope>,
    delegated_index: HashMap<String, usize>,
    application_index: HashMap<String, usize>,
}

impl PermissionCatalog {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(json)?;
        Ok(Self::from_scopes(doc.delegated_scopes_list, doc.application_scopes_list))
    }

    pub fn from_scopes(delegated: Vec<Scope>, application: Vec<Scope>) -> Self {
        let index = |scopes: &[Scope]| {
            scopes
                .iter()
                .enumerate()
                .map(|(i, s)| (s.value.to_lowercase(), i))
                .collect::<HashMap<_, _>>()
        };
        Self {
            delegated_index: index(&delegated),
            application_index: index(&application),
            delegated,
            application,
        }
    }

    /// Fetches the document once from a local file or URL.
    pub async fn load(source: &DataSource, client: &reqwest::Client) -> Result<Self> {
        let catalog = Self::from_json_str(&source.fetch(client).await?)?;
        info!(
            delegated = catalog.delegated.len(),
            application = catalog.application.len(),
            "loaded permission catalog"
        );
        Ok(catalog)
    }

    pub fn get(&self, name: &str, scope_type: ScopeType) -> Option<&Scope> {
        let key = name.to_lowercase();
        match scope_type {
            ScopeType::DelegatedWork | ScopeType::DelegatedPersonal => {
                self.delegated_index.get(&key).map(|&i| &self.delegated[i])
            }
            ScopeType::Application => self.application_index.get(&key).map(|&i| &self.application[i]),
        }
    }

    /// The catalog entry for `name`, or a bare scope when the catalog has none.
    pub fn resolve(&self, name: &str, scope_type: ScopeType) -> Scope {
        self.get(name, scope_type).cloned().unwrap_or_else(|| Scope::new(name))
    }

    pub fn delegated_scopes(&self) -> &[Scope] {
        &self.delegated
    }

    pub fn application_scopes(&self) -> &[Scope] {
        &self.application
    }
}
