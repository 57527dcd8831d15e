//! Permission tables on API reference pages.
//!
//! ```text
//! |Permission type|Permissions (from least to most privileged)|
//! |:---|:---|
//! |Delegated (work or school account)|User.Read, User.ReadWrite|
//! |Delegated (personal Microsoft account)|Not supported.|
//! |Application|User.Read.All|
//! ```

use super::advisor::{PermissionAdvisor, PermissionQuery};
use super::catalog::PermissionCatalog;
use async_trait::async_trait;
use docsnip_core::{Result, Scope, ScopeType, SnippetError};
use std::sync::Arc;
use tracing::debug;

const DELEGATED_WORK_LABEL: &str = "delegated (work or school account)";
const DELEGATED_PERSONAL_LABEL: &str = "delegated (personal microsoft account)";
const APPLICATION_LABEL: &str = "application";
const NOT_SUPPORTED: &str = "not supported";

/// Permission names listed for each scope type, least privileged first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionTable {
    pub delegated_work: Vec<String>,
    pub delegated_personal: Vec<String>,
    pub application: Vec<String>,
}

impl PermissionTable {
    /// Parses the first permission table on a page.
    pub fn parse(page_text: &str) -> Result<Self> {
        let mut table = PermissionTable::default();
        let mut found = false;

        for line in page_text.lines() {
            let line = line.trim();
            if !line.starts_with('|') {
                if found {
                    break;
                }
                continue;
            }

            let cells: Vec<&str> = line.trim_matches('|').split('|').map(str::trim).collect();
            let Some((label, values)) = cells.split_first() else {
                continue;
            };
            let target = match label.to_lowercase().as_str() {
                DELEGATED_WORK_LABEL => &mut table.delegated_work,
                DELEGATED_PERSONAL_LABEL => &mut table.delegated_personal,
                APPLICATION_LABEL => &mut table.application,
                _ => continue,
            };
            found = true;

            for name in values.iter().flat_map(|cell| cell.split(',')).map(str::trim) {
                if is_permission_name(name) && !target.iter().any(|n| n == name) {
                    target.push(name.to_string());
                }
            }
        }

        if !found {
            return Err(SnippetError::format("page has no permission table"));
        }
        Ok(table)
    }

    pub fn names(&self, scope_type: ScopeType) -> &[String] {
        match scope_type {
            ScopeType::DelegatedWork => &self.delegated_work,
            ScopeType::DelegatedPersonal => &self.delegated_personal,
            ScopeType::Application => &self.application,
        }
    }
}

fn is_permission_name(cell: &str) -> bool {
    let normalized = cell.trim_end_matches('.').to_lowercase();
    !normalized.is_empty() && normalized != NOT_SUPPORTED && !normalized.starts_with(':')
}

/// Answers permission queries from the table on the snippet's own page.
pub struct DocTablePermissionAdvisor {
    catalog: Arc<PermissionCatalog>,
}

impl DocTablePermissionAdvisor {
    pub fn new(catalog: Arc<PermissionCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl PermissionAdvisor for DocTablePermissionAdvisor {
    async fn scopes(&self, query: &PermissionQuery, scope_type: ScopeType) -> Result<Vec<Scope>> {
        let page = query.page.as_ref().ok_or_else(|| {
            SnippetError::format(format!(
                "no documentation page for {} {}",
                query.method, query.url
            ))
        })?;
        let text = tokio::fs::read_to_string(page).await?;
        let table = PermissionTable::parse(&text)?;

        let scopes: Vec<Scope> = table
            .names(scope_type)
            .iter()
            .map(|name| self.catalog.resolve(name, scope_type))
            .collect();
        debug!(page = %page.display(), scope_type = %scope_type, count = scopes.len(), "permissions from page table");
        Ok(scopes)
    }
}
