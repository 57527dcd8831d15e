//! Registry of snippets that are expected to fail.
//!
//! Each entry is keyed by the exact test identity. A stable run excludes these
//! cases; a known-issues run selects only them, so regressions and tracked failures
//! are reported separately.

use docsnip_core::{ApiVersion, LanguageVariant, Result, SnippetError, TestIdentity, TestKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

const BUILTIN_KNOWN_ISSUES: &str = include_str!("../data/known_issues.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownIssueCategory {
    #[serde(rename = "SDK")]
    Sdk,
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "HTTP Camel Case")]
    HttpCamelCase,
    Metadata,
    #[serde(rename = "Snippet Generation")]
    SnippetGeneration,
    Permissions,
    #[serde(rename = "Test Framework")]
    TestFramework,
    #[serde(rename = "Needs Analysis")]
    NeedsAnalysis,
}

impl KnownIssueCategory {
    pub fn label(&self) -> &'static str {
        match self {
            KnownIssueCategory::Sdk => "SDK",
            KnownIssueCategory::Http => "HTTP",
            KnownIssueCategory::HttpCamelCase => "HTTP Camel Case",
            KnownIssueCategory::Metadata => "Metadata",
            KnownIssueCategory::SnippetGeneration => "Snippet Generation",
            KnownIssueCategory::Permissions => "Permissions",
            KnownIssueCategory::TestFramework => "Test Framework",
            KnownIssueCategory::NeedsAnalysis => "Needs Analysis",
        }
    }

    /// Team that owns fixing issues of this category.
    pub fn owner(&self) -> &'static str {
        match self {
            KnownIssueCategory::Sdk => "SDK",
            KnownIssueCategory::Http | KnownIssueCategory::HttpCamelCase => "Docs",
            KnownIssueCategory::Metadata => "Workload",
            KnownIssueCategory::SnippetGeneration | KnownIssueCategory::Permissions => "DevX",
            KnownIssueCategory::TestFramework => "Test Framework",
            KnownIssueCategory::NeedsAnalysis => "Triage",
        }
    }
}

impl fmt::Display for KnownIssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownIssue {
    pub category: KnownIssueCategory,
    pub message: String,
    pub reference_link: Option<String>,
    /// Test name without version and kind, shared by related entries.
    pub test_name_prefix: String,
}

impl KnownIssue {
    /// Message shown for a case that failed as expected.
    pub fn describe(&self) -> String {
        match &self.reference_link {
            Some(link) => format!("{} known issue: {} ({})", self.category, self.message, link),
            None => format!("{} known issue: {}", self.category, self.message),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnownIssueRecord {
    test_name: TestIdentity,
    category: KnownIssueCategory,
    message: String,
    #[serde(default)]
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KnownIssueFile {
    issues: Vec<KnownIssueRecord>,
}

/// Read-only mapping from test identity to known issue.
#[derive(Debug, Clone, Default)]
pub struct KnownIssueRegistry {
    entries: HashMap<TestIdentity, KnownIssue>,
}

impl KnownIssueRegistry {
    /// The registry shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_KNOWN_ISSUES)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: KnownIssueFile = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(file.issues.len());

        for record in file.issues {
            let issue = KnownIssue {
                category: record.category,
                message: record.message,
                reference_link: record.link,
                test_name_prefix: record.test_name.prefix(),
            };
            if entries.insert(record.test_name.clone(), issue).is_some() {
                return Err(SnippetError::config(format!(
                    "duplicate known issue for '{}'",
                    record.test_name
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (TestIdentity, KnownIssue)>) -> Self {
        Self { entries: entries.into_iter().collect() }
    }

    pub fn get(&self, identity: &TestIdentity) -> Option<&KnownIssue> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &TestIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    /// All keys registered for one version, language and test kind.
    pub fn keys_for(
        &self,
        version: ApiVersion,
        language: LanguageVariant,
        kind: TestKind,
    ) -> impl Iterator<Item = &TestIdentity> {
        self.entries
            .keys()
            .filter(move |k| k.version == version && k.language == language && k.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = KnownIssueRegistry::builtin().unwrap();
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = KnownIssueRegistry::from_json_str(
            r#"{"issues": [{"testName": "get-user-csharp-V1-compiles", "category": "SDK", "message": "Missing method"}]}"#,
        )
        .unwrap();

        let hit: TestIdentity = "get-user-csharp-V1-compiles".parse().unwrap();
        let other_version: TestIdentity = "get-user-csharp-Beta-compiles".parse().unwrap();
        let other_kind = hit.with_kind(TestKind::Execution);

        let issue = registry.get(&hit).unwrap();
        assert_eq!(issue.test_name_prefix, "get-user-csharp");
        assert!(!registry.contains(&other_version));
        assert!(!registry.contains(&other_kind));
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let json = r#"{"issues": [
            {"testName": "get-user-csharp-V1-compiles", "category": "SDK", "message": "a"},
            {"testName": "get-user-csharp-V1-compiles", "category": "HTTP", "message": "b"}
        ]}"#;
        assert!(matches!(KnownIssueRegistry::from_json_str(json), Err(SnippetError::Config(_))));
    }

    #[test]
    fn test_malformed_test_name_rejected() {
        let json = r#"{"issues": [{"testName": "get-user", "category": "SDK", "message": "a"}]}"#;
        assert!(KnownIssueRegistry::from_json_str(json).is_err());
    }

    #[test]
    fn test_describe_includes_category_and_link() {
        let issue = KnownIssue {
            category: KnownIssueCategory::HttpCamelCase,
            message: "Property names should be camel case".to_string(),
            reference_link: Some("https://example.org/issues/1".to_string()),
            test_name_prefix: "get-user-csharp".to_string(),
        };
        assert_eq!(
            issue.describe(),
            "HTTP Camel Case known issue: Property names should be camel case (https://example.org/issues/1)"
        );
        assert_eq!(issue.category.owner(), "Docs");
    }
}
