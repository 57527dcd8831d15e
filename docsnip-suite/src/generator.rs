//! Builds the test cases for one API version, language variant and run mode.

use crate::corpus::{DanglingReference, DocCorpus, UNKNOWN_OWNER, doc_link};
use crate::known_issues::{KnownIssue, KnownIssueRegistry};
use docsnip_core::{
    ApiVersion, LanguageVariant, Result, RunMode, Snippet, TestIdentity, TestKind,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One snippet under test. Created once and never changed.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    pub identity: TestIdentity,
    pub test_name: String,
    pub owner: String,
    pub is_known_compile_issue: bool,
    pub is_known_execution_issue: bool,
    pub known_issue: Option<KnownIssue>,
    /// Documentation page that includes the snippet, when one does.
    pub page: Option<PathBuf>,
    pub snippet: Snippet,
}

impl TestCase {
    pub fn version(&self) -> ApiVersion {
        self.identity.version
    }

    pub fn language(&self) -> LanguageVariant {
        self.identity.language
    }

    pub fn kind(&self) -> TestKind {
        self.identity.kind
    }

    pub fn file_name(&self) -> &str {
        &self.snippet.file_name
    }

    pub fn known_issue_message(&self) -> Option<String> {
        self.known_issue.as_ref().map(KnownIssue::describe)
    }
}

/// Output of one generation pass.
#[derive(Debug, Clone, Default)]
pub struct GeneratedSuite {
    /// Selected cases, ordered by test name.
    pub cases: Vec<TestCase>,
    /// Registry keys for this version, language and kind with no snippet file.
    pub stale_known_issues: Vec<TestIdentity>,
    pub dangling_references: Vec<DanglingReference>,
}

pub struct TestCaseGenerator {
    corpus: DocCorpus,
    known_issues: Arc<KnownIssueRegistry>,
}

impl TestCaseGenerator {
    pub fn new(corpus: DocCorpus, known_issues: Arc<KnownIssueRegistry>) -> Self {
        Self { corpus, known_issues }
    }

    /// Selects the cases of one run.
    ///
    /// A case is a known issue when its compile identity is registered, or, in an
    /// execution run, when either its compile or execution identity is. A stable run
    /// keeps exactly the cases that are not known issues and a known-issues run keeps
    /// exactly the others. Execution runs further require one read-only client call
    /// in the snippet.
    #[instrument(skip(self), fields(version = %version, language = %language))]
    pub fn generate(
        &self,
        version: ApiVersion,
        language: LanguageVariant,
        mode: RunMode,
    ) -> Result<GeneratedSuite> {
        let files = self.corpus.discover_snippets(version, language)?;
        let existing: HashSet<String> = files.iter().map(|f| f.file_name.clone()).collect();
        let pages = self.corpus.index_pages(version, language, &existing)?;

        let mut cases = Vec::new();
        let mut operations = HashSet::new();

        for file in &files {
            let identity = match TestIdentity::from_snippet_file(
                &file.file_name,
                version,
                language,
                mode.kind,
            ) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(file = %file.file_name, error = %e, "skipping snippet file");
                    continue;
                }
            };
            operations.insert(identity.operation.clone());

            let compile_issue = self.known_issues.get(&identity.with_kind(TestKind::Compilation));
            let execution_issue = self.known_issues.get(&identity.with_kind(TestKind::Execution));
            let known = match mode.kind {
                TestKind::Compilation => compile_issue.is_some(),
                TestKind::Execution => compile_issue.is_some() || execution_issue.is_some(),
            };
            if known != mode.is_known_issues_run() {
                continue;
            }

            let text = match std::fs::read_to_string(&file.path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %file.file_name, error = %e, "unreadable snippet file, skipping");
                    continue;
                }
            };
            if mode.kind == TestKind::Execution && !language.is_single_read_only_call(&text) {
                debug!(file = %file.file_name, "not a single read-only call, excluded from execution");
                continue;
            }

            let known_issue = match mode.kind {
                TestKind::Compilation => compile_issue.cloned(),
                TestKind::Execution => execution_issue.or(compile_issue).cloned(),
            };
            let page = pages.page_for(&file.file_name);
            let owner = match (&known_issue, page) {
                (Some(issue), _) => issue.category.owner().to_string(),
                (None, Some(page)) => page.owner.clone(),
                (None, None) => UNKNOWN_OWNER.to_string(),
            };

            cases.push(TestCase {
                test_name: identity.to_string(),
                owner,
                is_known_compile_issue: compile_issue.is_some(),
                is_known_execution_issue: execution_issue.is_some(),
                known_issue,
                page: page.map(|p| p.path.clone()),
                snippet: Snippet {
                    text,
                    language,
                    version,
                    file_name: file.file_name.clone(),
                    doc_link: page
                        .map(|p| doc_link(version, &p.name, language))
                        .unwrap_or_default(),
                },
                identity,
            });
        }

        cases.sort_by(|a, b| a.test_name.cmp(&b.test_name));

        let mut stale_known_issues: Vec<TestIdentity> = self
            .known_issues
            .keys_for(version, language, mode.kind)
            .filter(|key| !operations.contains(&key.operation))
            .cloned()
            .collect();
        stale_known_issues.sort();
        for key in &stale_known_issues {
            warn!(test_name = %key, "known issue has no matching snippet file");
        }

        info!(
            cases = cases.len(),
            discovered = files.len(),
            stale = stale_known_issues.len(),
            dangling = pages.dangling.len(),
            "generated test cases"
        );

        Ok(GeneratedSuite { cases, stale_known_issues, dangling_references: pages.dangling })
    }
}
