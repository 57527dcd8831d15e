//! Discovery of snippet files and the documentation pages that include them.
//!
//! Expected corpus layout:
//!
//! ```text
//! api-reference/{v1.0|beta}/api/*.md                                  pages
//! api-reference/{v1.0|beta}/includes/snippets/{language}/*-snippets.md
//! ```

use docsnip_core::{ApiVersion, LanguageVariant, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

const SNIPPET_SUFFIX: &str = "-snippets.md";

/// Owner reported when a page has no `author:` front matter.
pub const UNKNOWN_OWNER: &str = "unknown";

static AUTHOR_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_author_regex() -> &'static Regex {
    AUTHOR_REGEX.get_or_init(|| {
        Regex::new(r#"(?m)^author:\s*"?([^"\r\n]+?)"?\s*$"#).expect("Invalid regex pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetFile {
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPage {
    pub path: PathBuf,
    /// File stem, used in documentation links.
    pub name: String,
    pub owner: String,
}

/// A page that includes a snippet file which does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub page: PathBuf,
    pub snippet_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    by_snippet: HashMap<String, DocPage>,
    pub dangling: Vec<DanglingReference>,
}

impl PageIndex {
    pub fn page_for(&self, snippet_file: &str) -> Option<&DocPage> {
        self.by_snippet.get(snippet_file)
    }
}

#[derive(Debug, Clone)]
pub struct DocCorpus {
    root: PathBuf,
}

impl DocCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snippets_dir(&self, version: ApiVersion, language: LanguageVariant) -> PathBuf {
        self.root
            .join("api-reference")
            .join(version.doc_segment())
            .join("includes")
            .join("snippets")
            .join(language.tag())
    }

    pub fn pages_dir(&self, version: ApiVersion) -> PathBuf {
        self.root.join("api-reference").join(version.doc_segment()).join("api")
    }

    /// Snippet files for one version and language, sorted by file name.
    pub fn discover_snippets(
        &self,
        version: ApiVersion,
        language: LanguageVariant,
    ) -> Result<Vec<SnippetFile>> {
        let dir = self.snippets_dir(version, language);
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "snippet directory not found");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).max_depth(1) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.ends_with(SNIPPET_SUFFIX) {
                files.push(SnippetFile { file_name, path: entry.path().to_path_buf() });
            }
        }
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        debug!(count = files.len(), dir = %dir.display(), "discovered snippet files");
        Ok(files)
    }

    /// Maps snippet file names to the page that includes them.
    ///
    /// References to files not in `existing` are collected as dangling; they are a
    /// corpus defect and are reported, not corrected.
    pub fn index_pages(
        &self,
        version: ApiVersion,
        language: LanguageVariant,
        existing: &HashSet<String>,
    ) -> Result<PageIndex> {
        let dir = self.pages_dir(version);
        let mut index = PageIndex::default();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "documentation page directory not found");
            return Ok(index);
        }

        let include = Regex::new(&format!(
            r"snippets/{}/([A-Za-z0-9._-]+{})",
            regex::escape(language.tag()),
            regex::escape(SNIPPET_SUFFIX)
        ))
        .map_err(|e| docsnip_core::SnippetError::config(e.to_string()))?;

        let mut pages: Vec<PathBuf> = WalkDir::new(&dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        pages.sort();

        for path in pages {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = %path.display(), error = %e, "unreadable page, skipping");
                    continue;
                }
            };
            let referenced: Vec<String> =
                include.captures_iter(&text).map(|c| c[1].to_string()).collect();
            if referenced.is_empty() {
                continue;
            }

            let page = DocPage {
                name: path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default(),
                owner: page_owner(&text),
                path: path.clone(),
            };

            for snippet_file in referenced {
                if !existing.contains(&snippet_file) {
                    index.dangling.push(DanglingReference { page: path.clone(), snippet_file });
                    continue;
                }
                index.by_snippet.entry(snippet_file).or_insert_with(|| page.clone());
            }
        }

        if !index.dangling.is_empty() {
            warn!(count = index.dangling.len(), version = %version, language = %language, "pages reference missing snippet files");
        }
        Ok(index)
    }
}

/// `author:` value from page front matter.
pub fn page_owner(text: &str) -> String {
    get_author_regex()
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string())
}

/// Public documentation link for a page, opened on the language's tab.
pub fn doc_link(version: ApiVersion, page_name: &str, language: LanguageVariant) -> String {
    let view = match version {
        ApiVersion::V1 => "graph-rest-1.0",
        ApiVersion::Beta => "graph-rest-beta",
    };
    format!("https://learn.microsoft.com/graph/api/{}?view={}&tabs={}", page_name, view, language.tag())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_owner() {
        let page = "---\ntitle: \"Get user\"\nauthor: \"yyuank\"\nms.localizationpriority: high\n---\n";
        assert_eq!(page_owner(page), "yyuank");
        assert_eq!(page_owner("# no front matter"), UNKNOWN_OWNER);
    }

    #[test]
    fn test_doc_link() {
        assert_eq!(
            doc_link(ApiVersion::Beta, "user-get", LanguageVariant::CSharp),
            "https://learn.microsoft.com/graph/api/user-get?view=graph-rest-beta&tabs=csharp"
        );
    }

    #[test]
    fn test_corpus_paths() {
        let corpus = DocCorpus::new("/docs");
        assert_eq!(
            corpus.snippets_dir(ApiVersion::V1, LanguageVariant::Go),
            PathBuf::from("/docs/api-reference/v1.0/includes/snippets/go")
        );
        assert_eq!(corpus.pages_dir(ApiVersion::Beta), PathBuf::from("/docs/api-reference/beta/api"));
    }
}
