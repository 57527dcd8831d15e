//! Shared domain types: versions, language variants, run modes and test identities.

use crate::error::{Result, SnippetError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// API version channel a snippet is documented for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApiVersion {
    V1,
    Beta,
}

impl ApiVersion {
    pub const ALL: [ApiVersion; 2] = [ApiVersion::V1, ApiVersion::Beta];

    /// Directory segment used by the documentation corpus (`v1.0` or `beta`).
    pub fn doc_segment(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1.0",
            ApiVersion::Beta => "beta",
        }
    }

    /// Name used inside test names.
    pub fn label(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "V1",
            ApiVersion::Beta => "Beta",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApiVersion {
    type Err = SnippetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "v1" | "v1.0" => Ok(ApiVersion::V1),
            "beta" => Ok(ApiVersion::Beta),
            other => Err(SnippetError::config(format!("unknown API version '{}'", other))),
        }
    }
}

/// SDK language variant of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageVariant {
    CSharp,
    Java,
    JavaScript,
    PowerShell,
    Go,
}

impl LanguageVariant {
    pub const ALL: [LanguageVariant; 5] = [
        LanguageVariant::CSharp,
        LanguageVariant::Java,
        LanguageVariant::JavaScript,
        LanguageVariant::PowerShell,
        LanguageVariant::Go,
    ];

    /// Tag used in snippet directories, file names and fenced block info strings.
    pub fn tag(&self) -> &'static str {
        match self {
            LanguageVariant::CSharp => "csharp",
            LanguageVariant::Java => "java",
            LanguageVariant::JavaScript => "javascript",
            LanguageVariant::PowerShell => "powershell",
            LanguageVariant::Go => "go",
        }
    }

    /// Marker of a read-only (retrieval) call in snippet bodies.
    pub fn read_only_marker(&self) -> &'static str {
        match self {
            LanguageVariant::CSharp => ".GetAsync(",
            LanguageVariant::Java => ".get()",
            LanguageVariant::JavaScript => ".get()",
            LanguageVariant::PowerShell => "Get-Mg",
            LanguageVariant::Go => ".Get(context.Background()",
        }
    }

    /// Markers of calls that mutate service state.
    pub fn write_markers(&self) -> &'static [&'static str] {
        match self {
            LanguageVariant::CSharp => &[".PostAsync(", ".PatchAsync(", ".PutAsync(", ".DeleteAsync("],
            LanguageVariant::Java | LanguageVariant::JavaScript => {
                &[".post(", ".patch(", ".put(", ".delete(", ".del("]
            }
            LanguageVariant::PowerShell => &["New-Mg", "Update-Mg", "Set-Mg", "Remove-Mg", "Invoke-Mg"],
            LanguageVariant::Go => &[".Post(", ".Patch(", ".Put(", ".Delete("],
        }
    }

    /// Whether `code` makes exactly one read-only call and no write call.
    pub fn is_single_read_only_call(&self, code: &str) -> bool {
        code.matches(self.read_only_marker()).count() == 1
            && !self.write_markers().iter().any(|m| code.contains(m))
    }
}

impl fmt::Display for LanguageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LanguageVariant {
    type Err = SnippetError;

    fn from_str(s: &str) -> Result<Self> {
        LanguageVariant::ALL
            .into_iter()
            .find(|l| l.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| SnippetError::config(format!("unknown language variant '{}'", s)))
    }
}

/// Whether a test only compiles the snippet or also executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Compilation,
    Execution,
}

impl TestKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            TestKind::Compilation => "compiles",
            TestKind::Execution => "executes",
        }
    }
}

/// Which side of the known-issue registry a run selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Stable,
    KnownIssues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunMode {
    pub kind: TestKind,
    pub selection: Selection,
}

impl RunMode {
    pub fn new(kind: TestKind, selection: Selection) -> Self {
        Self { kind, selection }
    }

    pub fn compile_stable() -> Self {
        Self::new(TestKind::Compilation, Selection::Stable)
    }

    pub fn compile_known_issues() -> Self {
        Self::new(TestKind::Compilation, Selection::KnownIssues)
    }

    pub fn execute_stable() -> Self {
        Self::new(TestKind::Execution, Selection::Stable)
    }

    pub fn execute_known_issues() -> Self {
        Self::new(TestKind::Execution, Selection::KnownIssues)
    }

    pub fn is_known_issues_run(&self) -> bool {
        self.selection == Selection::KnownIssues
    }
}

/// Structured key of a test case.
///
/// The string form `{operation}-{language}-{version}-{suffix}` (for example
/// `get-user-csharp-V1-compiles`) is what appears in reports and in the
/// known-issue data files; lookups always go through this tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TestIdentity {
    pub version: ApiVersion,
    pub language: LanguageVariant,
    pub operation: String,
    pub kind: TestKind,
}

impl TestIdentity {
    pub fn new(
        version: ApiVersion,
        language: LanguageVariant,
        operation: impl Into<String>,
        kind: TestKind,
    ) -> Self {
        Self { version, language, operation: operation.into(), kind }
    }

    /// Builds the identity from a snippet file name such as `get-user-csharp-snippets.md`.
    pub fn from_snippet_file(
        file_name: &str,
        version: ApiVersion,
        language: LanguageVariant,
        kind: TestKind,
    ) -> Result<Self> {
        let suffix = format!("-{}-snippets.md", language.tag());
        let operation = file_name.strip_suffix(&suffix).filter(|op| !op.is_empty()).ok_or_else(
            || SnippetError::format(format!("'{}' is not a {} snippet file", file_name, language)),
        )?;
        Ok(Self::new(version, language, operation, kind))
    }

    pub fn with_kind(&self, kind: TestKind) -> Self {
        Self { kind, ..self.clone() }
    }

    /// The identity without version and suffix, e.g. `get-user-csharp`.
    pub fn prefix(&self) -> String {
        format!("{}-{}", self.operation, self.language.tag())
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.prefix(), self.version.label(), self.kind.suffix())
    }
}

impl FromStr for TestIdentity {
    type Err = SnippetError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SnippetError::format(format!("'{}' is not a valid test name", s));

        let (rest, kind) = [TestKind::Compilation, TestKind::Execution]
            .into_iter()
            .find_map(|k| s.strip_suffix(&format!("-{}", k.suffix())).map(|r| (r, k)))
            .ok_or_else(invalid)?;
        let (rest, version) = ApiVersion::ALL
            .into_iter()
            .find_map(|v| rest.strip_suffix(&format!("-{}", v.label())).map(|r| (r, v)))
            .ok_or_else(invalid)?;
        let (operation, language) = LanguageVariant::ALL
            .into_iter()
            .find_map(|l| rest.strip_suffix(&format!("-{}", l.tag())).map(|r| (r, l)))
            .ok_or_else(invalid)?;
        if operation.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(version, language, operation, kind))
    }
}

impl TryFrom<String> for TestIdentity {
    type Error = SnippetError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TestIdentity> for String {
    fn from(value: TestIdentity) -> Self {
        value.to_string()
    }
}

/// A fenced code excerpt taken from one documentation snippet file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
    pub language: LanguageVariant,
    pub version: ApiVersion,
    pub file_name: String,
    pub doc_link: String,
}

/// Permission classification queried from the advisory service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeType {
    DelegatedWork,
    DelegatedPersonal,
    Application,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::DelegatedWork => "DelegatedWork",
            ScopeType::DelegatedPersonal => "DelegatedPersonal",
            ScopeType::Application => "Application",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named permission plus its tenant-specific identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub value: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub id: Uuid,
}

impl Scope {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into(), is_admin: false, id: Uuid::nil() }
    }
}

/// Final outcome of executing one snippet against the live service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub diagnostics: String,
    pub exception_message: Option<String>,
    pub scope_used: Option<Scope>,
    /// Set when the application-permission credential produced this result.
    pub application_permission: bool,
}
