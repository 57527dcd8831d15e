//! Per-language compile and execute backends.
//!
//! The pipeline never inspects generated code at runtime. Each language variant
//! provides a [`CompilerBackend`] that turns scaffolded source into a
//! [`CompiledArtifact`] and can run that artifact in dry mode (describe the request)
//! or live mode (send it with a credential).

use crate::error::Result;
use crate::types::LanguageVariant;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One compiler message, positioned in the scaffolded source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub column: usize,
    pub code: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, line, column, code: None, message: message.into() }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Moves the position from scaffold coordinates to snippet coordinates.
    ///
    /// `first_line` is the 1-based scaffold line holding the first snippet line and
    /// `indent` the width of the host indentation in front of every snippet line.
    /// Diagnostics outside the snippet keep their scaffold position. A column of 0
    /// means the tool reported none and stays 0.
    pub fn remapped(&self, first_line: usize, snippet_lines: usize, indent: usize) -> Self {
        let mut mapped = self.clone();
        if self.line >= first_line && self.line < first_line + snippet_lines {
            mapped.line = self.line - first_line + 1;
            if self.column > 0 {
                mapped.column = self.column.saturating_sub(indent).max(1);
            }
        }
        mapped
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.code {
            Some(code) => write!(
                f,
                "({},{}): {} {}: {}",
                self.line, self.column, severity, code, self.message
            ),
            None => write!(f, "({},{}): {}: {}", self.line, self.column, severity, self.message),
        }
    }
}

/// Compile output. Either an artifact or the diagnostics that prevented one.
#[derive(Debug)]
pub enum CompileOutcome {
    Compiled(CompiledArtifact),
    Failed(Vec<Diagnostic>),
}

/// A runnable build of one scaffolded snippet.
///
/// `keep_alive` holds whatever resource must outlive the artifact (for example a
/// temporary project directory).
#[derive(Clone)]
pub struct CompiledArtifact {
    pub language: LanguageVariant,
    pub location: PathBuf,
    keep_alive: Option<Arc<dyn Any + Send + Sync>>,
}

impl CompiledArtifact {
    pub fn new(language: LanguageVariant, location: impl Into<PathBuf>) -> Self {
        Self { language, location: location.into(), keep_alive: None }
    }

    pub fn with_keep_alive(mut self, resource: Arc<dyn Any + Send + Sync>) -> Self {
        self.keep_alive = Some(resource);
        self
    }
}

impl fmt::Debug for CompiledArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledArtifact")
            .field("language", &self.language)
            .field("location", &self.location)
            .finish()
    }
}

/// The request a snippet would send, obtained without a network call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
}

/// Bearer credential handed to a live execution.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into() }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("access_token", &"<redacted>").finish()
    }
}

/// Outcome of one live run of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub success: bool,
    pub output: String,
}

#[async_trait]
pub trait CompilerBackend: Send + Sync {
    fn language(&self) -> LanguageVariant;

    /// One-time, serialized preparation before any test runs (dependency staging).
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn compile(&self, source: &str) -> Result<CompileOutcome>;

    /// Runs the artifact in dry mode and reports the request it would send.
    async fn inspect(&self, artifact: &CompiledArtifact) -> Result<RequestInfo>;

    async fn execute(&self, artifact: &CompiledArtifact, credential: &Credential)
    -> Result<RunOutput>;

    /// Whether diagnostics describe the transient "runtime still starting" condition
    /// of a freshly spawned build process, which is worth one more attempt.
    fn is_transient(&self, _diagnostics: &[Diagnostic]) -> bool {
        false
    }
}
