use crate::backend::Diagnostic;

#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Identifier data not found for placeholder '{placeholder}' in '{text}'")]
    DataNotFound { placeholder: String, text: String },

    #[error("Permission resolution failed for {method} {url}: no delegated or application scopes")]
    PermissionResolution { method: String, url: String },

    #[error("Compilation failed:\n{}\n\n{listing}", format_diagnostics(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic>, listing: String },

    #[error("Execution failed:\n{0}")]
    Execution(String),

    #[error("Environment setup failed for {language}: {message}")]
    EnvironmentSetup { language: String, message: String },

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

impl SnippetError {
    pub fn format(msg: impl Into<String>) -> Self {
        SnippetError::Format(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SnippetError::Config(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        SnippetError::Http(msg.into())
    }

    pub fn environment(language: impl Into<String>, msg: impl Into<String>) -> Self {
        SnippetError::EnvironmentSetup { language: language.into(), message: msg.into() }
    }

    /// Errors that abort the whole run rather than a single test case.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, SnippetError::EnvironmentSetup { .. })
    }
}

pub type Result<T> = std::result::Result<T, SnippetError>;
