//! # docsnip-template
//!
//! Turns one documentation snippet file into a compilable program.
//!
//! - [`extract_code_block`] pulls the single fenced block for a language variant
//! - [`normalize_code`] fixes line endings, indentation and blank lines
//! - [`Scaffold`] embeds the code into a per-language host program
//! - [`ExecutionShape`] rewrites executable snippets to return their request
//!
//! ```rust
//! use docsnip_core::{LanguageVariant, TestKind};
//! use docsnip_template::generate_program;
//!
//! let doc = "```csharp\nvar result = await graphClient.Me.GetAsync();\n```\n";
//! let program =
//!     generate_program(doc, LanguageVariant::CSharp, TestKind::Compilation, |s| Ok(s.to_string()))
//!         .unwrap();
//! assert!(program.source.contains("var result = await graphClient.Me.GetAsync();"));
//! ```

pub mod execution;
pub mod extract;
pub mod scaffold;

pub use execution::{ExecutionShape, RewrittenSnippet};
pub use extract::{extract_code_block, indent_lines, normalize_code, numbered_listing};
pub use scaffold::{
    ACCESS_TOKEN_ENV_VAR, JAVASCRIPT_REQUEST_RECORDER, MODE_ENV_VAR, Scaffold, ScaffoldedSnippet,
    generate_program, support_files,
};
