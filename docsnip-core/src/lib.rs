//! # docsnip-core
//!
//! Core types for validating API documentation snippets: domain types, the
//! hierarchical identifier resolver and the compiler backend trait.
//!
//! ## Identifier resolution
//!
//! ```rust
//! use docsnip_core::IdentifierTree;
//!
//! let tree = IdentifierTree::from_json_str(
//!     r#"{"team": {"_value": "team1", "channel": {"_value": "c1"}}}"#,
//! )
//! .unwrap();
//! let url = tree.resolve("/teams/{team-id}/channels/{channel-id}").unwrap();
//! assert_eq!(url, "/teams/team1/channels/c1");
//! ```

pub mod backend;
pub mod error;
pub mod identifiers;
pub mod types;

pub use backend::{
    CompileOutcome, CompiledArtifact, CompilerBackend, Credential, Diagnostic, RequestInfo,
    RunOutput, Severity,
};
pub use error::{Result, SnippetError};
pub use identifiers::{IdentifierNode, IdentifierTree, VALUE_KEY, unresolved_sentinel};
pub use types::{
    ApiVersion, ExecutionResult, LanguageVariant, RunMode, Scope, ScopeType, Selection, Snippet,
    TestIdentity, TestKind,
};
