//! # docsnip-suite
//!
//! Generates and runs test suites over API documentation snippets.
//!
//! ## Features
//!
//! - **Generation**: one test case per snippet file, split into stable and
//!   known-issue runs by the known-issue registry
//! - **Compilation**: snippets embedded in per-language scaffolds and built by a
//!   [`CompilerBackend`](docsnip_core::CompilerBackend)
//! - **Execution**: snippets run against the live service, trying delegated scopes
//!   from least privileged upward before the application credential
//! - **Reporting**: per-case outcomes with summary text and JSON export
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docsnip_core::{ApiVersion, LanguageVariant, RunMode};
//! use docsnip_suite::{DocCorpus, SuiteConfig, SuiteContext, SuiteRunner, TestCaseGenerator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SuiteConfig::load("docsnip.toml")?;
//!     let context = Arc::new(SuiteContext::from_config(config.clone()).await?);
//!
//!     let generator =
//!         TestCaseGenerator::new(DocCorpus::new(&config.docs_root), context.known_issues().clone());
//!     let suite = generator.generate(ApiVersion::V1, LanguageVariant::CSharp, RunMode::compile_stable())?;
//!
//!     let runner = SuiteRunner::new(context, Arc::new(my_csharp_backend()));
//!     let report = runner.run_all(&suite.cases).await?;
//!     println!("{}", report.format_summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod coordinator;
pub mod corpus;
pub mod credentials;
pub mod generator;
pub mod known_issues;
pub mod permissions;
pub mod process;
pub mod report;
pub mod runner;

// Re-exports
pub use config::{
    AuthConfig, DataSource, ExecutionConfig, PermissionConfig, SuiteConfig, ValidationError,
};
pub use context::SuiteContext;
pub use coordinator::{AttemptOutcome, ExecutionCoordinator, PermissionPlan};
pub use corpus::{DanglingReference, DocCorpus, DocPage, PageIndex, SnippetFile};
pub use credentials::{CredentialCache, CredentialProvider, TokenEndpointProvider};
pub use generator::{GeneratedSuite, TestCase, TestCaseGenerator};
pub use known_issues::{KnownIssue, KnownIssueCategory, KnownIssueRegistry};
pub use permissions::{
    DocTablePermissionAdvisor, HttpPermissionAdvisor, PermissionAdvisor, PermissionCatalog,
    PermissionQuery, PermissionTable,
};
pub use process::{CommandBackend, CommandSpec};
pub use report::{CaseOutcome, SuiteReport, SuiteSummary};
pub use runner::SuiteRunner;
