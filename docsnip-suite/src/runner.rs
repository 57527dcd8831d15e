//! Drives test cases through compilation and, for execution runs, the live service.

use crate::context::SuiteContext;
use crate::coordinator::ExecutionCoordinator;
use crate::generator::TestCase;
use crate::report::{CaseOutcome, SuiteReport};
use docsnip_core::{
    CompileOutcome, CompiledArtifact, CompilerBackend, Result, SnippetError, TestKind,
};
use docsnip_telemetry::{compile_span, test_case_span};
use docsnip_template::{ScaffoldedSnippet, generate_program};
use futures::{StreamExt, stream};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{Instrument, debug, info, instrument, warn};

pub struct SuiteRunner {
    context: Arc<SuiteContext>,
    backend: Arc<dyn CompilerBackend>,
    prepared: OnceCell<()>,
}

impl SuiteRunner {
    pub fn new(context: Arc<SuiteContext>, backend: Arc<dyn CompilerBackend>) -> Self {
        Self { context, backend, prepared: OnceCell::new() }
    }

    pub fn context(&self) -> &SuiteContext {
        &self.context
    }

    /// Runs the backend's one-time preparation under the environment timeout.
    ///
    /// Later calls return immediately once preparation succeeded. Any failure is
    /// [`SnippetError::EnvironmentSetup`].
    pub async fn prepare_environment(&self) -> Result<()> {
        self.prepared
            .get_or_try_init(|| async {
                let language = self.backend.language();
                let limit = self.context.config().execution.environment_timeout();
                info!(language = %language, "preparing environment");
                match tokio::time::timeout(limit, self.backend.prepare()).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(SnippetError::EnvironmentSetup { language, message })) => {
                        Err(SnippetError::EnvironmentSetup { language, message })
                    }
                    Ok(Err(e)) => Err(SnippetError::environment(language.to_string(), e.to_string())),
                    Err(_) => Err(SnippetError::environment(
                        language.to_string(),
                        format!("timed out after {}s", limit.as_secs()),
                    )),
                }
            })
            .await
            .map(|_| ())
    }

    /// Runs and classifies one case. Never fails the suite.
    ///
    /// A registered known issue that fails passes with its registered message; one
    /// that unexpectedly succeeds passes without comment.
    pub async fn run_one(&self, case: &TestCase) -> CaseOutcome {
        let span = test_case_span(&case.test_name, case.language().tag());
        async {
            let started = Instant::now();
            let result = self.check(case).await;
            let duration = started.elapsed();

            match (result, &case.known_issue) {
                (Ok(()), _) => {
                    debug!("passed");
                    CaseOutcome::passed(&case.test_name, &case.owner, duration)
                }
                (Err(e), Some(issue)) => {
                    debug!(error = %e, "failed as known issue");
                    CaseOutcome::known_issue(&case.test_name, &case.owner, issue.describe(), duration)
                }
                (Err(e), None) => {
                    warn!(error = %e, "failed");
                    let mut message = e.to_string();
                    if !case.snippet.doc_link.is_empty() {
                        message.push_str(&format!("\n\nDocumentation: {}", case.snippet.doc_link));
                    }
                    CaseOutcome::failed(&case.test_name, &case.owner, message, duration)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Runs every case with bounded concurrency, keeping case order in the report.
    ///
    /// Environment preparation failure and suite timeout abort the run.
    #[instrument(skip(self, cases), fields(cases = cases.len()))]
    pub async fn run_all(&self, cases: &[TestCase]) -> Result<SuiteReport> {
        self.prepare_environment().await?;

        let started_at = chrono::Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let execution = &self.context.config().execution;

        let outcomes = stream::iter(cases.iter().map(|case| self.run_one(case)))
            .buffered(execution.concurrency.max(1))
            .collect::<Vec<_>>();

        let results = match execution.suite_timeout() {
            Some(limit) => tokio::time::timeout(limit, outcomes).await.map_err(|_| {
                SnippetError::Timeout { operation: "suite".to_string(), seconds: limit.as_secs() }
            })?,
            None => outcomes.await,
        };

        let report = SuiteReport::new(&run_id, results, started_at);
        info!(
            passed = report.summary.passed,
            failed = report.summary.failed,
            known_issues = report.summary.known_issues,
            "suite complete"
        );
        Ok(report)
    }

    async fn check(&self, case: &TestCase) -> Result<()> {
        let kind = case.kind();
        let tree = match kind {
            TestKind::Execution => Some(self.context.identifiers().await?),
            TestKind::Compilation => None,
        };
        let program = generate_program(&case.snippet.text, case.language(), kind, |code| {
            match tree {
                Some(tree) => tree.resolve(code),
                None => Ok(code.to_string()),
            }
        })?;

        let artifact = self.compile(&program).await?;
        if kind == TestKind::Compilation {
            return Ok(());
        }

        let coordinator = ExecutionCoordinator::new(
            self.backend.as_ref(),
            self.context.advisor(),
            self.context.credentials(),
            self.context.config().execution.attempt_timeout(),
        );
        let result = coordinator.execute(&artifact, case.page.clone()).await?;
        if result.success {
            Ok(())
        } else {
            Err(SnippetError::Execution(result.exception_message.unwrap_or_default()))
        }
    }

    /// Compiles under the attempt timeout, retrying only the transient build failure.
    async fn compile(&self, program: &ScaffoldedSnippet) -> Result<CompiledArtifact> {
        let execution = &self.context.config().execution;
        let limit = execution.attempt_timeout();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let span = compile_span(self.backend.language().tag(), attempt);
            let outcome = tokio::time::timeout(limit, self.backend.compile(&program.source))
                .instrument(span)
                .await
                .map_err(|_| SnippetError::Timeout {
                    operation: format!("{} compile", self.backend.language()),
                    seconds: limit.as_secs(),
                })??;

            let diagnostics = match outcome {
                CompileOutcome::Compiled(artifact) => return Ok(artifact),
                CompileOutcome::Failed(diagnostics) => diagnostics,
            };

            if attempt <= execution.max_transient_retries && self.backend.is_transient(&diagnostics)
            {
                warn!(attempt, "transient build failure, retrying");
                tokio::time::sleep(execution.transient_retry_delay()).await;
                continue;
            }

            return Err(SnippetError::Compilation {
                diagnostics: diagnostics
                    .iter()
                    .map(|d| program.remap(d))
                    .collect(),
                listing: program.listing(),
            });
        }
    }
}
