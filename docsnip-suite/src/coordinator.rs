//! Runs a compiled snippet against the live service with the least privilege that
//! works.

use crate::credentials::CredentialCache;
use crate::permissions::{PermissionAdvisor, PermissionQuery};
use docsnip_core::{
    CompiledArtifact, CompilerBackend, Credential, ExecutionResult, RequestInfo, Result, Scope,
    ScopeType, SnippetError,
};
use docsnip_telemetry::{execution_attempt_span, record_outcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{Instrument, debug, info, warn};

const APPLICATION_LABEL: &str = "application";

/// Result of one execution attempt under one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { output: String },
    Failure { message: String },
}

/// Which credentials the advisor allows for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPlan {
    /// Try these delegated scopes in order, then the application credential.
    Delegated(Vec<Scope>),
    /// Only the application credential applies.
    Application,
}

pub struct ExecutionCoordinator<'a> {
    backend: &'a dyn CompilerBackend,
    advisor: &'a dyn PermissionAdvisor,
    credentials: &'a CredentialCache,
    attempt_timeout: Duration,
}

impl<'a> ExecutionCoordinator<'a> {
    pub fn new(
        backend: &'a dyn CompilerBackend,
        advisor: &'a dyn PermissionAdvisor,
        credentials: &'a CredentialCache,
        attempt_timeout: Duration,
    ) -> Self {
        Self { backend, advisor, credentials, attempt_timeout }
    }

    /// Asks for delegated work scopes first, then application scopes.
    pub async fn plan(&self, query: &PermissionQuery) -> Result<PermissionPlan> {
        match self.advisor.scopes(query, ScopeType::DelegatedWork).await {
            Ok(scopes) if !scopes.is_empty() => return Ok(PermissionPlan::Delegated(scopes)),
            Ok(_) => debug!(url = %query.url, "no delegated scopes advised"),
            Err(e) => warn!(url = %query.url, error = %e, "delegated permission query failed"),
        }

        match self.advisor.scopes(query, ScopeType::Application).await {
            Ok(scopes) if !scopes.is_empty() => Ok(PermissionPlan::Application),
            Ok(_) => Err(permission_failure(query)),
            Err(e) => {
                warn!(url = %query.url, error = %e, "application permission query failed");
                Err(permission_failure(query))
            }
        }
    }

    /// Executes the artifact.
    ///
    /// Each advised delegated scope gets one attempt in order and the first success
    /// wins. When none succeeds, or only application permissions apply, the
    /// application credential gets exactly one attempt and its outcome is final.
    pub async fn execute(
        &self,
        artifact: &CompiledArtifact,
        page: Option<PathBuf>,
    ) -> Result<ExecutionResult> {
        let request = self.backend.inspect(artifact).await?;
        let query = PermissionQuery::new(&request, page);
        let plan = self.plan(&query).await?;

        let mut failures: Vec<(String, String)> = Vec::new();

        if let PermissionPlan::Delegated(scopes) = plan {
            for scope in scopes {
                let credential = self.credentials.delegated(&scope);
                match self.attempt(artifact, &request, &scope.value, credential).await {
                    AttemptOutcome::Success { output } => {
                        info!(scope = %scope.value, url = %request.url, "executed with delegated scope");
                        return Ok(ExecutionResult {
                            success: true,
                            diagnostics: output,
                            exception_message: None,
                            scope_used: Some(scope),
                            application_permission: false,
                        });
                    }
                    AttemptOutcome::Failure { message } => failures.push((scope.value, message)),
                }
            }
        }

        let credential = self.credentials.application();
        let outcome = self.attempt(artifact, &request, APPLICATION_LABEL, credential).await;
        let result = match outcome {
            AttemptOutcome::Success { output } => ExecutionResult {
                success: true,
                diagnostics: output,
                exception_message: None,
                scope_used: None,
                application_permission: true,
            },
            AttemptOutcome::Failure { message } => {
                failures.push((APPLICATION_LABEL.to_string(), message));
                let report = failures
                    .iter()
                    .map(|(label, message)| format!("{}: {}", label, message))
                    .collect::<Vec<_>>()
                    .join("\n");
                ExecutionResult {
                    success: false,
                    diagnostics: String::new(),
                    exception_message: Some(report),
                    scope_used: None,
                    application_permission: true,
                }
            }
        };
        Ok(result)
    }

    async fn attempt(
        &self,
        artifact: &CompiledArtifact,
        request: &RequestInfo,
        label: &str,
        credential: Option<&Credential>,
    ) -> AttemptOutcome {
        let span = execution_attempt_span(label, &request.method, &request.url);
        let Some(credential) = credential else {
            record_outcome(&span, false);
            return AttemptOutcome::Failure { message: "no cached credential".to_string() };
        };

        let run = tokio::time::timeout(self.attempt_timeout, self.backend.execute(artifact, credential))
            .instrument(span.clone())
            .await;
        let outcome = match run {
            Ok(Ok(output)) if output.success => AttemptOutcome::Success { output: output.output },
            Ok(Ok(output)) => AttemptOutcome::Failure { message: output.output },
            Ok(Err(e)) => AttemptOutcome::Failure { message: e.to_string() },
            Err(_) => AttemptOutcome::Failure {
                message: format!("timed out after {}s", self.attempt_timeout.as_secs()),
            },
        };
        record_outcome(&span, matches!(outcome, AttemptOutcome::Success { .. }));
        outcome
    }
}

fn permission_failure(query: &PermissionQuery) -> SnippetError {
    SnippetError::PermissionResolution { method: query.method.clone(), url: query.url.clone() }
}
