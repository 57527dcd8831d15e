use async_trait::async_trait;
use docsnip_core::{
    CompileOutcome, CompiledArtifact, CompilerBackend, Credential, LanguageVariant, RequestInfo,
    Result, RunOutput, Scope, ScopeType, SnippetError,
};
use docsnip_suite::{
    CredentialCache, ExecutionCoordinator, PermissionAdvisor, PermissionPlan, PermissionQuery,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Succeeds for tokens listed in `accepted`, hangs for `slow`, fails otherwise.
struct MockBackend {
    accepted: Vec<&'static str>,
    slow: Vec<&'static str>,
    attempts: Mutex<Vec<String>>,
}

impl MockBackend {
    fn accepting(accepted: &[&'static str]) -> Self {
        Self { accepted: accepted.to_vec(), slow: Vec::new(), attempts: Mutex::new(Vec::new()) }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompilerBackend for MockBackend {
    fn language(&self) -> LanguageVariant {
        LanguageVariant::CSharp
    }

    async fn compile(&self, _source: &str) -> Result<CompileOutcome> {
        Ok(CompileOutcome::Compiled(CompiledArtifact::new(LanguageVariant::CSharp, "/tmp/mock")))
    }

    async fn inspect(&self, _artifact: &CompiledArtifact) -> Result<RequestInfo> {
        Ok(RequestInfo {
            method: "GET".to_string(),
            url: "https://graph.microsoft.com/v1.0/teams/t1/channels/c1".to_string(),
        })
    }

    async fn execute(&self, _artifact: &CompiledArtifact, credential: &Credential) -> Result<RunOutput> {
        let token = credential.access_token.as_str();
        self.attempts.lock().unwrap().push(token.to_string());
        if self.slow.contains(&token) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.accepted.contains(&token) {
            Ok(RunOutput { success: true, output: "200 OK".to_string() })
        } else {
            Ok(RunOutput { success: false, output: format!("403 Forbidden for {}", token) })
        }
    }
}

#[derive(Default)]
struct MockAdvisor {
    answers: HashMap<ScopeType, Result<Vec<Scope>>>,
    queries: Mutex<Vec<ScopeType>>,
}

impl MockAdvisor {
    fn answer(mut self, scope_type: ScopeType, answer: Result<Vec<Scope>>) -> Self {
        self.answers.insert(scope_type, answer);
        self
    }
}

#[async_trait]
impl PermissionAdvisor for MockAdvisor {
    async fn scopes(&self, _query: &PermissionQuery, scope_type: ScopeType) -> Result<Vec<Scope>> {
        self.queries.lock().unwrap().push(scope_type);
        match self.answers.get(&scope_type) {
            Some(Ok(scopes)) => Ok(scopes.clone()),
            Some(Err(e)) => Err(SnippetError::http(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

fn scopes(names: &[&str]) -> Vec<Scope> {
    names.iter().map(|n| Scope::new(*n)).collect()
}

fn credentials() -> CredentialCache {
    CredentialCache::new()
        .with_delegated("ChannelSettings.Read.All", Credential::bearer("tok-a"))
        .with_delegated("Channel.ReadBasic.All", Credential::bearer("tok-b"))
        .with_application(Credential::bearer("tok-app"))
}

fn artifact() -> CompiledArtifact {
    CompiledArtifact::new(LanguageVariant::CSharp, "/tmp/mock")
}

#[tokio::test]
async fn test_first_successful_delegated_scope_is_used() {
    let backend = MockBackend::accepting(&["tok-b", "tok-app"]);
    let advisor = MockAdvisor::default().answer(
        ScopeType::DelegatedWork,
        Ok(scopes(&["ChannelSettings.Read.All", "Channel.ReadBasic.All", "Group.Read.All"])),
    );
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(5));

    let result = coordinator.execute(&artifact(), None).await.unwrap();

    assert!(result.success);
    assert_eq!(result.scope_used, Some(Scope::new("Channel.ReadBasic.All")));
    assert!(!result.application_permission);
    assert_eq!(backend.attempts(), ["tok-a", "tok-b"]);
    assert_eq!(*advisor.queries.lock().unwrap(), [ScopeType::DelegatedWork]);
}

#[tokio::test]
async fn test_application_attempted_once_after_all_delegated_fail() {
    let backend = MockBackend::accepting(&[]);
    let advisor = MockAdvisor::default().answer(
        ScopeType::DelegatedWork,
        Ok(scopes(&["ChannelSettings.Read.All", "Channel.ReadBasic.All", "Group.Read.All"])),
    );
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(5));

    let result = coordinator.execute(&artifact(), None).await.unwrap();

    assert!(!result.success);
    assert!(result.application_permission);
    assert!(result.scope_used.is_none());
    assert_eq!(backend.attempts(), ["tok-a", "tok-b", "tok-app"]);

    let message = result.exception_message.unwrap();
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(
        lines,
        [
            "ChannelSettings.Read.All: 403 Forbidden for tok-a",
            "Channel.ReadBasic.All: 403 Forbidden for tok-b",
            "Group.Read.All: no cached credential",
            "application: 403 Forbidden for tok-app",
        ]
    );
}

#[tokio::test]
async fn test_application_success_after_delegated_failures() {
    let backend = MockBackend::accepting(&["tok-app"]);
    let advisor = MockAdvisor::default()
        .answer(ScopeType::DelegatedWork, Ok(scopes(&["ChannelSettings.Read.All"])));
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(5));

    let result = coordinator.execute(&artifact(), None).await.unwrap();

    assert!(result.success);
    assert!(result.application_permission);
    assert!(result.scope_used.is_none());
}

#[tokio::test]
async fn test_application_only_when_delegated_query_fails() {
    let backend = MockBackend::accepting(&["tok-app"]);
    let advisor = MockAdvisor::default()
        .answer(ScopeType::DelegatedWork, Err(SnippetError::http("503")))
        .answer(ScopeType::Application, Ok(scopes(&["Channel.ReadBasic.All"])));
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(5));

    let query = PermissionQuery {
        method: "GET".to_string(),
        url: "https://graph.microsoft.com/v1.0/teams/t1".to_string(),
        page: None,
    };
    assert_eq!(coordinator.plan(&query).await.unwrap(), PermissionPlan::Application);

    let result = coordinator.execute(&artifact(), None).await.unwrap();
    assert!(result.success);
    assert_eq!(backend.attempts(), ["tok-app"]);
}

#[tokio::test]
async fn test_no_advised_permissions_is_a_resolution_failure() {
    let backend = MockBackend::accepting(&["tok-app"]);
    let advisor = MockAdvisor::default()
        .answer(ScopeType::DelegatedWork, Err(SnippetError::http("503")))
        .answer(ScopeType::Application, Ok(Vec::new()));
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(5));

    let err = coordinator.execute(&artifact(), None).await.unwrap_err();
    match err {
        SnippetError::PermissionResolution { method, url } => {
            assert_eq!(method, "GET");
            assert_eq!(url, "https://graph.microsoft.com/v1.0/teams/t1/channels/c1");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(backend.attempts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_fails_only_that_attempt() {
    let backend = MockBackend {
        accepted: vec!["tok-a", "tok-b"],
        slow: vec!["tok-a"],
        attempts: Mutex::new(Vec::new()),
    };
    let advisor = MockAdvisor::default().answer(
        ScopeType::DelegatedWork,
        Ok(scopes(&["ChannelSettings.Read.All", "Channel.ReadBasic.All"])),
    );
    let credentials = credentials();
    let coordinator =
        ExecutionCoordinator::new(&backend, &advisor, &credentials, Duration::from_secs(30));

    let result = coordinator.execute(&artifact(), None).await.unwrap();

    assert!(result.success);
    assert_eq!(result.scope_used, Some(Scope::new("Channel.ReadBasic.All")));
}
