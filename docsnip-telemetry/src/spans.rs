//! Span helpers for the snippet validation pipeline

use tracing::Span;

/// Create a span covering one test case from generation to classification
///
/// # Example
/// ```
/// use docsnip_telemetry::test_case_span;
/// let span = test_case_span("get-user-csharp-V1-compiles", "csharp");
/// let _enter = span.enter();
/// ```
pub fn test_case_span(test_name: &str, language: &str) -> Span {
    tracing::info_span!("snippet.test_case", test.name = test_name, language = language)
}

/// Create a span for compiling one scaffolded snippet
pub fn compile_span(language: &str, attempt: u32) -> Span {
    tracing::debug_span!("snippet.compile", language = language, attempt = attempt)
}

/// Create a span for one live execution attempt under a single credential
///
/// `scope` is the delegated permission name, or `application` for the
/// application-permission credential.
pub fn execution_attempt_span(scope: &str, method: &str, url: &str) -> Span {
    tracing::info_span!(
        "snippet.execute",
        scope = scope,
        http.method = method,
        http.url = url,
        outcome = tracing::field::Empty,
    )
}

/// Record the outcome of the current execution attempt
pub fn record_outcome(span: &Span, success: bool) {
    span.record("outcome", if success { "success" } else { "failure" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Instrument;

    #[tokio::test]
    async fn test_outcome_recorded_inside_instrumented_future() {
        crate::init_telemetry("docsnip-test").unwrap();
        let span = execution_attempt_span("User.Read", "GET", "https://graph.microsoft.com/v1.0/me");
        let recorded = span.clone();

        let value = async {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            42
        }
        .instrument(span)
        .await;

        record_outcome(&recorded, true);
        assert_eq!(value, 42);
    }
}
