//! Suite result reporting

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classified result of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub test_name: String,
    pub owner: String,
    pub passed: bool,
    /// Failure text, or the registered message of a known issue.
    pub message: Option<String>,
    /// The case failed as a registered known issue.
    pub known_issue: bool,
    pub duration: Duration,
}

impl CaseOutcome {
    pub fn passed(test_name: &str, owner: &str, duration: Duration) -> Self {
        Self {
            test_name: test_name.to_string(),
            owner: owner.to_string(),
            passed: true,
            message: None,
            known_issue: false,
            duration,
        }
    }

    pub fn failed(test_name: &str, owner: &str, message: String, duration: Duration) -> Self {
        Self {
            test_name: test_name.to_string(),
            owner: owner.to_string(),
            passed: false,
            message: Some(message),
            known_issue: false,
            duration,
        }
    }

    pub fn known_issue(test_name: &str, owner: &str, message: String, duration: Duration) -> Self {
        Self {
            test_name: test_name.to_string(),
            owner: owner.to_string(),
            passed: true,
            message: Some(message),
            known_issue: true,
            duration,
        }
    }
}

/// Complete report of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub duration: Duration,
    /// Outcomes in test case order
    pub results: Vec<CaseOutcome>,
    pub summary: SuiteSummary,
}

impl SuiteReport {
    pub fn new(
        run_id: &str,
        results: Vec<CaseOutcome>,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let completed_at = chrono::Utc::now();
        let duration = (completed_at - started_at).to_std().unwrap_or_default();
        let summary = SuiteSummary::from_results(&results);

        Self { run_id: run_id.to_string(), started_at, completed_at, duration, results, summary }
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    pub fn failures(&self) -> Vec<&CaseOutcome> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Format as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Snippet Report: {}\n", self.run_id));
        output.push_str(&format!("Duration: {:?}\n", self.duration));
        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Total: {}\n", self.summary.total));
        output.push_str(&format!("  Passed: {}\n", self.summary.passed));
        output.push_str(&format!("  Failed: {}\n", self.summary.failed));
        output.push_str(&format!("  Known Issues: {}\n", self.summary.known_issues));
        output.push_str(&format!("  Pass Rate: {:.1}%\n", self.summary.pass_rate * 100.0));

        if self.summary.failed > 0 {
            output.push_str("\nFailed Tests:\n");
            for result in self.failures() {
                let first_line =
                    result.message.as_deref().and_then(|m| m.lines().next()).unwrap_or_default();
                output.push_str(&format!(
                    "  - {} [{}]: {}\n",
                    result.test_name, result.owner, first_line
                ));
            }
        }

        output
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Passed cases that failed as registered known issues
    pub known_issues: usize,
    /// Pass rate (0.0 - 1.0)
    pub pass_rate: f64,
}

impl SuiteSummary {
    pub fn from_results(results: &[CaseOutcome]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        let known_issues = results.iter().filter(|r| r.known_issue).count();
        let pass_rate = if total > 0 { passed as f64 / total as f64 } else { 0.0 };

        Self { total, passed, failed, known_issues, pass_rate }
    }
}
