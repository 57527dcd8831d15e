//! A [`CompilerBackend`] that drives external build tools.
//!
//! Each compile writes the scaffolded source into a fresh temporary project and
//! runs the configured build command there. The artifact keeps the directory alive
//! until it is dropped. Running an artifact invokes the configured run command with
//! `SNIPPET_MODE` set to `dry` (print the request as JSON on the last stdout line)
//! or `live` (send it with `SNIPPET_ACCESS_TOKEN`).

use async_trait::async_trait;
use docsnip_core::{
    CompileOutcome, CompiledArtifact, CompilerBackend, Credential, Diagnostic, LanguageVariant,
    RequestInfo, Result, RunOutput, SnippetError,
};
use docsnip_template::{ACCESS_TOKEN_ENV_VAR, MODE_ENV_VAR, support_files};
use regex::Regex;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Replaced with the absolute path of the written source file in command arguments.
pub const SOURCE_PLACEHOLDER: &str = "{source}";

static MSBUILD_DIAGNOSTIC: OnceLock<Regex> = OnceLock::new();
static GNU_DIAGNOSTIC: OnceLock<Regex> = OnceLock::new();

/// `Program.cs(14,5): error CS0103: The name 'x' does not exist`
fn get_msbuild_regex() -> &'static Regex {
    MSBUILD_DIAGNOSTIC.get_or_init(|| {
        Regex::new(r"(?m)^[^\n(]*\((\d+),(\d+)\):\s*error\s+([A-Za-z]+\d+):\s*(.+?)\s*$")
            .expect("Invalid regex pattern")
    })
}

/// `./main.go:14:5: undefined: x` (go) and `Snippet.java:14: error: cannot find symbol`
/// (javac). The column and the `error:` label are both optional.
fn get_gnu_regex() -> &'static Regex {
    GNU_DIAGNOSTIC.get_or_init(|| {
        Regex::new(r"(?m)^\S+\.\w+:(\d+):(?:(\d+):)?[ \t]*(?:error:[ \t]*)?(.+?)\s*$")
            .expect("Invalid regex pattern")
    })
}

/// Parses error diagnostics from build tool output.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    let msbuild = get_msbuild_regex().captures_iter(output).filter_map(|c| {
        let line = c[1].parse().ok()?;
        let column = c[2].parse().ok()?;
        Some(Diagnostic::error(line, column, &c[4]).with_code(&c[3]))
    });
    let gnu = get_gnu_regex().captures_iter(output).filter_map(|c| {
        let message = &c[3];
        if message.starts_with("warning:") || message.starts_with("note:") {
            return None;
        }
        let line = c[1].parse().ok()?;
        let column = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        Some(Diagnostic::error(line, column, message))
    });

    // msbuild repeats every error in its summary
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for diagnostic in msbuild.chain(gnu) {
        if !diagnostics.contains(&diagnostic) {
            diagnostics.push(diagnostic);
        }
    }
    diagnostics
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    fn command(&self, dir: &Path, source: &Path) -> Command {
        let source = source.to_string_lossy();
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|a| a.replace(SOURCE_PLACEHOLDER, &source)))
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

pub struct CommandBackend {
    language: LanguageVariant,
    source_file: String,
    project_files: Vec<(String, String)>,
    prepare: Option<CommandSpec>,
    build: CommandSpec,
    run: CommandSpec,
    timeout: Duration,
    transient_marker: Option<String>,
}

impl CommandBackend {
    pub fn new(
        language: LanguageVariant,
        source_file: impl Into<String>,
        build: CommandSpec,
        run: CommandSpec,
    ) -> Self {
        let project_files = support_files(language)
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        Self {
            language,
            source_file: source_file.into(),
            project_files,
            prepare: None,
            build,
            run,
            timeout: Duration::from_secs(120),
            transient_marker: None,
        }
    }

    /// Extra file written next to the source in every project (a project manifest).
    /// Scaffold support files for the language are always included.
    pub fn with_project_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.project_files.push((name.into(), content.into()));
        self
    }

    /// One-time command run in the current directory before any test.
    pub fn with_prepare(mut self, command: CommandSpec) -> Self {
        self.prepare = Some(command);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Diagnostic text identifying the "runtime still starting" build failure.
    pub fn with_transient_marker(mut self, marker: impl Into<String>) -> Self {
        self.transient_marker = Some(marker.into());
        self
    }

    async fn run_command(&self, mut command: Command, operation: &str) -> Result<Output> {
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| SnippetError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            })??;
        Ok(output)
    }

    async fn run_artifact(
        &self,
        artifact: &CompiledArtifact,
        mode: &str,
        token: Option<&str>,
    ) -> Result<Output> {
        let source = artifact.location.join(&self.source_file);
        let mut command = self.run.command(&artifact.location, &source);
        command.env(MODE_ENV_VAR, mode);
        if let Some(token) = token {
            command.env(ACCESS_TOKEN_ENV_VAR, token);
        }
        self.run_command(command, &format!("{} run", self.language)).await
    }
}

fn combined(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}\n{}", stdout.trim_end(), stderr.trim_end()).trim().to_string()
}

#[async_trait]
impl CompilerBackend for CommandBackend {
    fn language(&self) -> LanguageVariant {
        self.language
    }

    async fn prepare(&self) -> Result<()> {
        let Some(prepare) = &self.prepare else {
            return Ok(());
        };
        debug!(command = %prepare, "preparing build environment");

        let mut command = Command::new(&prepare.program);
        command.args(&prepare.args).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        let output = self.run_command(command, "environment preparation").await?;
        if !output.status.success() {
            return Err(SnippetError::environment(
                self.language.to_string(),
                format!("'{}' failed: {}", prepare, combined(&output)),
            ));
        }
        Ok(())
    }

    async fn compile(&self, source: &str) -> Result<CompileOutcome> {
        let dir = tempfile::Builder::new().prefix("docsnip-").tempdir()?;
        let source_path = dir.path().join(&self.source_file);
        tokio::fs::write(&source_path, source).await?;
        for (name, content) in &self.project_files {
            tokio::fs::write(dir.path().join(name), content).await?;
        }

        let command = self.build.command(dir.path(), &source_path);
        let output = self.run_command(command, &format!("{} build", self.language)).await?;
        if output.status.success() {
            let location = dir.path().to_path_buf();
            return Ok(CompileOutcome::Compiled(
                CompiledArtifact::new(self.language, location).with_keep_alive(Arc::new(dir)),
            ));
        }

        let text = combined(&output);
        let mut diagnostics = parse_diagnostics(&text);
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error(0, 0, text));
        }
        Ok(CompileOutcome::Failed(diagnostics))
    }

    async fn inspect(&self, artifact: &CompiledArtifact) -> Result<RequestInfo> {
        let output = self.run_artifact(artifact, "dry", None).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(SnippetError::Execution(format!(
                "dry run failed: {}",
                combined(&output)
            )));
        }

        let last = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or_default();
        serde_json::from_str(last.trim()).map_err(|e| {
            SnippetError::Execution(format!("dry run printed no request ({}): {}", e, last))
        })
    }

    async fn execute(&self, artifact: &CompiledArtifact, credential: &Credential) -> Result<RunOutput> {
        let output = self.run_artifact(artifact, "live", Some(&credential.access_token)).await?;
        let success = output.status.success();
        if !success {
            warn!(language = %self.language, code = ?output.status.code(), "live run failed");
        }
        Ok(RunOutput { success, output: combined(&output) })
    }

    fn is_transient(&self, diagnostics: &[Diagnostic]) -> bool {
        self.transient_marker
            .as_deref()
            .is_some_and(|marker| diagnostics.iter().any(|d| d.message.contains(marker)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_msbuild_diagnostics() {
        let output = "Program.cs(14,13): error CS0103: The name 'usr' does not exist in the current context [/tmp/p.csproj]\n\
                      Build FAILED.\n\
                      Program.cs(14,13): error CS0103: The name 'usr' does not exist in the current context [/tmp/p.csproj]\n";
        let diagnostics = parse_diagnostics(output);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, 14);
        assert_eq!(diagnostics[0].column, 13);
        assert_eq!(diagnostics[0].code.as_deref(), Some("CS0103"));
    }

    #[test]
    fn test_parse_go_diagnostics() {
        let output = "# command-line-arguments\n\
                      ./main.go:9:2: undefined: graphClient\n\
                      ./main.go:12:7: declared and not used: result\n";
        assert_eq!(
            parse_diagnostics(output),
            vec![
                Diagnostic::error(9, 2, "undefined: graphClient"),
                Diagnostic::error(12, 7, "declared and not used: result"),
            ]
        );
    }

    #[test]
    fn test_parse_javac_diagnostics() {
        let output = "GraphSdkSnippet.java:9: error: cannot find symbol\n\
                      \x20       User result = graphClient.mee().get();\n\
                      \x20                                ^\n\
                      \x20 symbol:   method mee()\n\
                      \x20 location: variable graphClient of type GraphServiceClient\n\
                      GraphSdkSnippet.java:4: warning: [deprecation] Foo in bar has been deprecated\n\
                      1 error\n";
        assert_eq!(parse_diagnostics(output), vec![Diagnostic::error(9, 0, "cannot find symbol")]);
    }

    #[test]
    fn test_build_summary_lines_are_not_diagnostics() {
        let output = "Build FAILED.\n    0 Warning(s)\n    1 Error(s)\nTime Elapsed 00:00:01.23\n";
        assert!(parse_diagnostics(output).is_empty());
    }

    #[test]
    fn test_transient_marker() {
        let backend = CommandBackend::new(
            LanguageVariant::CSharp,
            "Program.cs",
            CommandSpec::new("dotnet", ["build"]),
            CommandSpec::new("dotnet", ["run", "--no-build"]),
        )
        .with_transient_marker("MSB4236");
        assert!(backend.is_transient(&[Diagnostic::error(0, 0, "error MSB4236: SDK not found")]));
        assert!(!backend.is_transient(&[Diagnostic::error(3, 1, "CS0103")]));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_javascript_project_contains_request_recorder() {
        let backend = CommandBackend::new(
            LanguageVariant::JavaScript,
            "snippet.js",
            CommandSpec::new("sh", ["-c", "grep -q RequestRecorder request-recorder.js && test -f {source}"]),
            CommandSpec::new("node", [SOURCE_PLACEHOLDER]),
        );
        let outcome = backend.compile("console.log(1);").await.unwrap();
        let CompileOutcome::Compiled(artifact) = outcome else {
            panic!("build command did not find the recorder module");
        };
        let recorder = artifact.location.join("request-recorder.js");
        assert_eq!(std::fs::read_to_string(recorder).unwrap(), docsnip_template::JAVASCRIPT_REQUEST_RECORDER);
    }

    #[test]
    fn test_command_display() {
        let spec = CommandSpec::new("javac", ["-d", "out", SOURCE_PLACEHOLDER]);
        assert_eq!(spec.to_string(), "javac -d out {source}");
    }
}
