use docsnip_core::{ApiVersion, LanguageVariant, RunMode, TestIdentity, TestKind};
use docsnip_suite::{
    DocCorpus, KnownIssue, KnownIssueCategory, KnownIssueRegistry, TestCaseGenerator,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const OPERATIONS: [&str; 6] =
    ["get-channel", "get-team", "get-user", "list-groups", "create-event", "delete-message"];

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

fn snippet_rel(operation: &str) -> String {
    format!("api-reference/v1.0/includes/snippets/csharp/{}-csharp-snippets.md", operation)
}

/// Corpus with six C# snippets. The create and delete snippets make no read-only
/// call and so never appear in execution runs.
fn corpus() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for op in OPERATIONS {
        let body = match op {
            "create-event" => "var result = await graphClient.Me.Events.PostAsync(body);".to_string(),
            "delete-message" => "await graphClient.Me.Messages[\"{message-id}\"].DeleteAsync();".to_string(),
            _ => format!("var result = await graphClient.{}.GetAsync();", op.replace('-', "_")),
        };
        write(dir.path(), &snippet_rel(op), &format!("```csharp\n{}\n```\n", body));
    }

    write(
        dir.path(),
        "api-reference/v1.0/api/channel-get.md",
        "---\ntitle: \"Get channel\"\nauthor: \"akjo\"\n---\n\n# Get channel\n\n\
         [!INCLUDE [sample-code](../includes/snippets/csharp/get-channel-csharp-snippets.md)]\n",
    );
    write(
        dir.path(),
        "api-reference/v1.0/api/user-get.md",
        "---\ntitle: \"Get user\"\n---\n\n\
         [!INCLUDE [sample-code](../includes/snippets/csharp/get-user-csharp-snippets.md)]\n\
         [!INCLUDE [sample-code](../includes/snippets/csharp/get-user-manager-csharp-snippets.md)]\n",
    );
    dir
}

fn issue(identity: &TestIdentity) -> KnownIssue {
    KnownIssue {
        category: KnownIssueCategory::Sdk,
        message: "Tracked".to_string(),
        reference_link: None,
        test_name_prefix: identity.prefix(),
    }
}

fn registry(keys: &[&str]) -> Arc<KnownIssueRegistry> {
    Arc::new(KnownIssueRegistry::from_entries(keys.iter().map(|k| {
        let identity: TestIdentity = k.parse().unwrap();
        let entry = issue(&identity);
        (identity, entry)
    })))
}

fn names(generator: &TestCaseGenerator, mode: RunMode) -> Vec<String> {
    generator
        .generate(ApiVersion::V1, LanguageVariant::CSharp, mode)
        .unwrap()
        .cases
        .into_iter()
        .map(|c| c.test_name)
        .collect()
}

#[test]
fn test_stable_compile_run_is_sorted_and_excludes_known_issues() {
    let dir = corpus();
    let generator = TestCaseGenerator::new(
        DocCorpus::new(dir.path()),
        registry(&["get-team-csharp-V1-compiles"]),
    );

    assert_eq!(
        names(&generator, RunMode::compile_stable()),
        [
            "create-event-csharp-V1-compiles",
            "delete-message-csharp-V1-compiles",
            "get-channel-csharp-V1-compiles",
            "get-user-csharp-V1-compiles",
            "list-groups-csharp-V1-compiles",
        ]
    );
    assert_eq!(names(&generator, RunMode::compile_known_issues()), ["get-team-csharp-V1-compiles"]);
}

#[test]
fn test_execution_run_treats_compile_issues_as_known() {
    let dir = corpus();
    let generator = TestCaseGenerator::new(
        DocCorpus::new(dir.path()),
        registry(&["get-team-csharp-V1-compiles", "get-user-csharp-V1-executes"]),
    );

    assert_eq!(
        names(&generator, RunMode::execute_stable()),
        ["get-channel-csharp-V1-executes", "list-groups-csharp-V1-executes"]
    );
    let known = generator
        .generate(ApiVersion::V1, LanguageVariant::CSharp, RunMode::execute_known_issues())
        .unwrap();
    let flags: Vec<(String, bool, bool)> = known
        .cases
        .iter()
        .map(|c| (c.test_name.clone(), c.is_known_compile_issue, c.is_known_execution_issue))
        .collect();
    assert_eq!(
        flags,
        [
            ("get-team-csharp-V1-executes".to_string(), true, false),
            ("get-user-csharp-V1-executes".to_string(), false, true),
        ]
    );
}

#[test]
fn test_owner_and_doc_link_come_from_including_page() {
    let dir = corpus();
    let generator = TestCaseGenerator::new(DocCorpus::new(dir.path()), registry(&[]));
    let suite = generator
        .generate(ApiVersion::V1, LanguageVariant::CSharp, RunMode::compile_stable())
        .unwrap();

    let channel = suite.cases.iter().find(|c| c.identity.operation == "get-channel").unwrap();
    assert_eq!(channel.owner, "akjo");
    assert_eq!(
        channel.snippet.doc_link,
        "https://learn.microsoft.com/graph/api/channel-get?view=graph-rest-1.0&tabs=csharp"
    );
    assert!(channel.page.as_ref().unwrap().ends_with("channel-get.md"));

    let user = suite.cases.iter().find(|c| c.identity.operation == "get-user").unwrap();
    assert_eq!(user.owner, "unknown");

    let groups = suite.cases.iter().find(|c| c.identity.operation == "list-groups").unwrap();
    assert!(groups.page.is_none());
    assert!(groups.snippet.doc_link.is_empty());
}

#[test]
fn test_dangling_references_and_stale_issues_are_reported() {
    let dir = corpus();
    let generator = TestCaseGenerator::new(
        DocCorpus::new(dir.path()),
        registry(&["get-retired-csharp-V1-compiles", "get-retired-csharp-V1-executes"]),
    );
    let suite = generator
        .generate(ApiVersion::V1, LanguageVariant::CSharp, RunMode::compile_stable())
        .unwrap();

    assert_eq!(suite.dangling_references.len(), 1);
    assert_eq!(suite.dangling_references[0].snippet_file, "get-user-manager-csharp-snippets.md");
    assert_eq!(
        suite.stale_known_issues,
        ["get-retired-csharp-V1-compiles".parse::<TestIdentity>().unwrap()]
    );
}

#[test]
fn test_missing_language_directory_yields_no_cases() {
    let dir = corpus();
    let generator = TestCaseGenerator::new(DocCorpus::new(dir.path()), registry(&[]));
    let suite =
        generator.generate(ApiVersion::Beta, LanguageVariant::Go, RunMode::compile_stable()).unwrap();
    assert!(suite.cases.is_empty());
}

#[test]
fn test_execution_run_excludes_snippets_with_write_calls() {
    let dir = corpus();
    write(
        dir.path(),
        &snippet_rel("update-profile"),
        "```csharp\nvar me = await graphClient.Me.GetAsync();\n\
         await graphClient.Me.PatchAsync(new User { AboutMe = me.AboutMe });\n```\n",
    );
    let generator = TestCaseGenerator::new(DocCorpus::new(dir.path()), registry(&[]));

    let executes = names(&generator, RunMode::execute_stable());
    assert!(!executes.contains(&"update-profile-csharp-V1-executes".to_string()));
    assert!(executes.contains(&"get-user-csharp-V1-executes".to_string()));
    assert!(names(&generator, RunMode::compile_stable())
        .contains(&"update-profile-csharp-V1-compiles".to_string()));
}

#[test]
fn test_unreadable_files_are_skipped() {
    let dir = corpus();
    let snippet = dir.path().join(snippet_rel("get-photo"));
    std::fs::write(&snippet, [0xff, 0xfe, 0x00, 0x60]).unwrap();
    std::fs::write(dir.path().join("api-reference/v1.0/api/photo-get.md"), [0xc3, 0x28]).unwrap();

    let generator = TestCaseGenerator::new(DocCorpus::new(dir.path()), registry(&[]));
    let suite = generator
        .generate(ApiVersion::V1, LanguageVariant::CSharp, RunMode::compile_stable())
        .unwrap();

    let names: Vec<&str> = suite.cases.iter().map(|c| c.test_name.as_str()).collect();
    assert!(!names.contains(&"get-photo-csharp-V1-compiles"));
    assert!(names.contains(&"get-channel-csharp-V1-compiles"));
    let channel = suite.cases.iter().find(|c| c.identity.operation == "get-channel").unwrap();
    assert_eq!(channel.owner, "akjo");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_stable_and_known_runs_partition_the_corpus(
        compile_known in prop::collection::btree_set(0..OPERATIONS.len(), 0..=OPERATIONS.len()),
        execute_known in prop::collection::btree_set(0..OPERATIONS.len(), 0..=OPERATIONS.len()),
    ) {
        let dir = corpus();
        let mut keys: Vec<String> = compile_known
            .iter()
            .map(|&i| format!("{}-csharp-V1-compiles", OPERATIONS[i]))
            .collect();
        keys.extend(execute_known.iter().map(|&i| format!("{}-csharp-V1-executes", OPERATIONS[i])));
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let generator = TestCaseGenerator::new(DocCorpus::new(dir.path()), registry(&key_refs));

        for kind in [TestKind::Compilation, TestKind::Execution] {
            let (stable_mode, known_mode) = match kind {
                TestKind::Compilation => (RunMode::compile_stable(), RunMode::compile_known_issues()),
                TestKind::Execution => (RunMode::execute_stable(), RunMode::execute_known_issues()),
            };
            let stable: BTreeSet<String> = names(&generator, stable_mode).into_iter().collect();
            let known: BTreeSet<String> = names(&generator, known_mode).into_iter().collect();

            prop_assert!(stable.is_disjoint(&known));

            let eligible: BTreeSet<String> = OPERATIONS
                .iter()
                .filter(|op| kind == TestKind::Compilation || !matches!(**op, "create-event" | "delete-message"))
                .map(|op| format!("{}-csharp-V1-{}", op, kind.suffix()))
                .collect();
            let union: BTreeSet<String> = stable.union(&known).cloned().collect();
            prop_assert_eq!(union, eligible);

            for name in &known {
                let op = name.trim_end_matches(&format!("-csharp-V1-{}", kind.suffix()));
                let i = OPERATIONS.iter().position(|o| *o == op).unwrap();
                let expected = compile_known.contains(&i)
                    || (kind == TestKind::Execution && execute_known.contains(&i));
                prop_assert!(expected, "{} selected as known issue", name);
            }
        }
    }
}
