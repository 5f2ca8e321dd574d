use std::path::PathBuf;

use navgrep_core::cli::RepoArgs;
use navgrep_core::lookup::{LookupRequest, LookupSummary, Operation, Workspace, WorkspaceConfig};
use navgrep_core::types::Position;

fn fixture_root() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // navgrep-core
    path.pop(); // crates
    path.join("fixtures/multi_lang")
}

fn rg_available() -> bool {
    std::process::Command::new("rg")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

async fn workspace() -> Workspace {
    let args = RepoArgs {
        root: Some(fixture_root()),
        repo: None,
        revision: "HEAD".to_string(),
        timeout_ms: 5_000,
        search_timeout_secs: 10,
        max_matches: 200,
        indexed_only: false,
        trace: true,
        include_forks: false,
        public_instance: false,
        precise_index: None,
    };
    let config = WorkspaceConfig::try_from_args(args).expect("fixture config");
    Workspace::open(config).await.expect("fixture workspace")
}

async fn run(workspace: &Workspace, request: LookupRequest) -> anyhow::Result<LookupSummary> {
    let provider = workspace.provider();
    workspace.run(&provider, request).await
}

fn request(operation: Operation, path: &str, line: usize, character: usize) -> LookupRequest {
    LookupRequest {
        operation,
        path: path.to_string(),
        text: None,
        language: None,
        position: Position::new(line, character),
        include_declaration: true,
    }
}

#[tokio::test]
async fn finds_go_function_definition() {
    if !rg_available() {
        eprintln!("skipping: rg not installed");
        return;
    }
    let workspace = workspace().await;
    let summary = run(&workspace, request(Operation::Definition, "cmd/api/main.go", 9, 16))
        .await
        .expect("definition lookup should succeed");

    assert_eq!(summary.language, "go");
    assert_eq!(summary.locations.len(), 1, "{:?}", summary.locations);
    let found = &summary.locations[0];
    assert!(found.imprecise);
    assert!(found.value.uri.ends_with("#server/server.go"));
    assert_eq!(found.value.range.start, Position::new(16, 5));
}

#[tokio::test]
async fn hover_shows_go_method_signature_and_docs() {
    if !rg_available() {
        eprintln!("skipping: rg not installed");
        return;
    }
    let workspace = workspace().await;
    let summary = run(&workspace, request(Operation::Hover, "cmd/api/main.go", 11, 16))
        .await
        .expect("hover lookup should succeed");

    let hover = summary.hover.expect("expected a hover");
    assert!(hover.imprecise);
    assert_eq!(
        hover.value.contents,
        "```go\nfunc (s *Server) Serve() error\n```\n\n---\n\nServe starts the listener.\nIt blocks until the listener fails."
    );
}

#[tokio::test]
async fn finds_typescript_references_across_files() {
    if !rg_available() {
        eprintln!("skipping: rg not installed");
        return;
    }
    let workspace = workspace().await;
    let summary = run(&workspace, request(Operation::References, "web/index.ts", 0, 9))
        .await
        .expect("references lookup should succeed");

    let uris: Vec<&str> = summary.locations.iter().map(|l| l.value.uri.as_str()).collect();
    assert_eq!(uris.len(), 3, "{uris:?}");
    assert!(uris.iter().any(|uri| uri.ends_with("#web/user.ts")));
    assert_eq!(uris.iter().filter(|uri| uri.ends_with("#web/index.ts")).count(), 2);
}

#[tokio::test]
async fn python_docstring_below_definition() {
    if !rg_available() {
        eprintln!("skipping: rg not installed");
        return;
    }
    let workspace = workspace().await;
    let summary = run(&workspace, request(Operation::Hover, "accounts/users.py", 9, 20))
        .await
        .expect("hover lookup should succeed");

    let hover = summary.hover.expect("expected a hover");
    assert_eq!(
        hover.value.contents,
        "```python\ndef issue_token(username)\n```\n\n---\n\nCreate an opaque session token."
    );
}
