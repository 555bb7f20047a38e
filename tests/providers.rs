use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use kex::indexer::Indexer;
use kex::provider::Provider;
use kex::provider_composite::CompositeProvider;
use kex::provider_fs::FilesystemProvider;
use kex::provider_http::HttpProvider;
use kex::search::SearchUseCase;
use kex::validate::Validator;

/// In-memory static site: request path => body.
struct MockSite {
    files: HashMap<String, String>,
    token: Option<String>,
    hits: AtomicUsize,
}

async fn serve_file(
    State(site): State<Arc<MockSite>>,
    headers: HeaderMap,
    uri: Uri,
) -> (StatusCode, String) {
    if let Some(token) = &site.token {
        let expected = format!("Bearer {token}");
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected);
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "unauthorized".to_string());
        }
    }
    site.hits.fetch_add(1, Ordering::SeqCst);
    match site.files.get(uri.path()) {
        Some(body) => (StatusCode::OK, body.clone()),
        None => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

/// Starts the mock site and returns its base URL (with trailing slash).
async fn start_site(files: Vec<(&str, String)>, token: Option<&str>) -> (String, Arc<MockSite>) {
    let site = Arc::new(MockSite {
        files: files
            .into_iter()
            .map(|(path, body)| (path.to_string(), body))
            .collect(),
        token: token.map(str::to_string),
        hits: AtomicUsize::new(0),
    });
    let app = Router::new()
        .fallback(serve_file)
        .with_state(Arc::clone(&site));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/guides/"), site)
}

fn remote_index() -> String {
    serde_json::json!({
        "generated_at": "2025-01-01T00:00:00Z",
        "documents": [
            {
                "id": "remote.security",
                "title": "Security Basics",
                "description": "Secrets handling",
                "keywords": ["secrets", "security"],
                "scopes": [],
                "path": "remote/security.md"
            },
            {
                "id": "remote.go",
                "title": "Remote Go",
                "keywords": ["security"],
                "scopes": ["coding", "go"],
                "status": "draft",
                "path": "coding/go/remote.md"
            }
        ]
    })
    .to_string()
}

fn write_doc(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

async fn load(provider: Arc<dyn Provider>) -> Indexer {
    let mut indexer = Indexer::new(provider);
    indexer.load().await.unwrap();
    indexer
}

#[tokio::test]
async fn test_remote_provider_loads_and_fetches_lazily() {
    let (base, site) = start_site(
        vec![
            ("/guides/kex.json", remote_index()),
            (
                "/guides/remote/security.md",
                "---\nid: remote.security\ntitle: Security Basics\n---\nNever commit secrets.\n"
                    .to_string(),
            ),
        ],
        None,
    )
    .await;

    let provider = HttpProvider::new(&base, None).unwrap();
    let indexer = Arc::new(load(Arc::new(provider)).await);
    assert_eq!(indexer.len(), 2);
    assert_eq!(site.hits.load(Ordering::SeqCst), 1);

    let results = SearchUseCase::new(Arc::clone(&indexer)).execute(&["security".to_string()], None, false);
    let ids: Vec<_> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["remote.security"]);

    let hits_before = site.hits.load(Ordering::SeqCst);
    assert_eq!(hits_before, 1);
    let doc = indexer.get_by_id("remote.security").await.unwrap();
    assert_eq!(doc.body(), "Never commit secrets.\n");
    let again = indexer.get_by_id("remote.security").await.unwrap();
    assert_eq!(again.body(), "Never commit secrets.\n");
    assert_eq!(site.hits.load(Ordering::SeqCst), hits_before + 1);
}

#[tokio::test]
async fn test_remote_body_failure_leaves_empty_body() {
    let (base, _site) = start_site(vec![("/guides/kex.json", remote_index())], None).await;

    let indexer = load(Arc::new(HttpProvider::new(&base, None).unwrap())).await;
    let doc = indexer.get_by_id("remote.go").await.unwrap();
    assert_eq!(doc.title, "Remote Go");
    assert!(doc.body().is_empty());
    assert!(!doc.has_body());
}

#[tokio::test]
async fn test_remote_provider_sends_bearer_token() {
    let (base, _site) = start_site(
        vec![("/guides/kex.json", remote_index())],
        Some("s3cret"),
    )
    .await;

    let anonymous = HttpProvider::new(&base, None).unwrap();
    let err = anonymous.load().await.unwrap_err();
    assert!(format!("{err:#}").contains("401"), "{err:#}");

    let authorized = HttpProvider::new(&base, Some("s3cret".to_string())).unwrap();
    let outcome = authorized.load().await.unwrap();
    assert_eq!(outcome.schema.documents.len(), 2);
}

#[tokio::test]
async fn test_export_round_trips_through_remote_provider() {
    let tmp = TempDir::new().unwrap();
    write_doc(
        tmp.path(),
        "testing.md",
        "---\nid: testing\ntitle: Testing\nkeywords: [tests]\n---\nWrite tests.\n",
    );
    write_doc(
        tmp.path(),
        "coding/rust/errors.md",
        "---\ntitle: Rust Errors\nkeywords: [error]\n---\nUse anyhow.\n",
    );
    write_doc(
        tmp.path(),
        "wip.md",
        "---\nid: wip\ntitle: WIP\nstatus: draft\n---\nLater.\n",
    );

    let local = load(Arc::new(FilesystemProvider::new(tmp.path()))).await;
    let exported = local.export();
    assert_eq!(exported.documents.len(), 2);

    let mut files = vec![(
        "/guides/kex.json",
        serde_json::to_string(&exported).unwrap(),
    )];
    files.push((
        "/guides/coding/rust/errors.md",
        fs::read_to_string(tmp.path().join("coding/rust/errors.md")).unwrap(),
    ));
    let (base, _site) = start_site(files, None).await;

    let remote = load(Arc::new(HttpProvider::new(&base, None).unwrap())).await;
    let mut local_ids: Vec<_> = exported.documents.iter().map(|d| d.id.clone()).collect();
    let mut remote_ids: Vec<_> = remote.get_all().iter().map(|d| d.id.clone()).collect();
    local_ids.sort();
    remote_ids.sort();
    assert_eq!(local_ids, remote_ids);
    assert_eq!(remote_ids, vec!["coding.rust.errors", "testing"]);

    let doc = remote.get_by_id("coding.rust.errors").await.unwrap();
    assert_eq!(doc.scopes, vec!["coding", "rust"]);
    assert_eq!(doc.body(), "Use anyhow.\n");
}

#[tokio::test]
async fn test_composite_routes_bodies_to_origin() {
    let tmp = TempDir::new().unwrap();
    write_doc(
        tmp.path(),
        "local.md",
        "---\nid: local\ntitle: Local\nkeywords: [security]\n---\nLocal body.\n",
    );
    let (base, _site) = start_site(
        vec![
            ("/guides/kex.json", remote_index()),
            (
                "/guides/remote/security.md",
                "---\nid: remote.security\n---\nRemote body.\n".to_string(),
            ),
        ],
        None,
    )
    .await;

    let composite = CompositeProvider::new(vec![
        Box::new(FilesystemProvider::new(tmp.path())),
        Box::new(HttpProvider::new(&base, None).unwrap()),
    ]);
    let indexer = Arc::new(load(Arc::new(composite)).await);
    assert_eq!(indexer.len(), 3);
    assert!(indexer.errors().is_empty());

    let results = SearchUseCase::new(Arc::clone(&indexer)).execute(&["security".to_string()], None, false);
    let ids: Vec<_> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["local", "remote.security"]);

    let local = indexer.get_by_id("local").await.unwrap();
    assert_eq!(local.body(), "Local body.\n");
    let remote = indexer.get_by_id("remote.security").await.unwrap();
    assert_eq!(remote.body(), "Remote body.\n");
}

#[tokio::test]
async fn test_duplicate_ids_across_roots_fail_validation() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_doc(first.path(), "dup.md", "---\nid: dup\ntitle: First\n---\none\n");
    write_doc(second.path(), "dup.md", "---\nid: dup\ntitle: Second\n---\ntwo\n");

    let composite = CompositeProvider::new(vec![
        Box::new(FilesystemProvider::new(first.path())),
        Box::new(FilesystemProvider::new(second.path())),
    ]);
    let indexer = load(Arc::new(composite)).await;
    assert_eq!(indexer.len(), 1);
    assert_eq!(indexer.get_all()[0].title, "First");

    let report = Validator::new().validate(&indexer);
    assert!(!report.valid);
    assert!(!report.passes_start_gate());
    assert_eq!(report.summary.parse_errors, 1);
    assert_eq!(
        report.global_errors,
        vec!["duplicate document ID 'dup' found in 'dup.md' and 'dup.md'"]
    );
}

#[tokio::test]
async fn test_fatal_child_error_aborts_composite_load() {
    let tmp = TempDir::new().unwrap();
    let composite = CompositeProvider::new(vec![
        Box::new(FilesystemProvider::new(tmp.path())),
        Box::new(FilesystemProvider::new(tmp.path().join("missing"))),
    ]);
    let mut indexer = Indexer::new(Arc::new(composite));
    let err = indexer.load().await.unwrap_err();
    assert!(format!("{err:#}").contains("source directory does not exist"));
}

#[tokio::test]
async fn test_same_relative_path_in_two_roots_reads_own_body() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_doc(first.path(), "rule.md", "---\nid: rule\ntitle: A\n---\nbody from A\n");
    write_doc(second.path(), "rule.md", "---\nid: other\ntitle: B\n---\nbody from B\n");

    let composite = CompositeProvider::new(vec![
        Box::new(FilesystemProvider::new(first.path())),
        Box::new(FilesystemProvider::new(second.path())),
    ]);
    let indexer = load(Arc::new(composite)).await;
    assert_eq!(indexer.len(), 2);

    let other = indexer.get_by_id("other").await.unwrap();
    assert_eq!(other.title, "B");
    assert_eq!(other.body(), "body from B\n");

    let rule = indexer.get_by_id("rule").await.unwrap();
    assert_eq!(rule.body(), "body from A\n");
}

#[tokio::test]
async fn test_remote_entry_without_id_is_reported_by_validator() {
    let index = serde_json::json!({
        "generated_at": "2025-01-01T00:00:00Z",
        "documents": [
            { "title": "No id", "path": "x.md" },
            { "id": "ok", "title": "Ok", "path": "ok.md" }
        ]
    })
    .to_string();
    let (base, _site) = start_site(vec![("/guides/kex.json", index)], None).await;

    let indexer = load(Arc::new(HttpProvider::new(&base, None).unwrap())).await;
    assert_eq!(indexer.len(), 2);

    let report = Validator::new().validate(&indexer);
    assert!(!report.valid);
    let missing = report.documents.iter().find(|d| d.path == "x.md").unwrap();
    assert_eq!(missing.errors, vec!["id is required"]);
    let ok = report.documents.iter().find(|d| d.id == "ok").unwrap();
    assert!(ok.errors.is_empty());
}
