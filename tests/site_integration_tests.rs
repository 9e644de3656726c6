use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use signpost::core::router::{NavOutcome, NavState, RenderGateway, Router};
use signpost::core::search::SearchIndex;
use signpost::core::store::{ContentError, PostStore, StoreError};
use signpost::fetch::{FetchError, HttpSource, LocalSource, ResourceFetcher};
use signpost::site::{ListKind, Page, Site, register_routes};
use tokio_test::{assert_pending, task};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

const INDEX: &str = r#"{
  "posts": [
    {"id": "a", "title": "Hello Rust", "date": "2023-05-01", "category": "Rust",
     "tags": ["rust"], "description": "First steps", "filename": "posts/a.md", "readTime": 3},
    {"id": "b", "title": "Modern C++ tips", "date": "2024-02-10", "category": "Systems",
     "tags": ["C++"], "filename": "posts/b.md"},
    {"id": "c", "title": "Concurrency in Go", "date": "2024-02-10", "category": "Go Lang",
     "tags": ["go"], "filename": "posts/c.md"}
  ],
  "categories": ["Rust", "Systems", "Go Lang"],
  "tags": ["rust", "C++", "go"]
}"#;

const ARTICLE: &str = "---\ntitle: Hello Rust\nauthor: ferris\n---\n\n# Hello\n\nBorrow all the things.\n";

/// Records what the router asked to show, in order.
#[derive(Default)]
struct Recorder {
    pages: Mutex<Vec<Page>>,
    not_found: Mutex<Vec<String>>,
}

impl RenderGateway<Page> for Recorder {
    fn show_loading(&self) {}

    fn render(&self, page: Page) {
        self.pages.lock().unwrap().push(page);
    }

    fn show_not_found(&self, path: &str) {
        self.not_found.lock().unwrap().push(path.to_string());
    }
}

impl Recorder {
    fn last_page(&self) -> Page {
        self.pages.lock().unwrap().last().cloned().expect("nothing rendered")
    }
}

/// Mounts the index and one article on a fresh mock server.
async fn blog_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INDEX))
        .mount(&server)
        .await;
    server
}

async fn http_store(server: &MockServer) -> PostStore {
    let fetcher: Arc<dyn ResourceFetcher> = Arc::new(HttpSource::new(server.uri()));
    let mut store = PostStore::new(fetcher);
    store.load("data/posts.json").await.unwrap();
    store
}

async fn routed_site(store: PostStore) -> (Arc<Router<Page>>, Arc<Recorder>) {
    let store = Arc::new(store);
    let index = Arc::new(SearchIndex::build(store.all()));
    let site = Arc::new(Site::new(store, index));
    let recorder = Arc::new(Recorder::default());
    let router = Arc::new(Router::new(recorder.clone() as Arc<dyn RenderGateway<Page>>));
    register_routes(&router, site);
    (router, recorder)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("signpost-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("data")).unwrap();
    std::fs::create_dir_all(dir.join("posts")).unwrap();
    dir
}

// ============================================================================
// HTTP Source Tests
// ============================================================================

#[tokio::test]
async fn test_http_source_fetches_text() {
    let server = blog_server().await;
    let source = HttpSource::new(format!("{}/", server.uri()));

    let text = source.fetch_text("/data/posts.json").await.unwrap();

    assert_eq!(text, INDEX);
}

#[tokio::test]
async fn test_http_source_maps_404_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/missing.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let source = HttpSource::new(server.uri());

    let err = source.fetch_text("posts/missing.md").await.unwrap_err();

    assert_eq!(err, FetchError::NotFound("posts/missing.md".into()));
}

#[tokio::test]
async fn test_http_source_reports_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/posts.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let source = HttpSource::new(server.uri());

    let err = source.fetch_text("data/posts.json").await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Status {
            status: 500,
            message: "boom".into()
        }
    );
}

#[tokio::test]
async fn test_http_source_unreachable_host_is_network_error() {
    // Port 9 (discard) on localhost is not served by anything in tests
    let source = HttpSource::new("http://127.0.0.1:9");

    let err = source.fetch_text("data/posts.json").await.unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "got {err:?}");
}

// ============================================================================
// Post Store Tests
// ============================================================================

#[tokio::test]
async fn test_store_loads_index_over_http() {
    let server = blog_server().await;

    let store = http_store(&server).await;

    let ids: Vec<&str> = store.all().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[2], "a");
    assert_eq!(store.declared_categories(), ["Rust", "Systems", "Go Lang"]);
}

#[tokio::test]
async fn test_store_load_failure_leaves_store_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/posts.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let mut store = PostStore::new(Arc::new(HttpSource::new(server.uri())));

    let err = store.load("data/posts.json").await.unwrap_err();

    assert!(matches!(err, StoreError::Parse(_)), "got {err:?}");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_article_is_fetched_once_and_cached() {
    let server = blog_server().await;
    Mock::given(method("GET"))
        .and(path("/posts/a.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&server)
        .await;
    let store = http_store(&server).await;

    let first = store.load_content("posts/a.md").await.unwrap();
    let second = store.load_content("posts/a.md").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.metadata["author"], "ferris");
    assert!(first.content.starts_with("# Hello"));
    assert_eq!(store.cached_content_len(), 1);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_request() {
    let server = blog_server().await;
    Mock::given(method("GET"))
        .and(path("/posts/a.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ARTICLE)
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let store = http_store(&server).await;

    let mut first = task::spawn(store.load_content("posts/a.md"));
    let mut second = task::spawn(store.load_content("posts/a.md"));
    assert_pending!(first.poll());
    assert_pending!(second.poll());

    let (a, b) = tokio::join!(first, second);
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
}

#[tokio::test]
async fn test_failed_article_is_not_cached() {
    let server = blog_server().await;
    Mock::given(method("GET"))
        .and(path("/posts/b.md"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts/b.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Plain body"))
        .mount(&server)
        .await;
    let store = http_store(&server).await;

    let err = store.load_content("posts/b.md").await.unwrap_err();
    assert!(matches!(
        err,
        ContentError::Fetch(FetchError::Status { status: 503, .. })
    ));
    assert_eq!(store.cached_content_len(), 0);

    let retry = store.load_content("posts/b.md").await.unwrap();
    assert_eq!(retry.content, "Plain body");
    assert!(retry.metadata.is_empty());
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test]
async fn test_category_route_decodes_spaces() {
    let server = blog_server().await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    let outcome = router.handle_navigation("#/category/Go%20Lang").await;

    assert_eq!(outcome, NavOutcome::Rendered);
    match recorder.last_page() {
        Page::PostList { kind, posts } => {
            assert_eq!(kind, ListKind::Category("Go Lang".into()));
            assert_eq!(posts.len(), 1);
            assert_eq!(posts[0].id, "c");
        }
        other => panic!("unexpected page {other:?}"),
    }
}

#[tokio::test]
async fn test_tag_route_decodes_plus_signs() {
    let server = blog_server().await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    router.handle_navigation("#/tag/C%2B%2B").await;

    match recorder.last_page() {
        Page::PostList { kind, posts } => {
            assert_eq!(kind, ListKind::Tag("C++".into()));
            assert_eq!(posts[0].id, "b");
        }
        other => panic!("unexpected page {other:?}"),
    }
}

#[tokio::test]
async fn test_article_route_fetches_content_over_http() {
    let server = blog_server().await;
    Mock::given(method("GET"))
        .and(path("/posts/a.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
        .expect(1)
        .mount(&server)
        .await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    router.handle_navigation("#/post/a").await;
    router.handle_navigation("#/").await;
    router.handle_navigation("#/post/a").await;

    match recorder.last_page() {
        Page::Article {
            post,
            content,
            read_time,
            adjacent,
        } => {
            assert_eq!(post.id, "a");
            assert_eq!(read_time, 3);
            assert!(content.content.contains("Borrow all the things."));
            assert_eq!(adjacent.prev, None);
            assert_eq!(adjacent.next.map(|p| p.id), Some("c".to_string()));
        }
        other => panic!("unexpected page {other:?}"),
    }
}

#[tokio::test]
async fn test_article_fetch_failure_renders_load_failed() {
    let server = blog_server().await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    // posts/c.md is not mounted, so the mock server answers 404
    let outcome = router.handle_navigation("#/post/c").await;

    assert_eq!(outcome, NavOutcome::Rendered);
    match recorder.last_page() {
        Page::LoadFailed { post, reason } => {
            assert_eq!(post.id, "c");
            assert!(reason.contains("posts/c.md"), "got {reason}");
        }
        other => panic!("unexpected page {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_route_shows_not_found() {
    let server = blog_server().await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    let outcome = router.handle_navigation("#/nope/deeper").await;

    assert_eq!(outcome, NavOutcome::NotFound);
    assert_eq!(router.state(), NavState::NotFound);
    assert_eq!(*recorder.not_found.lock().unwrap(), vec!["/nope/deeper".to_string()]);
}

#[tokio::test]
async fn test_listen_handles_navigate_events() {
    let server = blog_server().await;
    let (router, recorder) = routed_site(http_store(&server).await).await;

    let listener = router.listen("#/tags");
    router.navigate("/categories");

    for _ in 0..1000 {
        if recorder.pages.lock().unwrap().len() >= 2 {
            break;
        }
        tokio::task::yield_now().await;
    }
    let pages = recorder.pages.lock().unwrap().clone();
    assert!(matches!(pages[0], Page::Tags { .. }));
    assert!(matches!(pages[1], Page::Categories { .. }));
    assert_eq!(router.fragment(), "#/categories");
    listener.abort();
}

// ============================================================================
// Local Source Tests
// ============================================================================

#[tokio::test]
async fn test_local_source_serves_site_from_directory() {
    let dir = scratch_dir("local");
    std::fs::write(dir.join("data/posts.json"), INDEX).unwrap();
    std::fs::write(dir.join("posts/a.md"), ARTICLE).unwrap();

    let mut store = PostStore::new(Arc::new(LocalSource::new(&dir)));
    assert_eq!(store.load("/data/posts.json").await.unwrap(), 3);
    let payload = store.load_content("posts/a.md").await.unwrap();
    assert_eq!(payload.metadata["title"], "Hello Rust");

    let err = store.load_content("posts/b.md").await.unwrap_err();
    assert_eq!(
        err,
        ContentError::Fetch(FetchError::NotFound("posts/b.md".into()))
    );

    let _ = std::fs::remove_dir_all(&dir);
}
