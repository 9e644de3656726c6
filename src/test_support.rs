//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::core::post::{Post, PostIndexDocument};
use crate::core::router::RenderGateway;
use crate::core::store::PostStore;
use crate::fetch::{FetchError, ResourceFetcher};

/// Four posts in file order a, b, c, d. "b" and "c" share a date, so the
/// sorted order is d, b, c, a.
pub const SAMPLE_INDEX: &str = r#"{
  "posts": [
    {
      "id": "a",
      "title": "Hello Rust",
      "date": "2023-05-01",
      "category": "Rust",
      "tags": ["rust"],
      "description": "First steps with the borrow checker",
      "filename": "posts/a.md",
      "readTime": 3
    },
    {
      "id": "b",
      "title": "Modern C++ tips",
      "date": "2024-02-10",
      "category": "Systems",
      "tags": ["C++", "systems"],
      "description": "Smart pointers and move semantics",
      "filename": "posts/b.md"
    },
    {
      "id": "c",
      "title": "Concurrency in Go",
      "date": "2024-02-10",
      "category": "Go Lang",
      "tags": ["go"],
      "description": "Channels and goroutines in practice",
      "filename": "posts/c.md",
      "readTime": 7
    },
    {
      "id": "d",
      "title": "Building a hash router",
      "date": "2024-06-01T09:30:00+08:00",
      "category": "Rust",
      "tags": ["rust", "web"],
      "description": "Matching fragments to handlers",
      "filename": "posts/d.md",
      "readTime": 5
    }
  ],
  "categories": ["Rust", "Systems", "Go Lang"],
  "tags": ["rust", "C++", "systems", "go", "web"]
}"#;

/// The sample posts, normalized and sorted the way the store sorts them.
pub fn sample_posts() -> Vec<Post> {
    let doc: PostIndexDocument = serde_json::from_str(SAMPLE_INDEX).unwrap();
    let mut posts: Vec<Post> = doc.posts.into_iter().map(Post::normalized).collect();
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    posts
}

/// A store loaded from `index` served at `data/posts.json`.
pub async fn loaded_store(index: &str) -> PostStore {
    let fetcher = Arc::new(MemoryFetcher::new().with("data/posts.json", index));
    let mut store = PostStore::new(fetcher);
    store.load("data/posts.json").await.unwrap();
    store
}

// ============================================================================
// In-memory fetcher
// ============================================================================

/// Serves resources from a map and counts fetches per path.
#[derive(Default)]
pub struct MemoryFetcher {
    files: Mutex<HashMap<String, String>>,
    counts: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &str, body: &str) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: &str, body: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), body.to_string());
    }

    pub fn fetch_count(&self, path: &str) -> usize {
        self.counts.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    /// Makes the next fetch of `path` wait until the returned gate is notified.
    pub fn gate(&self, path: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(path.to_string(), Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default() += 1;

        let gate = self.gates.lock().unwrap().remove(path);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(path.to_string()))
    }
}

// ============================================================================
// Recording gateway
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent<O> {
    Highlight(String),
    Loading,
    Render(O),
    NotFound(String),
}

/// Records every gateway call in order.
pub struct RecordingGateway<O> {
    events: Mutex<Vec<GatewayEvent<O>>>,
}

impl<O: Clone> RecordingGateway<O> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<GatewayEvent<O>> {
        self.events.lock().unwrap().clone()
    }

    pub fn rendered(&self) -> Vec<O> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                GatewayEvent::Render(output) => Some(output.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn not_found_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, GatewayEvent::NotFound(_)))
            .count()
    }

    /// Yields to other tasks until `n` outputs have been rendered.
    pub async fn wait_for_renders(&self, n: usize) {
        for _ in 0..1_000 {
            if self.rendered().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} renders, got {}", self.rendered().len());
    }
}

impl<O: Clone + Send> RenderGateway<O> for RecordingGateway<O> {
    fn highlight_nav(&self, path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(GatewayEvent::Highlight(path.to_string()));
    }

    fn show_loading(&self) {
        self.events.lock().unwrap().push(GatewayEvent::Loading);
    }

    fn render(&self, output: O) {
        self.events.lock().unwrap().push(GatewayEvent::Render(output));
    }

    fn show_not_found(&self, path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(GatewayEvent::NotFound(path.to_string()));
    }
}
