//! # Post Store
//!
//! Owns the canonical post collection for the session and the article
//! content cache.
//!
//! ```text
//! PostStore
//! ├── fetcher: Arc<dyn ResourceFetcher>   // index + article source
//! ├── posts: Vec<Post>                    // date desc, stable on ties
//! ├── categories / tags: Vec<String>      // as declared by the index
//! └── content: Mutex<ContentCache>
//!     ├── ready: filename → payload       // never evicted
//!     └── in_flight: filename → shared fetch
//! ```
//!
//! The collection is written once by `load()` and read-only afterwards.
//! The cache is only touched by `load_content()`, and the lock is never
//! held across an await.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};

use crate::core::front_matter;
use crate::core::post::{Adjacent, ContentPayload, Post, PostIndexDocument};
use crate::fetch::{FetchError, ResourceFetcher};

// ============================================================================
// Errors
// ============================================================================

/// Why the post index could not be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The index resource could not be fetched.
    Fetch(FetchError),
    /// The index resource is not valid JSON or misses required fields.
    Parse(String),
    /// The index parsed but breaks an invariant (e.g. duplicate ids).
    Invalid(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Fetch(e) => write!(f, "failed to load post index: {e}"),
            StoreError::Parse(msg) => write!(f, "failed to parse post index: {msg}"),
            StoreError::Invalid(msg) => write!(f, "invalid post index: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Why an article's content could not be loaded. Never cached.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentError {
    Fetch(FetchError),
    /// The post has no content resource to fetch.
    MissingFilename,
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::Fetch(e) => write!(f, "failed to load article: {e}"),
            ContentError::MissingFilename => write!(f, "post has no content resource"),
        }
    }
}

impl std::error::Error for ContentError {}

impl From<FetchError> for ContentError {
    fn from(e: FetchError) -> Self {
        ContentError::Fetch(e)
    }
}

// ============================================================================
// Derived views
// ============================================================================

/// Name → count, in order of first appearance in the sorted collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(String, usize)>,
}

impl FrequencyTable {
    fn bump(&mut self, name: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((name.to_string(), 1)),
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), *c))
    }

    /// Entries by count descending; equal counts keep first-appearance order.
    pub fn by_count_desc(&self) -> Vec<(String, usize)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

/// Headline numbers for the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostsSummary {
    pub total_posts: usize,
    pub total_categories: usize,
    pub total_tags: usize,
    /// Distinct publication years, newest first.
    pub years: Vec<i32>,
}

// ============================================================================
// Store
// ============================================================================

type PendingContent = Shared<BoxFuture<'static, Result<Arc<ContentPayload>, ContentError>>>;

#[derive(Default)]
struct ContentCache {
    ready: HashMap<String, Arc<ContentPayload>>,
    in_flight: HashMap<String, PendingContent>,
}

pub struct PostStore {
    fetcher: Arc<dyn ResourceFetcher>,
    posts: Vec<Post>,
    categories: Vec<String>,
    tags: Vec<String>,
    content: Mutex<ContentCache>,
}

impl PostStore {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            fetcher,
            posts: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            content: Mutex::new(ContentCache::default()),
        }
    }

    /// Fetches and parses the index resource at `index_path`.
    ///
    /// On any failure the collection is left empty. On success posts are
    /// sorted newest first; posts sharing a date keep their file order.
    pub async fn load(&mut self, index_path: &str) -> Result<usize, StoreError> {
        self.posts.clear();
        self.categories.clear();
        self.tags.clear();

        let raw = self
            .fetcher
            .fetch_text(index_path)
            .await
            .map_err(|e| {
                warn!("Error loading posts from {}: {}", index_path, e);
                StoreError::Fetch(e)
            })?;

        let document: PostIndexDocument = serde_json::from_str(&raw).map_err(|e| {
            warn!("Error parsing post index {}: {}", index_path, e);
            StoreError::Parse(e.to_string())
        })?;

        let mut posts: Vec<Post> = document.posts.into_iter().map(Post::normalized).collect();
        check_unique_ids(&posts)?;
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        info!(
            "Loaded {} posts from {} via {}",
            posts.len(),
            index_path,
            self.fetcher.name()
        );
        self.posts = posts;
        self.categories = document.categories;
        self.tags = document.tags;
        Ok(self.posts.len())
    }

    pub fn all(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn by_category(&self, name: &str) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| p.category.as_deref() == Some(name))
            .collect()
    }

    pub fn by_tag(&self, name: &str) -> Vec<&Post> {
        self.posts.iter().filter(|p| p.has_tag(name)).collect()
    }

    /// Categories as declared by the index resource (may include unused ones).
    pub fn declared_categories(&self) -> &[String] {
        &self.categories
    }

    /// Tags as declared by the index resource (may include unused ones).
    pub fn declared_tags(&self) -> &[String] {
        &self.tags
    }

    /// Case-insensitive substring filter over title, description, category
    /// and tags. An empty keyword matches nothing.
    pub fn search(&self, keyword: &str) -> Vec<&Post> {
        if keyword.is_empty() {
            return Vec::new();
        }
        let needle = keyword.to_lowercase();
        let contains = |field: &str| field.to_lowercase().contains(&needle);

        self.posts
            .iter()
            .filter(|p| {
                contains(&p.title)
                    || p.description.as_deref().is_some_and(contains)
                    || p.category.as_deref().is_some_and(contains)
                    || p.tags.iter().any(|t| contains(t))
            })
            .collect()
    }

    /// Neighbours of `id` in the sorted collection.
    pub fn adjacent(&self, id: &str) -> Adjacent {
        let Some(index) = self.posts.iter().position(|p| p.id == id) else {
            return Adjacent::default();
        };
        Adjacent {
            prev: self.posts.get(index + 1).cloned(),
            next: index
                .checked_sub(1)
                .and_then(|i| self.posts.get(i))
                .cloned(),
        }
    }

    pub fn category_stats(&self) -> FrequencyTable {
        let mut table = FrequencyTable::default();
        for category in self.posts.iter().filter_map(|p| p.category.as_deref()) {
            table.bump(category);
        }
        table
    }

    pub fn tag_stats(&self) -> FrequencyTable {
        let mut table = FrequencyTable::default();
        for tag in self.posts.iter().flat_map(|p| p.tags.iter()) {
            table.bump(tag);
        }
        table
    }

    pub fn summary(&self) -> PostsSummary {
        let mut years: Vec<i32> = self
            .posts
            .iter()
            .map(|p| chrono::Datelike::year(&p.date))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));

        PostsSummary {
            total_posts: self.posts.len(),
            total_categories: self.category_stats().len(),
            total_tags: self.tag_stats().len(),
            years,
        }
    }

    /// Returns the parsed article behind `filename`, fetching it at most once
    /// per session.
    ///
    /// Concurrent callers for the same filename share one in-flight fetch.
    /// Failures are returned to every waiter and leave nothing in the cache,
    /// so a later call fetches again.
    pub async fn load_content(&self, filename: &str) -> Result<Arc<ContentPayload>, ContentError> {
        if filename.is_empty() {
            return Err(ContentError::MissingFilename);
        }

        let pending = {
            let mut cache = self.lock_cache();
            if let Some(hit) = cache.ready.get(filename) {
                debug!("Content cache hit: {}", filename);
                return Ok(Arc::clone(hit));
            }
            match cache.in_flight.get(filename) {
                Some(pending) => {
                    debug!("Joining in-flight fetch: {}", filename);
                    pending.clone()
                }
                None => {
                    let pending = self.fetch_content(filename);
                    cache.in_flight.insert(filename.to_string(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        let mut cache = self.lock_cache();
        if cache
            .in_flight
            .get(filename)
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            cache.in_flight.remove(filename);
        }
        match &result {
            Ok(payload) => {
                cache
                    .ready
                    .entry(filename.to_string())
                    .or_insert_with(|| Arc::clone(payload));
            }
            Err(e) => warn!("Error loading article {}: {}", filename, e),
        }
        result
    }

    /// Number of cached article payloads.
    pub fn cached_content_len(&self) -> usize {
        self.lock_cache().ready.len()
    }

    fn fetch_content(&self, filename: &str) -> PendingContent {
        let fetcher = Arc::clone(&self.fetcher);
        let filename = filename.to_string();
        async move {
            let document = fetcher.fetch_text(&filename).await?;
            Ok(Arc::new(front_matter::parse(&document)))
        }
        .boxed()
        .shared()
    }

    fn lock_cache(&self) -> MutexGuard<'_, ContentCache> {
        self.content.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn check_unique_ids(posts: &[Post]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(posts.len());
    for post in posts {
        if !seen.insert(post.id.as_str()) {
            return Err(StoreError::Invalid(format!("duplicate post id: {}", post.id)));
        }
    }
    Ok(())
}
