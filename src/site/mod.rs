//! # Site
//!
//! The blog's pages, expressed as route handlers over the store and the
//! search index. Handlers return a [`Page`]: plain data describing what to
//! show. Turning it into pixels, text or HTML is the gateway's job.
//!
//! ```text
//! /                 → Home            all posts
//! /timeline         → Timeline        grouped by year and month
//! /categories       → Categories      stats, most used first
//! /category/:name   → PostList        posts in one category
//! /tags             → Tags            stats, most used first
//! /tag/:name        → PostList        posts with one tag
//! /post/:id         → Article | PostNotFound | LoadFailed
//! /about            → About
//! /search?q=        → SearchResults   substring match
//! ```

pub mod html;
pub mod markdown;

use std::sync::Arc;

use log::debug;

use crate::core::format::{YearGroup, estimate_read_time, group_by_month};
use crate::core::post::{Adjacent, ContentPayload, Post};
use crate::core::router::{RouteError, RouteRequest, Router};
use crate::core::search::{SearchIndex, SearchOptions, SearchOutcome};
use crate::core::store::{PostStore, PostsSummary};

/// Navigation menu entries: label and route.
pub const NAV_LINKS: [(&str, &str); 5] = [
    ("Home", "/"),
    ("Timeline", "/timeline"),
    ("Categories", "/categories"),
    ("Tags", "/tags"),
    ("About", "/about"),
];

/// Why a list of posts is being shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListKind {
    Category(String),
    Tag(String),
}

/// Content description handed to the render gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Home {
        posts: Vec<Post>,
    },
    Timeline {
        years: Vec<YearGroup>,
        summary: PostsSummary,
    },
    Categories {
        entries: Vec<(String, usize)>,
    },
    Tags {
        entries: Vec<(String, usize)>,
    },
    PostList {
        kind: ListKind,
        posts: Vec<Post>,
    },
    Article {
        post: Post,
        content: Arc<ContentPayload>,
        read_time: u32,
        adjacent: Adjacent,
    },
    PostNotFound {
        id: String,
    },
    LoadFailed {
        post: Post,
        reason: String,
    },
    About {
        text: String,
        summary: PostsSummary,
    },
    SearchResults {
        keyword: String,
        posts: Vec<Post>,
    },
}

impl Page {
    /// Window/document title for this page.
    pub fn document_title(&self, site_title: &str) -> String {
        match self {
            Page::Home { .. } => format!("{site_title} - Home"),
            Page::Timeline { .. } => format!("Timeline - {site_title}"),
            Page::Categories { .. } => format!("Categories - {site_title}"),
            Page::Tags { .. } => format!("Tags - {site_title}"),
            Page::PostList {
                kind: ListKind::Category(name) | ListKind::Tag(name),
                ..
            } => format!("{name} - {site_title}"),
            Page::Article { post, .. } | Page::LoadFailed { post, .. } => {
                format!("{} - {site_title}", post.title)
            }
            Page::PostNotFound { .. } => format!("Not found - {site_title}"),
            Page::About { .. } => format!("About - {site_title}"),
            Page::SearchResults { keyword, .. } => format!("Search: {keyword} - {site_title}"),
        }
    }
}

/// Read-side services shared by every handler.
pub struct Site {
    store: Arc<PostStore>,
    index: Arc<SearchIndex>,
    title: String,
    about: String,
    search_options: SearchOptions,
}

impl Site {
    pub fn new(store: Arc<PostStore>, index: Arc<SearchIndex>) -> Self {
        Self {
            store,
            index,
            title: crate::core::config::DEFAULT_SITE_TITLE.to_string(),
            about: String::new(),
            search_options: SearchOptions::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = about.into();
        self
    }

    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search_options = options;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    pub fn home(&self) -> Page {
        Page::Home {
            posts: self.store.all().to_vec(),
        }
    }

    pub fn timeline(&self) -> Page {
        Page::Timeline {
            years: group_by_month(self.store.all()),
            summary: self.store.summary(),
        }
    }

    pub fn categories(&self) -> Page {
        Page::Categories {
            entries: self.store.category_stats().by_count_desc(),
        }
    }

    pub fn tags(&self) -> Page {
        Page::Tags {
            entries: self.store.tag_stats().by_count_desc(),
        }
    }

    pub fn category(&self, name: &str) -> Page {
        Page::PostList {
            kind: ListKind::Category(name.to_string()),
            posts: self.store.by_category(name).into_iter().cloned().collect(),
        }
    }

    pub fn tag(&self, name: &str) -> Page {
        Page::PostList {
            kind: ListKind::Tag(name.to_string()),
            posts: self.store.by_tag(name).into_iter().cloned().collect(),
        }
    }

    /// Unknown ids and unreadable content are pages of their own, not errors.
    pub async fn article(&self, id: &str) -> Page {
        let Some(post) = self.store.by_id(id).cloned() else {
            return Page::PostNotFound { id: id.to_string() };
        };

        match self.store.load_content(&post.filename).await {
            Ok(content) => {
                let read_time = post
                    .read_time
                    .unwrap_or_else(|| estimate_read_time(&content.content));
                Page::Article {
                    adjacent: self.store.adjacent(id),
                    post,
                    content,
                    read_time,
                }
            }
            Err(e) => Page::LoadFailed {
                post,
                reason: e.to_string(),
            },
        }
    }

    pub fn about(&self) -> Page {
        Page::About {
            text: self.about.clone(),
            summary: self.store.summary(),
        }
    }

    /// Substring search, as linked from `/search?q=`. No keyword, no results.
    pub fn search(&self, keyword: &str) -> Page {
        Page::SearchResults {
            keyword: keyword.to_string(),
            posts: self.store.search(keyword).into_iter().cloned().collect(),
        }
    }

    /// Ranked fuzzy search over the index.
    pub fn find(&self, keyword: &str) -> SearchOutcome {
        self.index.query(keyword, &self.search_options)
    }
}

/// Registers every site route on `router`.
pub fn register_routes(router: &Router<Page>, site: Arc<Site>) {
    // Synchronous pages: build the page up front, hand back a ready future.
    fn route<F>(
        site: &Arc<Site>,
        build: F,
    ) -> impl Fn(RouteRequest) -> PageFuture + Send + Sync + 'static
    where
        F: Fn(&Site, &RouteRequest) -> Page + Send + Sync + 'static,
    {
        let site = Arc::clone(site);
        move |request: RouteRequest| -> PageFuture {
            let page = build(&site, &request);
            Box::pin(async move { Ok(page) })
        }
    }

    router.register("/", route(&site, |site, _| site.home()));
    router.register("/timeline", route(&site, |site, _| site.timeline()));
    router.register("/categories", route(&site, |site, _| site.categories()));
    router.register(
        "/category/:name",
        route(&site, |site, req| site.category(req.param("name").unwrap_or_default())),
    );
    router.register("/tags", route(&site, |site, _| site.tags()));
    router.register(
        "/tag/:name",
        route(&site, |site, req| site.tag(req.param("name").unwrap_or_default())),
    );

    let article_site = Arc::clone(&site);
    router.register("/post/:id", move |request: RouteRequest| {
        let site = Arc::clone(&article_site);
        async move {
            match request.param("id") {
                Some(id) => Ok(site.article(id).await),
                None => Err(RouteError::Handler("missing post id".to_string())),
            }
        }
    });

    router.register("/about", route(&site, |site, _| site.about()));
    router.register(
        "/search",
        route(&site, |site, req| site.search(req.query("q").unwrap_or_default())),
    );
    debug!("Registered {} site routes", router.route_count());
}

type PageFuture = std::pin::Pin<Box<dyn Future<Output = Result<Page, RouteError>> + Send>>;
