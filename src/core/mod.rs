//! # Core Engine
//!
//! Routing, content resolution and search for the blog.
//! It knows nothing about any specific display surface.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │          CORE           │
//!                    │     (this module)       │
//!                    │                         │
//!                    │  • Router (fragments)   │
//!                    │  • PostStore (content)  │
//!                    │  • SearchIndex (ranking)│
//!                    │                         │
//!                    │  Reads via fetch/. No   │
//!                    │  display. Returns data. │
//!                    └───────────┬─────────────┘
//!                                │ Page
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │  Terminal  │      │    HTML    │      │  Browser   │
//!     │  Gateway   │      │   export   │      │  (future)  │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`router`]: fragment → handler, navigation lifecycle
//! - [`store`]: the post collection and the article cache
//! - [`search`]: weighted fuzzy ranking, highlighting, debounce
//! - [`post`], [`front_matter`], [`format`]: data model and helpers
//! - [`config`]: settings resolution

pub mod config;
pub mod format;
pub mod front_matter;
pub mod post;
pub mod router;
pub mod search;
pub mod store;

pub use post::{Adjacent, ContentPayload, Post};
pub use router::{NavState, RenderGateway, RouteError, RouteRequest, Router};
pub use search::{SearchIndex, SearchOptions, SearchOutcome};
pub use store::{ContentError, PostStore, StoreError};
