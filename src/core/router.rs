//! # Hash Router
//!
//! Maps URL fragments to handlers and drives the navigation lifecycle.
//!
//! ```text
//! navigate("/tag/C%2B%2B")
//!   │  fragment changed? ── no ──► nothing happens
//!   ▼  yes: event on the navigation channel
//! listen loop ── spawns ──► handle_navigation("#/tag/C%2B%2B")
//!                             │ highlight nav, show loading   (gateway)
//!                             │ resolve: static exact > first parameterized
//!                             │ await handler(params, query)
//!                             ▼
//!               Ok ─► Rendered      Err / panic / no match ─► NotFound
//! ```
//!
//! ## Overlapping navigations
//!
//! Every navigation spawns its own handler; nothing is queued or cancelled.
//! By default each navigation takes a generation number and a handler that
//! finishes after a newer navigation started is discarded, so the display
//! always reflects the latest fragment. [`OverlapPolicy::LastToFinish`]
//! renders every completed handler instead.

pub mod fragment;
pub mod pattern;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub use fragment::{QueryParams, nav_is_active, parse_query, path_of, query_of};
pub use pattern::{PathParams, RoutePattern};

// ============================================================================
// Errors and lifecycle types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No pattern matches the path.
    NotFound(String),
    /// The handler gave up. The router treats it like a missing route.
    Handler(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound(path) => write!(f, "no route for {path}"),
            RouteError::Handler(msg) => write!(f, "route handler failed: {msg}"),
        }
    }
}

impl std::error::Error for RouteError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Idle,
    Loading,
    Rendered,
    NotFound,
}

/// How a single call to [`Router::handle_navigation`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Rendered,
    NotFound,
    /// A newer navigation started while the handler ran; its output was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Only the latest navigation may touch the display.
    #[default]
    LatestWins,
    /// Whatever finishes last is shown, even if it is stale.
    LastToFinish,
}

/// What a handler is invoked with. The latest one is kept as the current route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteRequest {
    pub path: String,
    /// The pattern that matched, as registered.
    pub pattern: String,
    pub params: PathParams,
    pub query: QueryParams,
}

impl RouteRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Produces the content description for a matched route.
#[async_trait]
pub trait RouteHandler<O>: Send + Sync {
    async fn handle(&self, request: RouteRequest) -> Result<O, RouteError>;
}

#[async_trait]
impl<O, F, Fut> RouteHandler<O> for F
where
    O: Send + 'static,
    F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, RouteError>> + Send + 'static,
{
    async fn handle(&self, request: RouteRequest) -> Result<O, RouteError> {
        (self)(request).await
    }
}

/// The display surface. The router never renders anything itself.
pub trait RenderGateway<O>: Send + Sync {
    /// Called first on every navigation with the new path.
    fn highlight_nav(&self, _path: &str) {}

    fn show_loading(&self);

    fn render(&self, output: O);

    fn show_not_found(&self, path: &str);
}

/// A resolved path: the handler to run and its bound parameters.
pub struct RouteMatch<O> {
    pub pattern: String,
    pub params: PathParams,
    handler: Arc<dyn RouteHandler<O>>,
}

impl<O> fmt::Debug for RouteMatch<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Router
// ============================================================================

struct Route<O> {
    pattern: RoutePattern,
    handler: Arc<dyn RouteHandler<O>>,
}

#[derive(Default)]
struct NavSlot {
    fragment: String,
    current: Option<RouteRequest>,
    generation: u64,
}

pub struct Router<O> {
    routes: RwLock<Vec<Route<O>>>,
    gateway: Arc<dyn RenderGateway<O>>,
    policy: OverlapPolicy,
    slot: Mutex<NavSlot>,
    events_tx: mpsc::UnboundedSender<String>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    state_tx: watch::Sender<NavState>,
}

impl<O: Send + 'static> Router<O> {
    pub fn new(gateway: Arc<dyn RenderGateway<O>>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            routes: RwLock::new(Vec::new()),
            gateway,
            policy: OverlapPolicy::default(),
            slot: Mutex::new(NavSlot::default()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            state_tx: watch::Sender::new(NavState::Idle),
        }
    }

    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Adds a route. Registering the same pattern string again replaces the
    /// handler but keeps the original position in the table.
    pub fn register<H>(&self, pattern: &str, handler: H)
    where
        H: RouteHandler<O> + 'static,
    {
        let handler: Arc<dyn RouteHandler<O>> = Arc::new(handler);
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        match routes.iter_mut().find(|r| r.pattern.source() == pattern) {
            Some(existing) => {
                debug!("Replacing handler for {}", pattern);
                existing.handler = handler;
            }
            None => routes.push(Route {
                pattern: RoutePattern::parse(pattern),
                handler,
            }),
        }
    }

    /// Number of registered patterns.
    pub fn route_count(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Finds the handler for `path`. A static pattern equal to the path
    /// always wins; otherwise the first registered parameterized pattern
    /// that binds wins.
    pub fn resolve(&self, path: &str) -> Result<RouteMatch<O>, RouteError> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);

        let exact = routes
            .iter()
            .find(|r| r.pattern.is_static() && r.pattern.source() == path);
        if let Some(route) = exact {
            return Ok(RouteMatch {
                pattern: route.pattern.source().to_string(),
                params: PathParams::new(),
                handler: Arc::clone(&route.handler),
            });
        }

        routes
            .iter()
            .filter(|r| !r.pattern.is_static())
            .find_map(|r| {
                r.pattern.matches(path).map(|params| RouteMatch {
                    pattern: r.pattern.source().to_string(),
                    params,
                    handler: Arc::clone(&r.handler),
                })
            })
            .ok_or_else(|| RouteError::NotFound(path.to_string()))
    }

    /// Sets the fragment to `path` and queues a fragment-change event.
    /// Returns immediately. Setting the fragment it already has is a no-op.
    pub fn navigate(&self, path: &str) {
        let fragment = as_fragment(path);
        {
            let mut slot = self.lock_slot();
            if slot.fragment == fragment {
                debug!("Already at {}", fragment);
                return;
            }
            slot.fragment = fragment.clone();
        }
        if self.events_tx.send(fragment).is_err() {
            warn!("Navigation listener is gone; event dropped");
        }
    }

    /// Starts listening for fragment changes. `initial` is navigated to as a
    /// page load would be, on its own task like every change event after it,
    /// so a slow first page never holds up later navigations.
    ///
    /// Only the first call does anything; later calls return a finished task.
    pub fn listen(self: &Arc<Self>, initial: &str) -> JoinHandle<()> {
        let Some(mut events) = self
            .events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("Router is already listening");
            return tokio::spawn(async {});
        };

        let initial = as_fragment(initial);
        self.lock_slot().fragment = initial.clone();

        let router = Arc::clone(self);
        tokio::spawn(async move {
            {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    router.handle_navigation(&initial).await;
                });
            }
            while let Some(fragment) = events.recv().await {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    router.handle_navigation(&fragment).await;
                });
            }
            debug!("Navigation channel closed");
        })
    }

    /// Runs one navigation for `fragment` to completion.
    pub async fn handle_navigation(&self, fragment: &str) -> NavOutcome {
        let path = path_of(fragment).to_string();
        let query = query_of(fragment);

        let generation = {
            let mut slot = self.lock_slot();
            slot.generation += 1;
            self.state_tx.send_replace(NavState::Loading);
            slot.generation
        };

        self.gateway.highlight_nav(&path);
        self.gateway.show_loading();

        let route = match self.resolve(&path) {
            Ok(route) => route,
            Err(e) => {
                debug!("{}", e);
                return self.finish(generation, Err(path));
            }
        };

        let request = RouteRequest {
            path: path.clone(),
            pattern: route.pattern,
            params: route.params,
            query,
        };
        info!("Navigating to {} via {}", path, request.pattern);
        self.lock_slot().current = Some(request.clone());

        let result = AssertUnwindSafe(route.handler.handle(request))
            .catch_unwind()
            .await;

        let output = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                warn!("Route handler error on {}: {}", path, e);
                Err(path)
            }
            Err(panic) => {
                warn!("Route handler panicked on {}: {}", path, panic_message(&*panic));
                Err(path)
            }
        };
        self.finish(generation, output)
    }

    fn finish(&self, generation: u64, output: Result<O, String>) -> NavOutcome {
        let slot = self.lock_slot();
        if self.policy == OverlapPolicy::LatestWins && slot.generation != generation {
            debug!(
                "Discarding navigation {} (latest is {})",
                generation, slot.generation
            );
            return NavOutcome::Discarded;
        }

        match output {
            Ok(output) => {
                self.state_tx.send_replace(NavState::Rendered);
                drop(slot);
                self.gateway.render(output);
                NavOutcome::Rendered
            }
            Err(path) => {
                self.state_tx.send_replace(NavState::NotFound);
                drop(slot);
                self.gateway.show_not_found(&path);
                NavOutcome::NotFound
            }
        }
    }

    /// The fragment last set by `navigate` or `listen`.
    pub fn fragment(&self) -> String {
        self.lock_slot().fragment.clone()
    }

    pub fn state(&self) -> NavState {
        *self.state_tx.borrow()
    }

    /// Waits until the display shows a finished navigation, then returns
    /// its state. Returns at once if one is already shown.
    pub async fn settled(&self) -> NavState {
        let mut states = self.state_tx.subscribe();
        match states
            .wait_for(|state| matches!(state, NavState::Rendered | NavState::NotFound))
            .await
        {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    pub fn current_route(&self) -> Option<RouteRequest> {
        self.lock_slot().current.clone()
    }

    fn lock_slot(&self) -> MutexGuard<'_, NavSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn as_fragment(path: &str) -> String {
    if path.starts_with('#') {
        path.to_string()
    } else {
        format!("#{path}")
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{GatewayEvent, RecordingGateway};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    fn router() -> (Arc<RecordingGateway<String>>, Router<String>) {
        let gateway = Arc::new(RecordingGateway::new());
        (gateway.clone(), Router::new(gateway))
    }

    fn reply(text: &'static str) -> impl RouteHandler<String> {
        move |_req: RouteRequest| async move { Ok::<_, RouteError>(text.to_string()) }
    }

    fn echo_param(name: &'static str) -> impl RouteHandler<String> {
        move |req: RouteRequest| async move {
            Ok::<_, RouteError>(req.param(name).unwrap_or_default().to_string())
        }
    }

    async fn exploding(_req: RouteRequest) -> Result<String, RouteError> {
        panic!("handler exploded")
    }

    #[test]
    fn test_exact_static_beats_parameterized() {
        let (_, router) = router();
        router.register("/tag/:name", reply("param"));
        router.register("/tag/all", reply("static"));

        let m = router.resolve("/tag/all").unwrap();
        assert_eq!(m.pattern, "/tag/all");
        assert!(m.params.is_empty());

        let m = router.resolve("/tag/rust").unwrap();
        assert_eq!(m.pattern, "/tag/:name");
        assert_eq!(m.params["name"], "rust");
    }

    #[test]
    fn test_first_registered_parameterized_wins() {
        let (_, router) = router();
        router.register("/post/:id", reply("first"));
        router.register("/post/:slug", reply("second"));
        let m = router.resolve("/post/x").unwrap();
        assert_eq!(m.pattern, "/post/:id");
    }

    #[test]
    fn test_reregistering_keeps_position() {
        let (_, router) = router();
        router.register("/a/:x", reply("one"));
        router.register("/a/:y", reply("two"));
        router.register("/a/:x", reply("three"));
        assert_eq!(router.route_count(), 2);
        assert_eq!(router.resolve("/a/1").unwrap().pattern, "/a/:x");
    }

    #[test]
    fn test_segment_count_mismatch_is_not_found() {
        let (_, router) = router();
        router.register("/tag/:name", reply("tag"));
        assert_eq!(
            router.resolve("/tag/a/b").unwrap_err(),
            RouteError::NotFound("/tag/a/b".into())
        );
        assert!(router.resolve("/tag/").is_ok());
    }

    #[tokio::test]
    async fn test_navigation_renders_decoded_param() {
        let (gateway, router) = router();
        router.register("/tag/:name", echo_param("name"));

        let outcome = router.handle_navigation("#/tag/C%2B%2B").await;
        assert_eq!(outcome, NavOutcome::Rendered);
        assert_eq!(router.state(), NavState::Rendered);
        assert_eq!(
            gateway.events(),
            vec![
                GatewayEvent::Highlight("/tag/C%2B%2B".into()),
                GatewayEvent::Loading,
                GatewayEvent::Render("C++".into()),
            ]
        );
        let current = router.current_route().unwrap();
        assert_eq!(current.params["name"], "C++");
    }

    #[tokio::test]
    async fn test_query_reaches_handler() {
        let (gateway, router) = router();
        router.register("/search", |req: RouteRequest| async move {
            Ok::<_, RouteError>(format!("{}|{}", req.query("q").unwrap_or("-"), req.query.len()))
        });
        router.handle_navigation("#/search?q=hash%20router&page=").await;
        assert_eq!(gateway.rendered(), vec!["hash router|2".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_path_shows_not_found() {
        let (gateway, router) = router();
        router.register("/", reply("home"));
        let outcome = router.handle_navigation("#/nowhere").await;
        assert_eq!(outcome, NavOutcome::NotFound);
        assert_eq!(router.state(), NavState::NotFound);
        assert_eq!(
            gateway.events().last(),
            Some(&GatewayEvent::NotFound("/nowhere".into()))
        );
        assert!(router.current_route().is_none());
    }

    #[tokio::test]
    async fn test_empty_fragment_resolves_root() {
        let (gateway, router) = router();
        router.register("/", reply("home"));
        router.handle_navigation("").await;
        assert_eq!(gateway.rendered(), vec!["home".to_string()]);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_not_found() {
        let (gateway, router) = router();
        router.register("/broken", |_req: RouteRequest| async move {
            Err::<String, _>(RouteError::Handler("boom".into()))
        });
        assert_eq!(router.handle_navigation("#/broken").await, NavOutcome::NotFound);
        assert!(gateway.rendered().is_empty());
        // The match itself still becomes the current route.
        assert_eq!(router.current_route().unwrap().path, "/broken");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_not_found() {
        let (gateway, router) = router();
        router.register("/panic", exploding);
        assert_eq!(router.handle_navigation("#/panic").await, NavOutcome::NotFound);
        assert_eq!(
            gateway.events().last(),
            Some(&GatewayEvent::NotFound("/panic".into()))
        );
    }

    fn gated(gate: Arc<Notify>, text: &'static str) -> impl RouteHandler<String> {
        move |_req: RouteRequest| {
            let gate = Arc::clone(&gate);
            async move {
                gate.notified().await;
                Ok::<_, RouteError>(text.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_stale_handler_output_is_discarded() {
        let (gateway, router) = router();
        let gate = Arc::new(Notify::new());
        router.register("/slow", gated(gate.clone(), "slow"));
        router.register("/fast", reply("fast"));

        let (slow, fast) = tokio::join!(router.handle_navigation("#/slow"), async {
            let outcome = router.handle_navigation("#/fast").await;
            gate.notify_one();
            outcome
        });

        assert_eq!(fast, NavOutcome::Rendered);
        assert_eq!(slow, NavOutcome::Discarded);
        assert_eq!(gateway.rendered(), vec!["fast".to_string()]);
        assert_eq!(router.state(), NavState::Rendered);
        assert_eq!(router.current_route().unwrap().path, "/fast");
    }

    #[tokio::test]
    async fn test_last_to_finish_policy_renders_stale_output() {
        let gateway = Arc::new(RecordingGateway::new());
        let router: Router<String> =
            Router::new(gateway.clone()).with_policy(OverlapPolicy::LastToFinish);
        let gate = Arc::new(Notify::new());
        router.register("/slow", gated(gate.clone(), "slow"));
        router.register("/fast", reply("fast"));

        tokio::join!(router.handle_navigation("#/slow"), async {
            router.handle_navigation("#/fast").await;
            gate.notify_one();
        });

        assert_eq!(gateway.rendered(), vec!["fast".to_string(), "slow".to_string()]);
    }

    #[tokio::test]
    async fn test_navigate_to_current_fragment_emits_nothing() {
        let (gateway, router) = router();
        let router = Arc::new(router);
        router.register("/", reply("home"));
        router.register("/about", reply("about"));

        let listener = router.listen("");
        // Initial load renders the root.
        gateway.wait_for_renders(1).await;

        router.navigate("/about");
        gateway.wait_for_renders(2).await;
        assert_eq!(router.fragment(), "#/about");

        router.navigate("/about");
        router.navigate("#/about");
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(gateway.rendered(), vec!["home".to_string(), "about".to_string()]);

        listener.abort();
    }

    /// Like `gated`, but raises `done` once its output has been produced.
    fn gated_with_flag(
        gate: Arc<Notify>,
        done: Arc<AtomicBool>,
        text: &'static str,
    ) -> impl RouteHandler<String> {
        move |_req: RouteRequest| {
            let gate = Arc::clone(&gate);
            let done = Arc::clone(&done);
            async move {
                gate.notified().await;
                done.store(true, Ordering::SeqCst);
                Ok::<_, RouteError>(text.to_string())
            }
        }
    }

    async fn wait_until(flag: &AtomicBool) {
        for _ in 0..1000 {
            if flag.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(flag.load(Ordering::SeqCst), "flag never raised");
        // Let the navigation that produced it reach `finish`.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_navigation_overtakes_pending_initial_load() {
        let (gateway, router) = router();
        let router = Arc::new(router);
        let gate = Arc::new(Notify::new());
        let slow_done = Arc::new(AtomicBool::new(false));
        router.register("/slow", gated_with_flag(gate.clone(), slow_done.clone(), "slow"));
        router.register("/fast", reply("fast"));

        let listener = router.listen("#/slow");
        router.navigate("/fast");

        // The initial page is still waiting on its gate.
        gateway.wait_for_renders(1).await;
        assert_eq!(gateway.rendered(), vec!["fast".to_string()]);
        assert_eq!(router.settled().await, NavState::Rendered);
        assert!(!slow_done.load(Ordering::SeqCst));

        gate.notify_one();
        wait_until(&slow_done).await;
        assert_eq!(gateway.rendered(), vec!["fast".to_string()]);
        assert_eq!(router.current_route().unwrap().path, "/fast");

        listener.abort();
    }

    #[tokio::test]
    async fn test_last_to_finish_renders_late_initial_load() {
        let gateway = Arc::new(RecordingGateway::new());
        let router: Arc<Router<String>> =
            Arc::new(Router::new(gateway.clone()).with_policy(OverlapPolicy::LastToFinish));
        let gate = Arc::new(Notify::new());
        let slow_done = Arc::new(AtomicBool::new(false));
        router.register("/slow", gated_with_flag(gate.clone(), slow_done.clone(), "slow"));
        router.register("/fast", reply("fast"));

        let listener = router.listen("#/slow");
        router.navigate("/fast");
        gateway.wait_for_renders(1).await;

        gate.notify_one();
        gateway.wait_for_renders(2).await;
        assert_eq!(gateway.rendered(), vec!["fast".to_string(), "slow".to_string()]);

        listener.abort();
    }

    #[tokio::test]
    async fn test_settled_reports_not_found() {
        let (_, router) = router();
        let router = Arc::new(router);
        router.register("/", reply("home"));

        let listener = router.listen("#/missing");
        assert_eq!(router.settled().await, NavState::NotFound);

        listener.abort();
    }
}
