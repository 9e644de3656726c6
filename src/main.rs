use std::fs::File;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use tokio::io::BufReader;

use signpost::core::config::{self, CliOverrides, SignpostConfig, SiteSource};
use signpost::core::router::{RenderGateway, Router};
use signpost::core::search::SearchIndex;
use signpost::core::store::PostStore;
use signpost::fetch::{HttpSource, LocalSource, ResourceFetcher};
use signpost::site::{Page, Site, register_routes};
use signpost::terminal::{self, OutputMode, TerminalGateway};

#[derive(Parser)]
#[command(name = "signpost", about = "Browse a static blog from the terminal")]
struct Args {
    /// Base URL the posts index and articles are fetched from
    #[arg(long)]
    base_url: Option<String>,

    /// Directory the posts index and articles are read from
    #[arg(long)]
    root: Option<String>,

    /// Path of the posts index, relative to the base URL or root
    #[arg(long)]
    index: Option<String>,

    /// Print pages as HTML instead of text
    #[arg(long)]
    html: bool,

    /// Fragment to open first, e.g. "#/tags"
    #[arg(default_value = "#/")]
    fragment: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to signpost.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("signpost.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        SignpostConfig::default()
    });
    let cli = CliOverrides {
        base_url: args.base_url,
        root_dir: args.root,
        index_path: args.index,
    };
    let resolved = config::resolve(&file_config, &cli);
    info!("Signpost starting up, reading from {}", resolved.source);

    let fetcher: Arc<dyn ResourceFetcher> = match &resolved.source {
        SiteSource::Http(url) => Arc::new(HttpSource::new(url.as_str())),
        SiteSource::Local(dir) => Arc::new(LocalSource::new(dir.clone())),
    };

    // A missing index still gives a working site, just an empty one.
    let mut store = PostStore::new(fetcher);
    match store.load(&resolved.index_path).await {
        Ok(count) => info!("Loaded {} posts", count),
        Err(e) => {
            error!("Failed to load posts: {}", e);
            eprintln!("Failed to load posts from {}: {}", resolved.source, e);
        }
    }
    let store = Arc::new(store);
    let index = Arc::new(SearchIndex::build(store.all()));

    let site = Arc::new(
        Site::new(store, index)
            .with_title(resolved.site_title.clone())
            .with_about(resolved.about.clone())
            .with_search_options(resolved.search),
    );

    let mode = if args.html {
        OutputMode::Html
    } else {
        OutputMode::Text
    };
    let gateway = Arc::new(TerminalGateway::stdout(mode).with_site_title(resolved.site_title));
    let router = Arc::new(
        Router::new(Arc::clone(&gateway) as Arc<dyn RenderGateway<Page>>)
            .with_policy(resolved.overlap),
    );
    register_routes(&router, Arc::clone(&site));

    let listener = router.listen(&args.fragment);
    // First page renders before any input is taken.
    let first = router.settled().await;
    info!("First page settled: {:?}", first);
    let input = BufReader::new(tokio::io::stdin());
    let result = terminal::run(input, router, site, gateway, resolved.debounce).await;
    listener.abort();
    result
}
