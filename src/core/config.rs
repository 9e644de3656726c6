//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.signpost/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::router::OverlapPolicy;
use crate::core::search::{DEFAULT_MIN_MATCH_LEN, DEFAULT_THRESHOLD, SearchOptions};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SignpostConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SiteConfig {
    pub base_url: Option<String>,
    pub root_dir: Option<String>,
    pub index_path: Option<String>,
    pub title: Option<String>,
    pub about: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    pub threshold: Option<f64>,
    pub min_match_len: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RouterConfig {
    pub allow_overlap: Option<bool>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_INDEX_PATH: &str = "data/posts.json";
pub const DEFAULT_ROOT_DIR: &str = ".";
pub const DEFAULT_SITE_TITLE: &str = "My Blog";
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

const DEFAULT_ABOUT: &str = "A personal blog about code, tools and the occasional detour.";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

/// Where posts and articles are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSource {
    Http(String),
    Local(PathBuf),
}

impl fmt::Display for SiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteSource::Http(url) => write!(f, "{url}"),
            SiteSource::Local(dir) => write!(f, "{}", dir.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub source: SiteSource,
    pub index_path: String,
    pub site_title: String,
    pub about: String,
    pub search: SearchOptions,
    pub debounce: Duration,
    pub overlap: OverlapPolicy,
}

/// Values given on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub root_dir: Option<String>,
    pub index_path: Option<String>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.signpost/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".signpost").join("config.toml"))
}

/// Load config from `~/.signpost/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `SignpostConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<SignpostConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(SignpostConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<SignpostConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(SignpostConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: SignpostConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_CONTENT: &str = r#"# Signpost Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [site]
# base_url = "https://blog.example.com/"   # Or set SIGNPOST_BASE_URL; wins over root_dir
# root_dir = "."                           # Or set SIGNPOST_ROOT
# index_path = "data/posts.json"           # Or set SIGNPOST_INDEX
# title = "My Blog"
# about = "A personal blog."

# [search]
# threshold = 0.3        # Fraction of a search word that may be typos
# min_match_len = 2      # Shorter words are ignored
# debounce_ms = 200      # Pause in typing before /find runs
# limit = 20

# [router]
# allow_overlap = false  # true: a slow page may replace a newer one
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_CONTENT) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &SignpostConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading env vars through `env`.
pub fn resolve_with_env(
    config: &SignpostConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Source: at each level a URL wins over a directory
    let source = pick_source(cli.base_url.clone(), cli.root_dir.clone())
        .or_else(|| pick_source(env("SIGNPOST_BASE_URL"), env("SIGNPOST_ROOT")))
        .or_else(|| pick_source(config.site.base_url.clone(), config.site.root_dir.clone()))
        .unwrap_or_else(|| SiteSource::Local(PathBuf::from(DEFAULT_ROOT_DIR)));

    // Index path: CLI → env → config → default
    let index_path = cli
        .index_path
        .clone()
        .or_else(|| env("SIGNPOST_INDEX"))
        .or_else(|| config.site.index_path.clone())
        .unwrap_or_else(|| DEFAULT_INDEX_PATH.to_string());

    let threshold = match config.search.threshold {
        Some(t) if (0.0..=1.0).contains(&t) => t,
        Some(t) => {
            warn!("Ignoring search threshold {} outside 0.0..=1.0", t);
            DEFAULT_THRESHOLD
        }
        None => DEFAULT_THRESHOLD,
    };

    let overlap = if config.router.allow_overlap.unwrap_or(false) {
        OverlapPolicy::LastToFinish
    } else {
        OverlapPolicy::LatestWins
    };

    ResolvedConfig {
        source,
        index_path,
        site_title: config
            .site
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        about: config
            .site
            .about
            .clone()
            .unwrap_or_else(|| DEFAULT_ABOUT.to_string()),
        search: SearchOptions {
            threshold,
            min_match_len: config.search.min_match_len.unwrap_or(DEFAULT_MIN_MATCH_LEN),
            limit: config.search.limit,
        },
        debounce: Duration::from_millis(config.search.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)),
        overlap,
    }
}

fn pick_source(base_url: Option<String>, root_dir: Option<String>) -> Option<SiteSource> {
    base_url
        .map(SiteSource::Http)
        .or_else(|| root_dir.map(|dir| SiteSource::Local(PathBuf::from(dir))))
}
