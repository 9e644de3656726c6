//! # Terminal Adapter
//!
//! Presents the site on a terminal. [`TerminalGateway`] is the router's
//! render gateway: it writes each page either as styled text or, in export
//! mode, as the HTML the browser shell would show. [`run`] is the line-based
//! driver that feeds fragments to the router.
//!
//! ```text
//! stdin line ──► Command
//!                  ├─ "#/tags", "/post/x", "about" ─► router.navigate
//!                  ├─ "/find rust"                 ─► Debouncer ─► site.find ─► print_search
//!                  ├─ "/help"                      ─► usage
//!                  └─ "/quit" or EOF               ─► stop
//! ```
//!
//! This is the only module that knows about crossterm.

pub mod markdown;
pub mod view;

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossterm::style::Stylize;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::core::router::{RenderGateway, Router};
use crate::core::search::{Debouncer, SearchOutcome};
use crate::site::{Page, Site, html};
use view::Layout;

const FALLBACK_WIDTH: usize = 80;
const MAX_WIDTH: usize = 100;

const HELP: [&str; 5] = [
    "Commands:",
    "  #/path or /path   open a page, e.g. #/tags or /post/hello",
    "  /find <keyword>   search titles, descriptions, categories and tags",
    "  /help             show this help",
    "  /quit             exit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Html,
}

/// Text width to lay pages out in, from the attached terminal if any.
pub fn terminal_width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) if cols > 0 => usize::from(cols).min(MAX_WIDTH),
        _ => FALLBACK_WIDTH,
    }
}

pub struct TerminalGateway {
    out: Mutex<Box<dyn Write + Send>>,
    mode: OutputMode,
    layout: Layout,
    site_title: String,
}

impl TerminalGateway {
    pub fn new(out: Box<dyn Write + Send>, mode: OutputMode, layout: Layout) -> Self {
        Self {
            out: Mutex::new(out),
            mode,
            layout,
            site_title: String::new(),
        }
    }

    /// Gateway on stdout, coloured unless exporting HTML.
    pub fn stdout(mode: OutputMode) -> Self {
        let layout = Layout {
            width: terminal_width(),
            color: mode == OutputMode::Text,
        };
        Self::new(Box::new(io::stdout()), mode, layout)
    }

    pub fn with_site_title(mut self, title: impl Into<String>) -> Self {
        self.site_title = title.into();
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn print_search(&self, outcome: &SearchOutcome, keyword: &str) {
        match self.mode {
            OutputMode::Text => self.emit(view::search_lines(outcome, &self.layout)),
            OutputMode::Html => self.emit([html::search_results(outcome, keyword)]),
        }
    }

    pub fn print_help(&self) {
        self.emit(HELP.iter().map(|line| line.to_string()));
    }

    fn emit<I>(&self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = lines
            .into_iter()
            .try_for_each(|line| writeln!(out, "{line}"))
            .and_then(|()| out.flush());
        if let Err(e) = result {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl RenderGateway<Page> for TerminalGateway {
    fn highlight_nav(&self, path: &str) {
        match self.mode {
            OutputMode::Text => {
                let bar = view::nav_bar(path);
                let rule = "─".repeat(self.layout.width.min(bar.chars().count().max(1)));
                let bar = if self.layout.color { bar.cyan().to_string() } else { bar };
                self.emit([String::new(), bar, rule]);
            }
            OutputMode::Html => self.emit([html::nav_menu(path)]),
        }
    }

    fn show_loading(&self) {
        match self.mode {
            OutputMode::Text => self.emit(["Loading...".to_string()]),
            OutputMode::Html => self.emit([html::loading_page()]),
        }
    }

    fn render(&self, page: Page) {
        let title = page.document_title(&self.site_title);
        debug!("Rendering {:?}", title);
        match self.mode {
            OutputMode::Text => {
                let mut lines = vec![format!("« {title} »")];
                lines.extend(view::page_lines(&page, &self.layout));
                self.emit(lines);
            }
            OutputMode::Html => self.emit([
                format!("<title>{}</title>", crate::core::search::escape_html(&title)),
                html::render_page(&page),
            ]),
        }
    }

    fn show_not_found(&self, path: &str) {
        match self.mode {
            OutputMode::Text => self.emit([
                format!("Page not found: {path}"),
                "Sorry, the page you are looking for does not exist. Go back with #/".to_string(),
            ]),
            OutputMode::Html => self.emit([html::not_found_page()]),
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// One input line, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Go(String),
    Find(&'a str),
    Help,
    Quit,
    Empty,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "/quit" | "/q" => Command::Quit,
            "/help" | "/?" => Command::Help,
            "/find" => Command::Find(""),
            _ => {
                if let Some(keyword) = line.strip_prefix("/find ") {
                    Command::Find(keyword.trim())
                } else if line.starts_with('#') || line.starts_with('/') {
                    Command::Go(line.to_string())
                } else {
                    Command::Go(format!("/{line}"))
                }
            }
        }
    }
}

/// Reads commands from `input` until `/quit` or end of input. Navigation is
/// handed to the router, which must already be listening; searches go
/// through a debouncer so only the last of a quick run of queries prints.
pub async fn run<R>(
    input: R,
    router: Arc<Router<Page>>,
    site: Arc<Site>,
    gateway: Arc<TerminalGateway>,
    debounce: Duration,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let finder = {
        let gateway = Arc::clone(&gateway);
        Debouncer::spawn(debounce, move |keyword: String| {
            let outcome = site.find(&keyword);
            gateway.print_search(&outcome, &keyword);
        })
    };

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Empty => {}
            Command::Help => gateway.print_help(),
            Command::Find(keyword) => finder.submit(keyword),
            Command::Go(target) => router.navigate(&target),
        }
    }

    info!("Input closed, shutting down");
    finder.finish().await;
    Ok(())
}
