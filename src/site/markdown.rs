//! Markdown → HTML for article bodies.
//!
//! Thin wrapper around `pulldown_cmark`'s HTML writer. Fenced code blocks
//! with a language syntect knows are replaced by inline-styled highlighted
//! HTML; everything else goes through unchanged.

use std::sync::LazyLock;

use log::warn;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::core::search::escape_html;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const CODE_THEME: &str = "base16-ocean.dark";

pub fn to_html(content: &str) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_TABLES);

    let mut events = Vec::new();
    // (language, buffered source) while inside a code block
    let mut code: Option<(String, String)> = None;

    for event in Parser::new_ext(content, opts) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((lang, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, source)) = code.take() {
                    events.push(Event::Html(code_block(&lang, &source).into()));
                }
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, source)) = code.as_mut() {
                    source.push_str(&text);
                }
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

fn code_block(lang: &str, source: &str) -> String {
    // Info strings may carry extra attributes after the language.
    let token = lang.split_whitespace().next().unwrap_or("");

    if !token.is_empty()
        && let Some(syntax) = SYNTAX_SET.find_syntax_by_token(token)
        && let Some(theme) = THEME_SET.themes.get(CODE_THEME)
    {
        match highlighted_html_for_string(source, &SYNTAX_SET, syntax, theme) {
            Ok(html) => return html,
            Err(e) => warn!("Highlighting {} block failed: {}", token, e),
        }
    }

    let class = if token.is_empty() {
        String::new()
    } else {
        format!(" class=\"language-{}\"", escape_html(token))
    };
    format!("<pre><code{class}>{}</code></pre>\n", escape_html(source))
}
