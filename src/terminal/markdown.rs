//! Markdown → terminal lines.
//!
//! Thin wrapper around `pulldown_cmark` that turns markdown events into
//! printable lines. Headings, bold, italic, inline code, fenced code blocks
//! (with syntect highlighting), lists, blockquotes, and links. With `color`
//! off the output is plain text, which is what the tests look at.

use std::sync::LazyLock;

use crossterm::style::{Color, Stylize};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub fn render(content: &str, color: bool) -> Vec<String> {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);

    let mut w = Writer::new(color);
    for event in Parser::new_ext(content, opts) {
        w.handle(event);
    }
    w.lines
}

// ── Styles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Look {
    bold: bool,
    italic: bool,
    dim: bool,
    underline: bool,
    strike: bool,
    fg: Option<Color>,
}

impl Look {
    /// Overlay `other` on top of `self`; flags accumulate, colour is replaced.
    fn patch(self, other: Look) -> Look {
        Look {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            dim: self.dim || other.dim,
            underline: self.underline || other.underline,
            strike: self.strike || other.strike,
            fg: other.fg.or(self.fg),
        }
    }

    fn paint(self, text: &str) -> String {
        let mut styled = text.to_string().stylize();
        if self.bold {
            styled = styled.bold();
        }
        if self.italic {
            styled = styled.italic();
        }
        if self.dim {
            styled = styled.dim();
        }
        if self.underline {
            styled = styled.underlined();
        }
        if self.strike {
            styled = styled.crossed_out();
        }
        if let Some(fg) = self.fg {
            styled = styled.with(fg);
        }
        styled.to_string()
    }
}

const BORDER: Look = Look {
    bold: false,
    italic: false,
    dim: false,
    underline: false,
    strike: false,
    fg: Some(Color::DarkGrey),
};

// ── Writer ──────────────────────────────────────────────────────────────────

struct Writer {
    lines: Vec<String>,
    color: bool,
    /// Inline style stack (bold, italic, heading text, etc.).
    looks: Vec<Look>,
    /// Per-line prefixes (blockquote `│`, code block border).
    line_prefixes: Vec<String>,
    /// List nesting: None = unordered, Some(n) = ordered at index n.
    list_indices: Vec<Option<u64>>,
    /// Active syntax highlighter for fenced code blocks.
    highlighter: Option<HighlightLines<'static>>,
    /// True when inside a code block without syntax highlighting.
    in_plain_code: bool,
    /// Stored link URL, appended after the link text closes.
    link_url: Option<String>,
    /// Whether the next block element should be preceded by a blank line.
    needs_newline: bool,
}

impl Writer {
    fn new(color: bool) -> Self {
        Self {
            lines: vec![],
            color,
            looks: vec![],
            line_prefixes: vec![],
            list_indices: vec![],
            highlighter: None,
            in_plain_code: false,
            link_url: None,
            needs_newline: false,
        }
    }

    fn look(&self) -> Look {
        self.looks.last().copied().unwrap_or_default()
    }

    fn push_look(&mut self, overlay: Look) {
        self.looks.push(self.look().patch(overlay));
    }

    fn pop_look(&mut self) {
        self.looks.pop();
    }

    fn paint(&self, text: &str, look: Look) -> String {
        if self.color {
            look.paint(text)
        } else {
            text.to_string()
        }
    }

    // ── Line helpers ────────────────────────────────────────────────────

    fn push_line(&mut self, line: String) {
        let mut out = self.line_prefixes.concat();
        out.push_str(&line);
        self.lines.push(out);
    }

    fn push_str(&mut self, text: &str) {
        match self.lines.last_mut() {
            Some(line) => line.push_str(text),
            None => self.push_line(text.to_string()),
        }
    }

    fn blank_line_if_needed(&mut self) {
        if self.needs_newline {
            self.lines.push(String::new());
            self.needs_newline = false;
        }
    }

    // ── Event dispatch ──────────────────────────────────────────────────

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => {
                let code = self.paint(&c, Look { fg: Some(Color::Yellow), ..Look::default() });
                self.push_str(&code);
            }
            Event::SoftBreak => self.push_str(" "),
            Event::HardBreak => self.push_line(String::new()),
            Event::Rule => {
                self.blank_line_if_needed();
                let rule = self.paint(&"─".repeat(40), BORDER);
                self.push_line(rule);
                self.needs_newline = true;
            }
            Event::TaskListMarker(checked) => {
                self.push_str(if checked { "[x] " } else { "[ ] " });
            }
            _ => {} // HTML, footnotes, math
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.blank_line_if_needed();
                self.push_line(String::new());
            }
            Tag::Heading { level, .. } => {
                self.blank_line_if_needed();
                let look = heading_look(level);
                let prefix = self.paint(&format!("{} ", "#".repeat(heading_depth(level))), look);
                self.push_line(prefix);
                self.push_look(look);
            }
            Tag::BlockQuote(_) => {
                self.blank_line_if_needed();
                let bar = self.paint("│ ", BORDER);
                self.line_prefixes.push(bar);
                self.push_look(Look {
                    dim: true,
                    italic: true,
                    ..Look::default()
                });
            }
            Tag::CodeBlock(kind) => {
                if !self.lines.is_empty() {
                    self.lines.push(String::new());
                }
                let lang = match &kind {
                    CodeBlockKind::Fenced(l) => l.split_whitespace().next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };

                let top = if lang.is_empty() {
                    self.paint("╭──", BORDER)
                } else {
                    format!(
                        "{}{}{}",
                        self.paint("╭── ", BORDER),
                        self.paint(lang, Look { bold: true, ..BORDER }),
                        self.paint(" ──", BORDER)
                    )
                };
                self.push_line(top);
                let bar = self.paint("│ ", BORDER);
                self.line_prefixes.push(bar);

                if self.color
                    && !lang.is_empty()
                    && let Some(syn) = SYNTAX_SET.find_syntax_by_token(lang)
                    && let Some(theme) = THEME_SET.themes.get("base16-ocean.dark")
                {
                    self.highlighter = Some(HighlightLines::new(syn, theme));
                }
                if self.highlighter.is_none() {
                    self.in_plain_code = true;
                }
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.blank_line_if_needed();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                let depth = self.list_indices.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.list_indices.last_mut() {
                    Some(Some(n)) => {
                        let s = format!("{indent}{n}. ");
                        *n += 1;
                        s
                    }
                    _ => format!("{indent}- "),
                };
                let marker = self.paint(&marker, BORDER);
                self.push_line(marker);
            }
            Tag::Emphasis => self.push_look(Look {
                italic: true,
                ..Look::default()
            }),
            Tag::Strong => self.push_look(Look {
                bold: true,
                ..Look::default()
            }),
            Tag::Strikethrough => self.push_look(Look {
                strike: true,
                ..Look::default()
            }),
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                self.push_look(Look {
                    underline: true,
                    fg: Some(Color::Cyan),
                    ..Look::default()
                });
            }
            _ => {} // Tables, images, definitions
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_newline = true,
            TagEnd::Heading(_) => {
                self.pop_look();
                self.needs_newline = true;
            }
            TagEnd::BlockQuote(_) => {
                self.line_prefixes.pop();
                self.pop_look();
                self.needs_newline = true;
            }
            TagEnd::CodeBlock => {
                self.highlighter = None;
                self.in_plain_code = false;
                self.line_prefixes.pop();
                let bottom = self.paint("╰──", BORDER);
                self.push_line(bottom);
                self.needs_newline = true;
            }
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_newline = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_look(),
            TagEnd::Link => {
                self.pop_look();
                if let Some(url) = self.link_url.take() {
                    let url = self.paint(&url, Look { fg: Some(Color::Cyan), ..Look::default() });
                    self.push_str(&format!(" ({url})"));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        let text = cow.replace('\t', "    ");

        if let Some(mut hl) = self.highlighter.take() {
            for line in LinesWithEndings::from(text.as_str()) {
                if let Ok(ranges) = hl.highlight_line(line, &SYNTAX_SET) {
                    let escaped = as_24_bit_terminal_escaped(&ranges, false);
                    self.push_line(format!("{}\x1b[0m", escaped.trim_end_matches('\n')));
                }
            }
            self.highlighter = Some(hl);
            return;
        }

        if self.in_plain_code {
            for line in text.lines() {
                self.push_line(line.to_owned());
            }
            return;
        }

        let painted = self.paint(&text, self.look());
        self.push_str(&painted);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn heading_look(level: HeadingLevel) -> Look {
    match level {
        HeadingLevel::H1 => Look {
            bold: true,
            underline: true,
            ..Look::default()
        },
        HeadingLevel::H2 => Look {
            bold: true,
            ..Look::default()
        },
        _ => Look {
            bold: true,
            italic: true,
            ..Look::default()
        },
    }
}

fn heading_depth(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
