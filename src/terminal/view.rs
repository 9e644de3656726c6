//! Plain-text layout of pages and search results.

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use super::markdown;
use crate::core::format::{DateFormat, format_date, truncate};
use crate::core::post::Post;
use crate::core::router::nav_is_active;
use crate::core::search::{SearchField, SearchOutcome};
use crate::site::{ListKind, NAV_LINKS, Page};

const DESCRIPTION_LIMIT: usize = 150;

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub width: usize,
    pub color: bool,
}

impl Layout {
    fn wrap(&self, text: &str, indent: &str) -> Vec<String> {
        let options = textwrap::Options::new(self.width.max(20))
            .initial_indent(indent)
            .subsequent_indent(indent);
        textwrap::wrap(text, options)
            .into_iter()
            .map(|line| line.into_owned())
            .collect()
    }

    fn title(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }
}

/// One line, active entry bracketed.
pub fn nav_bar(path: &str) -> String {
    NAV_LINKS
        .iter()
        .map(|(label, route)| {
            if nav_is_active(route, path) {
                format!("[{label}]")
            } else {
                format!(" {label} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn page_lines(page: &Page, layout: &Layout) -> Vec<String> {
    let mut out = Vec::new();
    match page {
        Page::Home { posts } => {
            out.push(layout.title("Latest posts"));
            out.push(String::new());
            post_list(&mut out, posts, layout);
        }
        Page::Timeline { years, summary } => {
            out.push(layout.title(&format!("Timeline ({} posts)", summary.total_posts)));
            for year in years {
                out.push(String::new());
                out.push(layout.title(&year.year.to_string()));
                for month in &year.months {
                    if let Some(first) = month.posts.first() {
                        out.push(format!("  {}", format_date(first.date, DateFormat::MonthName)));
                    }
                    for post in &month.posts {
                        out.push(format!(
                            "    {}  {}",
                            layout.muted(&format_date(post.date, DateFormat::MonthDay)),
                            post.title
                        ));
                    }
                }
            }
        }
        Page::Categories { entries } => stats(&mut out, "Categories", entries, layout),
        Page::Tags { entries } => stats(&mut out, "Tags", entries, layout),
        Page::PostList { kind, posts } => {
            let name = match kind {
                ListKind::Category(name) | ListKind::Tag(name) => name,
            };
            out.push(layout.title(&format!("{name} ({} posts)", posts.len())));
            out.push(String::new());
            post_list(&mut out, posts, layout);
        }
        Page::Article {
            post,
            content,
            read_time,
            adjacent,
        } => {
            out.push(layout.title(&post.title));
            out.push(layout.muted(&meta_line(post, Some(*read_time))));
            if !post.tags.is_empty() {
                out.push(layout.muted(&tag_line(&post.tags)));
            }
            out.push(String::new());
            for line in markdown::render(&content.content, layout.color) {
                let boxed = line.starts_with('│') || line.starts_with('╭');
                if line.width() > layout.width && !boxed {
                    out.extend(layout.wrap(&line, ""));
                } else {
                    out.push(line);
                }
            }
            out.push(String::new());
            if let Some(prev) = &adjacent.prev {
                out.push(format!("← {}  (#/post/{})", prev.title, prev.id));
            }
            if let Some(next) = &adjacent.next {
                out.push(format!("→ {}  (#/post/{})", next.title, next.id));
            }
        }
        Page::PostNotFound { id } => {
            out.push(layout.title("Post not found"));
            out.push(format!("No post with id {id:?}. Go back with #/"));
        }
        Page::LoadFailed { post, reason } => {
            out.push(layout.title("Failed to load"));
            out.push(format!("Could not load \"{}\": {reason}", post.title));
        }
        Page::About { text, summary } => {
            out.push(layout.title("About"));
            out.push(String::new());
            out.extend(layout.wrap(text, ""));
            out.push(String::new());
            out.push(format!(
                "{} posts, {} categories, {} tags, {} years",
                summary.total_posts,
                summary.total_categories,
                summary.total_tags,
                summary.years.len()
            ));
        }
        Page::SearchResults { keyword, posts } => {
            out.push(layout.title(&format!("Search: {keyword} ({} posts)", posts.len())));
            out.push(String::new());
            post_list(&mut out, posts, layout);
        }
    }
    out
}

pub fn search_lines(outcome: &SearchOutcome, layout: &Layout) -> Vec<String> {
    match outcome {
        SearchOutcome::EmptyQuery => vec![layout.muted("Type a keyword to search")],
        SearchOutcome::NoMatches { keyword } => vec![format!("No results for \"{keyword}\"")],
        SearchOutcome::Matches(hits) => {
            let mut out = Vec::with_capacity(hits.len() * 2);
            for hit in hits {
                let title = hit
                    .matches
                    .iter()
                    .find(|m| m.field == SearchField::Title)
                    .map(|m| mark_spans(&m.value, &m.spans, layout.color))
                    .unwrap_or_else(|| hit.post.title.clone());
                let link = layout.muted(&format!("#/post/{}", hit.post.id));
                out.push(format!("{title}  {link}"));
                if let Some(description) = &hit.post.description {
                    out.extend(layout.wrap(&truncate(description, DESCRIPTION_LIMIT), "    "));
                }
            }
            out
        }
    }
}

/// Marks char spans of `text`: reverse video with colour, `[...]` without.
fn mark_spans(text: &str, spans: &[(usize, usize)], color: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + spans.len() * 8);
    let mut last = 0;
    for &(start, end) in spans {
        let (start, end) = (start.max(last).min(chars.len()), end.min(chars.len()));
        if start >= end {
            continue;
        }
        out.extend(&chars[last..start]);
        let marked: String = chars[start..end].iter().collect();
        if color {
            out.push_str(&marked.reverse().to_string());
        } else {
            out.push('[');
            out.push_str(&marked);
            out.push(']');
        }
        last = end;
    }
    out.extend(&chars[last..]);
    out
}

fn meta_line(post: &Post, read_time: Option<u32>) -> String {
    let mut parts = vec![format_date(post.date, DateFormat::Long)];
    if let Some(category) = &post.category {
        parts.push(category.clone());
    }
    if let Some(minutes) = read_time {
        parts.push(format!("{minutes} min read"));
    }
    parts.join(" · ")
}

fn tag_line(tags: &[String]) -> String {
    tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ")
}

fn post_list(out: &mut Vec<String>, posts: &[Post], layout: &Layout) {
    if posts.is_empty() {
        out.push("No posts yet.".to_string());
        return;
    }
    for post in posts {
        let link = layout.muted(&format!("#/post/{}", post.id));
        out.push(format!("{}  {link}", layout.title(&post.title)));
        out.push(format!("  {}", layout.muted(&meta_line(post, post.read_time))));
        if let Some(description) = &post.description {
            out.extend(layout.wrap(&truncate(description, DESCRIPTION_LIMIT), "  "));
        }
        if !post.tags.is_empty() {
            out.push(format!("  {}", tag_line(&post.tags)));
        }
        out.push(String::new());
    }
}

/// Name/count table with counts aligned on display width, so CJK names line up.
fn stats(out: &mut Vec<String>, title: &str, entries: &[(String, usize)], layout: &Layout) {
    out.push(layout.title(&format!("{title} ({})", entries.len())));
    out.push(String::new());
    if entries.is_empty() {
        out.push(format!("No {} yet.", title.to_lowercase()));
        return;
    }
    let name_width = entries.iter().map(|(name, _)| name.width()).max().unwrap_or(0);
    for (name, count) in entries {
        let pad = " ".repeat(name_width - name.width());
        out.push(format!("  {name}{pad}  {count:>3}"));
    }
}
