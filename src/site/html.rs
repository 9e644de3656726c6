//! Static HTML for a [`Page`], used by the `--html` export mode.
//!
//! Links keep the fragment scheme (`#/post/<id>`) so the output drops into
//! the single-page shell unchanged.

use std::fmt::Write;

use urlencoding::encode;

use super::markdown;
use super::{ListKind, NAV_LINKS, Page};
use crate::core::format::{DateFormat, format_date, truncate};
use crate::core::post::Post;
use crate::core::router::nav_is_active;
use crate::core::search::{SearchOutcome, escape_html, highlight};

const DESCRIPTION_LIMIT: usize = 150;

/// Renders the main-area markup for `page`, wrapped in a container.
pub fn render_page(page: &Page) -> String {
    let body = match page {
        Page::Home { posts } => format!(
            "{}{}",
            header("Latest posts", "Notes on code and life"),
            post_list(posts)
        ),
        Page::Timeline { years, summary } => {
            let mut out = header("Timeline", &format!("{} posts", summary.total_posts));
            for year in years {
                let _ = write!(
                    out,
                    "<section class=\"timeline-year\" data-year=\"{}\">",
                    year.year
                );
                let _ = write!(out, "<h2>{}</h2>", year.year);
                for month in &year.months {
                    let label = month
                        .posts
                        .first()
                        .map(|p| format_date(p.date, DateFormat::MonthName))
                        .unwrap_or_default();
                    let _ = write!(out, "<h3>{}</h3><ul>", label);
                    for post in &month.posts {
                        let _ = write!(
                            out,
                            "<li><span class=\"date\">{}</span> {}</li>",
                            format_date(post.date, DateFormat::MonthDay),
                            post_link(post)
                        );
                    }
                    out.push_str("</ul>");
                }
                out.push_str("</section>");
            }
            out
        }
        Page::Categories { entries } => stats_page("Categories", "category", entries),
        Page::Tags { entries } => stats_page("Tags", "tag", entries),
        Page::PostList { kind, posts } => {
            let name = match kind {
                ListKind::Category(name) | ListKind::Tag(name) => name,
            };
            format!(
                "<h1 class=\"filter-title\">{} <span class=\"filter-count\">({} posts)</span></h1>{}",
                escape_html(name),
                posts.len(),
                post_list(posts)
            )
        }
        Page::Article {
            post,
            content,
            read_time,
            adjacent,
        } => {
            let mut out = String::from("<article class=\"article\"><header>");
            let _ = write!(out, "<h1 class=\"article-title\">{}</h1>", escape_html(&post.title));
            let _ = write!(
                out,
                "<div class=\"article-meta\"><span>{}</span>",
                format_date(post.date, DateFormat::Long)
            );
            if let Some(category) = &post.category {
                out.push_str(&category_link(category));
            }
            let _ = write!(out, "<span>{} min read</span></div>", read_time);
            out.push_str(&tag_links(&post.tags));
            out.push_str("</header><div class=\"article-content\">");
            out.push_str(&markdown::to_html(&content.content));
            out.push_str("</div><nav class=\"article-nav\">");
            if let Some(prev) = &adjacent.prev {
                let _ = write!(out, "<div class=\"prev\">← {}</div>", post_link(prev));
            }
            if let Some(next) = &adjacent.next {
                let _ = write!(out, "<div class=\"next\">{} →</div>", post_link(next));
            }
            out.push_str("</nav></article>");
            out
        }
        Page::PostNotFound { .. } => empty_state(
            "Post not found",
            "This post does not exist or has been removed.",
        ),
        Page::LoadFailed { .. } => empty_state(
            "Failed to load",
            "The post content could not be loaded. Please try again later.",
        ),
        Page::About { text, summary } => format!(
            "{}<div class=\"about\"><p>{}</p><p>{} posts, {} categories, {} tags.</p></div>",
            header("About", ""),
            escape_html(text),
            summary.total_posts,
            summary.total_categories,
            summary.total_tags
        ),
        Page::SearchResults { keyword, posts } => format!(
            "<h1 class=\"filter-title\">Search: {} <span class=\"filter-count\">({} posts)</span></h1>{}",
            escape_html(keyword),
            posts.len(),
            post_list(posts)
        ),
    };
    format!("<div class=\"container\">{body}</div>")
}

/// Navigation menu with the entry for `path` marked active.
pub fn nav_menu(path: &str) -> String {
    let mut out = String::from("<nav class=\"nav-menu\">");
    for (label, route) in NAV_LINKS {
        let class = if nav_is_active(route, path) {
            "nav-link active"
        } else {
            "nav-link"
        };
        let _ = write!(out, "<a href=\"#{route}\" class=\"{class}\">{label}</a>");
    }
    out.push_str("</nav>");
    out
}

pub fn not_found_page() -> String {
    format!(
        "<div class=\"container\">{}</div>",
        empty_state("Page not found", "Sorry, the page you are looking for does not exist.")
    )
}

pub fn loading_page() -> String {
    "<div class=\"container\"><div class=\"loading\"><p>Loading...</p></div></div>".to_string()
}

/// Markup for the search dropdown. Titles get literal `<mark>` highlighting of
/// `keyword`, which may differ from the fuzzy spans that ranked the hit.
pub fn search_results(outcome: &SearchOutcome, keyword: &str) -> String {
    match outcome {
        SearchOutcome::EmptyQuery => {
            "<div class=\"search-hint\">Type a keyword to search</div>".to_string()
        }
        SearchOutcome::NoMatches { keyword } => format!(
            "<div class=\"search-no-results\"><p>No posts found for \"<strong>{}</strong>\"</p></div>",
            escape_html(keyword)
        ),
        SearchOutcome::Matches(hits) => {
            let keyword = keyword.trim();
            let mut out = String::new();
            for hit in hits {
                let post = &hit.post;
                let _ = write!(
                    out,
                    "<a class=\"search-result-item\" href=\"#/post/{}\"><div class=\"search-result-title\">{}</div><div class=\"search-result-meta\">{}",
                    encode(&post.id),
                    highlight(&post.title, keyword),
                    format_date(post.date, DateFormat::Long)
                );
                if let Some(category) = &post.category {
                    let _ = write!(out, " · {}", escape_html(category));
                }
                out.push_str("</div></a>");
            }
            out
        }
    }
}

fn header(title: &str, description: &str) -> String {
    format!(
        "<div class=\"page-header\"><h1 class=\"page-title\">{}</h1><p class=\"page-description\">{}</p></div>",
        escape_html(title),
        escape_html(description)
    )
}

fn empty_state(title: &str, message: &str) -> String {
    format!(
        "<div class=\"empty-state\"><h2 class=\"empty-state-title\">{}</h2><p>{}</p><a href=\"#/\" class=\"tag\">Back to home</a></div>",
        escape_html(title),
        escape_html(message)
    )
}

fn stats_page(title: &str, route: &str, entries: &[(String, usize)]) -> String {
    if entries.is_empty() {
        return format!("{}{}", header(title, ""), empty_state(&format!("No {}", title.to_lowercase()), ""));
    }
    let mut out = header(title, &format!("{} in total", entries.len()));
    out.push_str("<div class=\"category-list\">");
    for (name, count) in entries {
        let _ = write!(
            out,
            "<a href=\"#/{}/{}\" class=\"category-item\"><span>{}</span><span class=\"category-count\">{}</span></a>",
            route,
            encode(name),
            escape_html(name),
            count
        );
    }
    out.push_str("</div>");
    out
}

fn post_list(posts: &[Post]) -> String {
    if posts.is_empty() {
        return empty_state("No posts", "Nothing has been published here yet.");
    }
    let mut out = String::from("<div class=\"posts-list\">");
    for post in posts {
        out.push_str(&post_card(post));
    }
    out.push_str("</div>");
    out
}

fn post_card(post: &Post) -> String {
    let mut out = String::from("<article class=\"post-card\"><div class=\"post-card-meta\">");
    let _ = write!(out, "<span>{}</span>", format_date(post.date, DateFormat::Long));
    if let Some(category) = &post.category {
        out.push_str(&category_link(category));
    }
    let _ = write!(out, "</div><h2 class=\"post-card-title\">{}</h2>", post_link(post));
    if let Some(description) = &post.description {
        let _ = write!(
            out,
            "<p class=\"post-card-description\">{}</p>",
            escape_html(&truncate(description, DESCRIPTION_LIMIT))
        );
    }
    out.push_str("<div class=\"post-card-footer\">");
    out.push_str(&tag_links(&post.tags));
    if let Some(minutes) = post.read_time {
        let _ = write!(out, "<span class=\"post-card-read-time\">{minutes} min read</span>");
    }
    out.push_str("</div></article>");
    out
}

fn post_link(post: &Post) -> String {
    format!(
        "<a href=\"#/post/{}\">{}</a>",
        encode(&post.id),
        escape_html(&post.title)
    )
}

fn category_link(category: &str) -> String {
    format!(
        "<a href=\"#/category/{}\" class=\"post-card-category\">{}</a>",
        encode(category),
        escape_html(category)
    )
}

fn tag_links(tags: &[String]) -> String {
    let mut out = String::from("<div class=\"post-card-tags\">");
    for tag in tags {
        let _ = write!(
            out,
            "<a href=\"#/tag/{}\" class=\"tag\">{}</a>",
            encode(tag),
            escape_html(tag)
        );
    }
    out.push_str("</div>");
    out
}
