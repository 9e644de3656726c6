//! # Search Index
//!
//! Weighted, typo-tolerant ranking of posts against a free-text query.
//!
//! ```text
//! query "hash ruoter"
//!   │  split on whitespace, drop tokens shorter than min_match_len
//!   ▼
//! per post, per field (title 0.4, description 0.3, category 0.15, tags 0.15)
//!   │  token quality = edits / token length   (0.0 = exact)
//!   │  rejected if edits > floor(threshold × token length)
//!   ▼
//! score = Π over matched fields of quality ^ (weight × field norm)
//!   │  lower is better; unmatched fields don't contribute
//!   ▼
//! hits sorted ascending, ties keep index order
//! ```
//!
//! The index is a snapshot: it does not follow later changes to the store.

pub mod debounce;
pub mod fuzzy;

use log::debug;
use regex::RegexBuilder;

use crate::core::post::Post;
use fuzzy::{allowed_errors, best_match};

pub use debounce::Debouncer;

/// Stand-in for a perfect field score so products stay strictly ordered.
const PERFECT: f64 = f64::EPSILON;

/// A searchable post field with its fixed weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Description,
    Category,
    Tags,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Description,
        SearchField::Category,
        SearchField::Tags,
    ];

    pub fn weight(self) -> f64 {
        match self {
            SearchField::Title => 0.4,
            SearchField::Description => 0.3,
            SearchField::Category => 0.15,
            SearchField::Tags => 0.15,
        }
    }

    fn values(self, post: &Post) -> Vec<&str> {
        match self {
            SearchField::Title => vec![post.title.as_str()],
            SearchField::Description => post.description.as_deref().into_iter().collect(),
            SearchField::Category => post.category.as_deref().into_iter().collect(),
            SearchField::Tags => post.tags.iter().map(String::as_str).collect(),
        }
    }
}

/// Tunables for a single query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Fraction of a token's length that may be edits (0.0 = exact only).
    pub threshold: f64,
    /// Tokens shorter than this, and matched spans shorter than this, are ignored.
    pub min_match_len: usize,
    /// Cap on the number of hits returned.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_match_len: DEFAULT_MIN_MATCH_LEN,
            limit: None,
        }
    }
}

pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MIN_MATCH_LEN: usize = 2;

/// Where a hit matched, as char spans into the original field value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub field: SearchField,
    pub value: String,
    pub spans: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub post: Post,
    pub score: f64,
    pub matches: Vec<FieldMatch>,
}

/// Result of a query. An empty query is not the same as a query with no hits:
/// the former wants a hint, the latter a "no results" message.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    EmptyQuery,
    NoMatches { keyword: String },
    Matches(Vec<SearchHit>),
}

impl SearchOutcome {
    pub fn hits(&self) -> &[SearchHit] {
        match self {
            SearchOutcome::Matches(hits) => hits,
            _ => &[],
        }
    }
}

/// One field value, pre-lowercased for matching.
struct IndexedValue {
    original: String,
    folded: Vec<char>,
    norm: f64,
}

struct IndexedPost {
    post: Post,
    fields: Vec<(SearchField, Vec<IndexedValue>)>,
}

pub struct SearchIndex {
    entries: Vec<IndexedPost>,
}

impl SearchIndex {
    /// Builds the index from a snapshot of the (already sorted) collection.
    pub fn build(posts: &[Post]) -> Self {
        let entries = posts
            .iter()
            .map(|post| IndexedPost {
                post: post.clone(),
                fields: SearchField::ALL
                    .iter()
                    .map(|&field| {
                        let values = field.values(post).into_iter().map(index_value).collect();
                        (field, values)
                    })
                    .collect(),
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn query(&self, keyword: &str, options: &SearchOptions) -> SearchOutcome {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return SearchOutcome::EmptyQuery;
        }

        let tokens: Vec<Vec<char>> = keyword
            .split_whitespace()
            .map(fold)
            .filter(|t| t.len() >= options.min_match_len)
            .collect();

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| score_entry(entry, &tokens, options))
            .collect();
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        if let Some(limit) = options.limit {
            hits.truncate(limit);
        }

        debug!("Search {:?}: {} hits over {} posts", keyword, hits.len(), self.entries.len());
        if hits.is_empty() {
            SearchOutcome::NoMatches {
                keyword: keyword.to_string(),
            }
        } else {
            SearchOutcome::Matches(hits)
        }
    }
}

/// Lowercases char by char, keeping one char per input char so match spans
/// index the original text.
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn index_value(value: &str) -> IndexedValue {
    let words = value.split_whitespace().count().max(1);
    IndexedValue {
        original: value.to_string(),
        folded: fold(value),
        norm: 1.0 / (words as f64).sqrt(),
    }
}

fn score_entry(
    entry: &IndexedPost,
    tokens: &[Vec<char>],
    options: &SearchOptions,
) -> Option<SearchHit> {
    if tokens.is_empty() {
        return None;
    }

    let mut score = 1.0;
    let mut matches = Vec::new();

    for (field, values) in &entry.fields {
        // Multi-valued fields (tags) count once, through their best value.
        let best = values
            .iter()
            .filter_map(|value| score_value(value, tokens, options))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((quality, value, spans)) = best {
            score *= quality.max(PERFECT).powf(field.weight() * value.norm);
            matches.push(FieldMatch {
                field: *field,
                value: value.original.clone(),
                spans,
            });
        }
    }

    if matches.is_empty() {
        return None;
    }
    Some(SearchHit {
        post: entry.post.clone(),
        score,
        matches,
    })
}

/// Quality of one field value: mean token quality, unmatched tokens count as 1.0.
fn score_value<'a>(
    value: &'a IndexedValue,
    tokens: &[Vec<char>],
    options: &SearchOptions,
) -> Option<(f64, &'a IndexedValue, Vec<(usize, usize)>)> {
    let mut total = 0.0;
    let mut spans = Vec::new();

    for token in tokens {
        let accepted = best_match(token, &value.folded).filter(|m| {
            m.errors <= allowed_errors(token.len(), options.threshold)
                && m.len() >= options.min_match_len
        });
        match accepted {
            Some(m) => {
                total += m.errors as f64 / token.len() as f64;
                spans.push((m.start, m.end));
            }
            None => total += 1.0,
        }
    }

    if spans.is_empty() {
        return None;
    }
    spans.sort_unstable();
    Some((total / tokens.len() as f64, value, spans))
}

const HTML_SPECIALS: [(char, &str); 5] = [
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#39;"),
];

/// Escapes text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match HTML_SPECIALS.iter().find(|(special, _)| *special == c) {
            Some((_, entity)) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Wraps every case-insensitive literal occurrence of `keyword` in
/// `<mark>…</mark>`. The rest of the text is HTML-escaped.
pub fn highlight(text: &str, keyword: &str) -> String {
    if keyword.is_empty() {
        return escape_html(text);
    }
    let Ok(pattern) = RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
    else {
        return escape_html(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for found in pattern.find_iter(text) {
        out.push_str(&escape_html(&text[last..found.start()]));
        out.push_str("<mark>");
        out.push_str(&escape_html(found.as_str()));
        out.push_str("</mark>");
        last = found.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}
