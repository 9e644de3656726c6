//! # Post Data Model
//!
//! Wire types for the index resource (`data/posts.json`) and the parsed
//! article payload held in the content cache.
//!
//! ```text
//! PostIndexDocument
//! ├── posts: Vec<Post>          // unsorted, file order
//! ├── categories: Vec<String>   // declared, informational
//! └── tags: Vec<String>         // declared, informational
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A single post as listed in the index resource. Immutable once loaded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    /// Ordered set: duplicates are dropped at load time, first occurrence wins.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Reference to the content resource, relative to the site root.
    #[serde(default)]
    pub filename: String,
    /// Estimated minutes to read. `None` or positive.
    #[serde(default, rename = "readTime")]
    pub read_time: Option<u32>,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Normalizes fields that the index format allows to be sloppy.
    pub(crate) fn normalized(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.tags.len());
        self.tags.retain(|tag| {
            if seen.contains(tag) {
                false
            } else {
                seen.push(tag.clone());
                true
            }
        });
        if self.read_time == Some(0) {
            self.read_time = None;
        }
        self
    }
}

/// The index resource as published by the site build.
#[derive(Deserialize, Debug, Default)]
pub struct PostIndexDocument {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Parsed article: front-matter metadata plus the Markdown body.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ContentPayload {
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub content: String,
}

/// Prev/next neighbours of a post in the sorted index.
///
/// `prev` is chronologically older, `next` is chronologically newer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Adjacent {
    pub prev: Option<Post>,
    pub next: Option<Post>,
}

/// Accepts `YYYY-MM-DD` as well as full ISO-8601 date-times; only the
/// calendar date is kept.
fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_iso_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.date())
}
