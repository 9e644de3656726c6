//! Compiled route patterns.
//!
//! A pattern is split on `/` once, at registration. Segments starting with
//! `:` bind the percent-decoded path segment at the same position; all
//! other segments must match verbatim. Segment counts must be equal, so
//! there are no wildcards and `/tags/` does not match `/tags`.

use std::collections::HashMap;

/// Decoded path parameters, keyed by the name after `:`.
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(source: &str) -> Self {
        let segments = source
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(segment.to_string()),
            })
            .collect();
        Self {
            source: source.to_string(),
            segments,
        }
    }

    /// The pattern string as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the pattern has no parameter segments.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Static(_)))
    }

    /// Binds `path` against this pattern.
    ///
    /// `None` when the segment counts differ, a static segment differs, or a
    /// parameter segment is not valid percent-encoding.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    let value = urlencoding::decode(part).ok()?;
                    params.insert(name.clone(), value.into_owned());
                }
            }
        }
        Some(params)
    }
}
