//! Front-matter splitting for article documents.
//!
//! A document may begin with a YAML block fenced by `---` lines. Anything
//! that does not look like a well-formed block is treated as plain body.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use crate::core::post::ContentPayload;

static FRONT_MATTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---\r?\n(.*?)\r?\n---\r?\n(.*)\z").expect("front matter pattern is valid")
});

/// Splits `document` into metadata and body.
///
/// Without a front-matter block, or when the YAML cannot be read as a
/// mapping, the metadata is empty and the content is the whole document.
pub fn parse(document: &str) -> ContentPayload {
    let Some(caps) = FRONT_MATTER.captures(document) else {
        return whole(document);
    };
    let yaml = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str());

    match parse_metadata(yaml) {
        Ok(metadata) => ContentPayload {
            metadata,
            content: body.trim().to_string(),
        },
        Err(e) => {
            warn!("Error parsing front matter: {}", e);
            whole(document)
        }
    }
}

fn whole(document: &str) -> ContentPayload {
    ContentPayload {
        metadata: BTreeMap::new(),
        content: document.to_string(),
    }
}

fn parse_metadata(yaml: &str) -> Result<BTreeMap<String, serde_json::Value>, String> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    match value {
        serde_yaml::Value::Null => Ok(BTreeMap::new()),
        serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value).map_err(|e| e.to_string()),
        other => Err(format!("front matter is not a mapping: {other:?}")),
    }
}
