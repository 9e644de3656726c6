//! Fragment anatomy: `#/<path>[?<k>=<v>&...]`.

use std::collections::HashMap;

/// Decoded query parameters of a fragment.
pub type QueryParams = HashMap<String, String>;

/// Path part of a fragment: leading `#` dropped, everything from the first
/// `?` on dropped, and an empty remainder read as `/`.
pub fn path_of(fragment: &str) -> &str {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let path = fragment.split_once('?').map_or(fragment, |(path, _)| path);
    if path.is_empty() { "/" } else { path }
}

/// Query part of a fragment, parsed. A fragment without `?` has no params.
pub fn query_of(fragment: &str) -> QueryParams {
    fragment
        .split_once('?')
        .map(|(_, raw)| parse_query(raw))
        .unwrap_or_default()
}

/// Parses `k=v&k2=v2`. A pair without `=` has an empty value, pairs with an
/// empty key are skipped, and so are pairs that do not percent-decode.
/// Later duplicates overwrite earlier ones.
pub fn parse_query(raw: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in raw.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key.is_empty() {
            continue;
        }
        match (urlencoding::decode(key), urlencoding::decode(value)) {
            (Ok(key), Ok(value)) => {
                params.insert(key.into_owned(), value.into_owned());
            }
            _ => log::debug!("Skipping undecodable query pair: {}", pair),
        }
    }
    params
}

/// Whether a navigation link for `route` should be highlighted at `path`.
pub fn nav_is_active(route: &str, path: &str) -> bool {
    path == route || (route != "/" && path.starts_with(route))
}
