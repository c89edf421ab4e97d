//! Map link extraction from listing pages.
//!
//! The listing page layout is not under our control, so this is kept
//! separate from the API path and kept permissive: html5ever recovers from
//! broken markup and only anchors with an `href` are inspected.

use fancy_regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

/// Return the first anchor href (in document order) matching `pattern`.
///
/// Returns `Err` with a description only if the anchor selector itself cannot
/// be built.
pub fn find_map_link(html: &str, pattern: &Regex) -> Result<Option<String>, String> {
    let anchors = Selector::parse("a[href]").map_err(|e| e.to_string())?;
    let document = Html::parse_document(html);

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        match pattern.is_match(href) {
            Ok(true) => return Ok(Some(href.trim().to_string())),
            Ok(false) => {}
            Err(e) => warn!("Map link pattern failed on {}: {}", href, e),
        }
    }

    Ok(None)
}
