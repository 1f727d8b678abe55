use crate::extract::NOT_FOUND;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

/// Runs every named selector against the page
///
/// Each field gets the text of the first matching element with leading and
/// trailing whitespace trimmed. A selector that matches nothing yields
/// [`NOT_FOUND`]; extraction itself never fails.
pub fn extract_fields(document: &Html, selectors: &BTreeMap<String, Selector>) -> BTreeMap<String, String> {
    selectors
        .iter()
        .map(|(name, selector)| {
            let value = document
                .select(selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| NOT_FOUND.to_string());
            (name.clone(), value)
        })
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.trim().to_string()
}
