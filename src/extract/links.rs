use scraper::{Html, Selector};

/// Collects the raw `href` of every followable anchor on the page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
///
/// Values are returned unresolved; the crawl loop normalizes them against the
/// page URL.
pub fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if is_followable(href) {
                    links.push(href.trim().to_string());
                }
            }
        }
    }

    links
}

fn is_followable(href: &str) -> bool {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    !(lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links_of(body: &str) -> Vec<String> {
        extract_links(&Html::parse_document(&format!(
            "<html><body>{}</body></html>",
            body
        )))
    }

    #[test]
    fn test_extract_relative_and_absolute() {
        let links = links_of(
            r#"<a href="/products/a?ref=1">A</a>
               <a href=" https://s.com/collections/x ">X</a>"#,
        );
        assert_eq!(links, vec!["/products/a?ref=1", "https://s.com/collections/x"]);
    }

    #[test]
    fn test_skip_special_schemes() {
        let links = links_of(
            r#"<a href="javascript:void(0)">JS</a>
               <a href="MAILTO:shop@s.com">Mail</a>
               <a href="tel:+123">Call</a>
               <a href="data:text/html,hi">Data</a>
               <a href="/ok">OK</a>"#,
        );
        assert_eq!(links, vec!["/ok"]);
    }

    #[test]
    fn test_skip_download_and_fragments() {
        let links = links_of(
            r##"<a href="/catalog.pdf" download>PDF</a>
                <a href="#reviews">Reviews</a>
                <a href="">Empty</a>
                <a>No href</a>
                <a href="/products/b#reviews">B</a>"##,
        );
        assert_eq!(links, vec!["/products/b#reviews"]);
    }
}
