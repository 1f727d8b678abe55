use crate::url::CrawlUrl;
use scraper::{ElementRef, Html, Selector};

/// One image found by an image selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMatch {
    /// Absolute image URL
    pub url: String,
    /// Root-to-element ancestor chain of the `<img>`
    pub dom_location: String,
}

/// Collects the images selected by `selector`
///
/// A selected `<img>` contributes its own `src`; any other selected element
/// contributes the `src` of every `<img>` beneath it. Sources are resolved
/// against the page URL. Images without a usable HTTP(S) source are skipped.
pub fn extract_images(document: &Html, selector: &Selector, page_url: &CrawlUrl) -> Vec<ImageMatch> {
    let mut matches = Vec::new();

    let img_selector = match Selector::parse("img[src]") {
        Ok(selector) => selector,
        Err(_) => return matches,
    };

    for element in document.select(selector) {
        if element.value().name() == "img" {
            if let Some(image) = image_match(element, page_url) {
                matches.push(image);
            }
            continue;
        }

        for img in element.select(&img_selector) {
            if let Some(image) = image_match(img, page_url) {
                matches.push(image);
            }
        }
    }

    matches
}

fn image_match(img: ElementRef<'_>, page_url: &CrawlUrl) -> Option<ImageMatch> {
    let src = img.value().attr("src")?.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }

    let resolved = page_url.as_url().join(src).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    Some(ImageMatch {
        url: resolved.to_string(),
        dom_location: dom_location(img),
    })
}

/// Describes where an element sits in the document
///
/// Each step is `tag.class1.class2#id`, from the root element down to the
/// element itself, joined by `" > "`.
pub fn dom_location(element: ElementRef<'_>) -> String {
    let mut chain: Vec<String> = element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .map(describe)
        .collect();
    chain.reverse();
    chain.push(describe(element));
    chain.join(" > ")
}

fn describe(element: ElementRef<'_>) -> String {
    let value = element.value();
    let mut step = value.name().to_string();

    for class in value.classes() {
        step.push('.');
        step.push_str(class);
    }

    if let Some(id) = value.id() {
        step.push('#');
        step.push_str(id);
    }

    step
}
