//! Clean-text extraction from HTML documents

use crate::detect::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

/// Elements whose subtrees never contribute to clean text
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
];

/// Candidate main-content containers, most specific first
const MAIN_CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=main]", "body"];

/// Extracts the page title from raw HTML
pub fn extract_title(html: &str) -> Option<String> {
    title_of(&Html::parse_document(html))
}

/// Extracts the clean text of a raw HTML document
///
/// The text is the title, the meta description, the alt text of images in
/// the main content, and the visible main-content text, joined and
/// whitespace-collapsed.
pub fn extract_clean_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let title = title_of(&document);
    clean_text_of(&document, title.as_deref())
}

/// Returns the serialized `<head>` element, or an empty string
pub fn head_html(html: &str) -> String {
    let document = Html::parse_document(html);
    match Selector::parse("head") {
        Ok(selector) => document
            .select(&selector)
            .next()
            .map(|head| head.html())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

pub(crate) fn title_of(document: &Html) -> Option<String> {
    first_text(document, "title").or_else(|| first_text(document, "h1"))
}

pub(crate) fn clean_text_of(document: &Html, title: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = title {
        parts.push(title.to_string());
    }

    if let Some(description) = meta_content(document, "description") {
        parts.push(description);
    }

    if let Some(main) = main_content(document) {
        let mut alts = Vec::new();
        let mut text = String::new();
        walk_visible(main, &mut alts, &mut text);

        parts.extend(alts);
        parts.push(text);
    }

    collapse_whitespace(&parts.join(" "))
}

/// Finds `<meta name=...>` case-insensitively and returns its trimmed content
pub(crate) fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse("meta[name][content]").ok()?;

    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn main_content(document: &Html) -> Option<ElementRef<'_>> {
    MAIN_CONTENT_SELECTORS.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        document.select(&selector).next()
    })
}

fn walk_visible(element: ElementRef<'_>, alts: &mut Vec<String>, text: &mut String) {
    for child in element.children() {
        if let Some(fragment) = child.value().as_text() {
            text.push_str(fragment);
            text.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_ELEMENTS.contains(&name) {
                continue;
            }
            if name == "img" {
                if let Some(alt) = child_element.value().attr("alt") {
                    let alt = collapse_whitespace(alt);
                    if !alt.is_empty() {
                        alts.push(alt);
                    }
                }
            }
            walk_visible(child_element, alts, text);
        }
    }
}
