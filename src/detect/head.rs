//! Head checksum over SEO-relevant `<head>` metadata

use crate::detect::{collapse_whitespace, digest, Checksum};
use scraper::{ElementRef, Html, Selector};

/// Computes the head checksum of a raw HTML document
///
/// The hashed string is the space-joined sequence of:
///
/// 1. the `<title>` text
/// 2. `description:<content>` for the meta description
/// 3. `robots:<content>` for the meta robots directive
/// 4. `canon:<href>` for the canonical link
/// 5. `hl:<lang>:<href>` for every hreflang alternate, in document order
/// 6. the trimmed body of every `application/ld+json` script, in document order
///
/// Only elements inside `<head>` are considered.
pub fn head_checksum(html: &str) -> Checksum {
    head_checksum_of(&Html::parse_document(html))
}

pub(crate) fn head_checksum_of(document: &Html) -> Checksum {
    digest(&head_parts(document).join(" "))
}

fn head_parts(document: &Html) -> Vec<String> {
    let mut parts = Vec::new();

    let Some(head) = head_element(document) else {
        parts.push(String::new());
        return parts;
    };

    parts.push(select_first_text(head, "title").unwrap_or_default());

    if let Some(description) = named_meta(head, "description") {
        parts.push(format!("description:{}", description));
    }

    if let Some(robots) = named_meta(head, "robots") {
        parts.push(format!("robots:{}", robots));
    }

    if let Ok(selector) = Selector::parse("link[rel][href]") {
        let canonical = head
            .select(&selector)
            .find(|link| has_rel(*link, "canonical"))
            .and_then(|link| link.value().attr("href"));

        if let Some(href) = canonical {
            parts.push(format!("canon:{}", href.trim()));
        }
    }

    if let Ok(selector) = Selector::parse("link[rel][hreflang][href]") {
        for link in head.select(&selector) {
            if !has_rel(link, "alternate") {
                continue;
            }
            let lang = link.value().attr("hreflang").unwrap_or_default().trim();
            let href = link.value().attr("href").unwrap_or_default().trim();
            parts.push(format!("hl:{}:{}", lang, href));
        }
    }

    if let Ok(selector) = Selector::parse("script[type]") {
        for script in head.select(&selector) {
            let is_ld_json = script
                .value()
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));

            if is_ld_json {
                parts.push(script.text().collect::<String>().trim().to_string());
            }
        }
    }

    parts
}

fn head_element(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("head").ok()?;
    document.select(&selector).next()
}

fn select_first_text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
}

fn named_meta(scope: ElementRef<'_>, name: &str) -> Option<String> {
    let selector = Selector::parse("meta[name][content]").ok()?;
    scope
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
}

/// `rel` is a space-separated token list
fn has_rel(element: ElementRef<'_>, token: &str) -> bool {
    element
        .value()
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
}
