//! Small helpers over the parsed document tree.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

static DISPLAY_NONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)display:\s?none;?").unwrap());

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png", ".jpeg", ".webp", ".gif", ".avif", ".tiff"];
const SIMPLE_SRC_VARIANTS: &[&str] = &["src", "data-src", "data-lazy-src"];

pub(crate) fn static_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static css selector")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All descendant text with whitespace runs collapsed.
pub fn text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// All descendant text exactly as written.
pub fn whole_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of the element's direct text children only.
pub fn own_text(element: ElementRef<'_>) -> String {
    let raw = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| &**t))
        .collect::<String>();
    collapse_whitespace(&raw)
}

pub fn has_own_text(element: ElementRef<'_>) -> bool {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .any(|t| !t.trim().is_empty())
}

/// Element ancestors, closest first. The element itself is not included.
pub fn parents(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.ancestors().filter_map(ElementRef::wrap)
}

pub fn has_ancestor_named(element: ElementRef<'_>, tag: &str) -> bool {
    parents(element).any(|parent| parent.value().name().eq_ignore_ascii_case(tag))
}

/// Hidden through an inline `display: none` on itself or any ancestor.
pub fn is_hidden_by_style(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(parents(element))
        .filter_map(|e| e.value().attr("style"))
        .any(|style| DISPLAY_NONE_RE.is_match(style))
}

/// Resolves `href`-like attribute values against the document location.
pub fn absolute_url(base: &Url, value: &str) -> Option<Url> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    base.join(value).ok()
}

/// Image URL of an element, looking at the usual places lazy-loading
/// markup stores it.
pub fn image_src(element: ElementRef<'_>, base: &Url) -> Option<Url> {
    let value = element.value();

    if let Some(src) = SIMPLE_SRC_VARIANTS.iter().find_map(|name| value.attr(name)) {
        return absolute_url(base, src);
    }

    if let Some(srcset) = value.attr("srcset") {
        return absolute_url(base, first_token(srcset));
    }

    value
        .attrs()
        .find(|(name, attr)| {
            name.contains("src") && IMAGE_EXTENSIONS.iter().any(|ext| attr.contains(ext))
        })
        .and_then(|(_, attr)| absolute_url(base, first_token(attr)))
}

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or_default()
}

/// Deepest element that is an ancestor of every element in `elements`.
///
/// Needs at least two elements; elements are never their own ancestor.
pub fn nearest_common_ancestor<'a>(elements: &[ElementRef<'a>]) -> Option<ElementRef<'a>> {
    if elements.len() < 2 {
        return None;
    }

    let chains = elements
        .iter()
        .map(|element| {
            let mut chain = parents(*element).collect::<Vec<_>>();
            chain.reverse();
            chain
        })
        .collect::<Vec<_>>();

    let depth = chains.iter().map(Vec::len).min().unwrap_or(0);
    let mut common = None;
    for level in 0..depth {
        let candidate = chains[0][level];
        if chains.iter().all(|chain| chain[level].id() == candidate.id()) {
            common = Some(candidate);
        } else {
            break;
        }
    }
    common
}
