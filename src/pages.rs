//! Chapter page list responses.
//!
//! The reader endpoint answers with `{"src": "<img ...><img ...>"}`; the
//! fragment holds one image per page at
//! `/images/gallery/<bookid>/<uuid>/<pagenum>`.

use std::sync::LazyLock;

use indexmap::IndexMap;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::error::ExtractError;
use crate::html;
use crate::site::{PAGE_PATTERN, Site};

static ALL_ELEMENTS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("*"));

#[derive(Debug, Deserialize)]
struct PagesResponse {
    src: String,
}

/// Page image URLs of a chapter, ordered by page number.
pub fn parse_pages_response(body: &str, site: &Site) -> Result<Vec<Url>, ExtractError> {
    let response: PagesResponse = serde_json::from_str(body).map_err(|err| {
        ExtractError::MalformedResponse(format!("chapter pages are not in the expected format: {err}"))
    })?;

    let fragment = Html::parse_fragment(&response.src);
    let mut pages: IndexMap<Url, u32> = IndexMap::new();
    for element in fragment.select(&ALL_ELEMENTS) {
        let Some(src) = html::image_src(element, site.homepage()) else {
            continue;
        };
        let matched = PAGE_PATTERN.match_url(&src);
        if !matched.matches() {
            continue;
        }
        let page = matched
            .get("pagenum")
            .and_then(|page| page.parse::<u32>().ok())
            .ok_or_else(|| {
                ExtractError::MalformedResponse(format!("page number is not numeric: {src}"))
            })?;
        pages.entry(src).or_insert(page);
    }

    if pages.is_empty() {
        return Err(ExtractError::MalformedResponse(
            "chapter pages urls are not in the expected format".to_owned(),
        ));
    }

    pages.sort_by(|_, left, _, right| left.cmp(right));
    tracing::debug!(count = pages.len(), "parsed chapter pages");
    Ok(pages.into_keys().collect())
}
