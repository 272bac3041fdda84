//! Book search: the full id/title listing, a simple word-count ranking and
//! resolution of queries that are really book or chapter URLs.

use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error::ExtractError;
use crate::site::{BOOK_PATTERN, BookId, CHAPTER_PATTERN, Site};

static WORDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[[:alnum:]]+").unwrap());

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: IndexMap<BookId, SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    value: String,
}

/// Parses `{"data": {"<id>": {"value": "<title>"}}}` keeping listing order.
pub fn parse_book_search_response(body: &str) -> Result<IndexMap<BookId, String>, ExtractError> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|err| {
        ExtractError::MalformedResponse(format!("books data is not in the expected format: {err}"))
    })?;

    Ok(response
        .data
        .into_iter()
        .map(|(id, entry)| (id, entry.value))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub book_id: BookId,
    pub title: String,
    /// Total occurrences of the query words in the title.
    pub matches: usize,
}

/// Ranks every title containing at least one query word, best first.
pub fn simple_search(books: &IndexMap<BookId, String>, query: &str) -> Vec<SearchHit> {
    let words = WORDS
        .find_iter(query)
        .map(|word| word.as_str().to_lowercase())
        .collect::<IndexSet<_>>();

    let mut hits = books
        .iter()
        .map(|(book_id, title)| {
            let title_lower = title.to_lowercase();
            let matches = words
                .iter()
                .map(|word| count_overlapping(&title_lower, word))
                .sum();
            SearchHit {
                book_id: book_id.clone(),
                title: title.clone(),
                matches,
            }
        })
        .filter(|hit| hit.matches > 0)
        .collect::<Vec<_>>();

    hits.sort_by(|a, b| b.matches.cmp(&a.matches).then_with(|| a.title.cmp(&b.title)));
    hits
}

fn count_overlapping(haystack: &str, needle: &str) -> usize {
    let Some(step) = needle.chars().next().map(char::len_utf8) else {
        return 0;
    };

    let mut count = 0;
    let mut start = 0;
    while let Some(found) = haystack.get(start..).and_then(|rest| rest.find(needle)) {
        count += 1;
        start += found + step;
    }
    count
}

/// Book id of a query that is a book or chapter URL, absolute or relative
/// to the homepage.
pub fn resolve_query(site: &Site, query: &str) -> Option<BookId> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let url = Url::parse(query)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| site.absolute(query).ok())?;
    if !site.is_in_domain(&url) {
        return None;
    }

    [&*BOOK_PATTERN, &*CHAPTER_PATTERN].into_iter().find_map(|pattern| {
        let matched = pattern.match_url(&url);
        matched
            .matches()
            .then(|| matched.get("bookid").map(str::to_owned))
            .flatten()
            .filter(|id| !id.trim().is_empty())
    })
}
