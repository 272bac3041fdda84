//! Chapter tables of a book page.
//!
//! Columns are recognised by their header text, so reordered or extra
//! columns do not matter. Only tables whose header names every required
//! column contribute chapters.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::Serialize;
use url::Url;

use crate::chapter_number::ChapterNumber;
use crate::dates;
use crate::error::{ExtractError, InferenceError};
use crate::html;
use crate::inference::{self, InferencePolicy};
use crate::session::Extractor;
use crate::site::{BookId, CHAPTER_PATTERN, ChapterId, ScanGroup, UNKNOWN_LANGUAGE};

static TABLES: LazyLock<Selector> = LazyLock::new(|| html::static_selector("table"));
static THEAD: LazyLock<Selector> = LazyLock::new(|| html::static_selector("thead"));
static TBODY: LazyLock<Selector> = LazyLock::new(|| html::static_selector("tbody"));
static ROWS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("tr"));
static HEADER_CELLS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("td, th"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("a[href]"));

static ROLE_REGEXES: LazyLock<Vec<(ColumnRole, Regex)>> = LazyLock::new(|| {
    ColumnRole::ALL
        .iter()
        .map(|role| {
            let regex = Regex::new(&format!("^(?i:{})$", role.header_pattern()))
                .expect("static column header regex");
            (*role, regex)
        })
        .collect()
});

/// What a column of a chapters table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    /// Chapter title, usually carrying the chapter number and the link.
    Chapter,
    Group,
    /// Upload date.
    Added,
    Language,
    Views,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 5] = [
        Self::Chapter,
        Self::Group,
        Self::Added,
        Self::Language,
        Self::Views,
    ];

    pub fn is_required(self) -> bool {
        matches!(self, Self::Chapter | Self::Group | Self::Added)
    }

    fn header_pattern(self) -> &'static str {
        match self {
            Self::Chapter => "chapters?",
            Self::Group => "groups?",
            Self::Added => "added|date",
            Self::Language => "language",
            Self::Views => r"views?(?:\s*count)?",
        }
    }

    pub fn is_represented_by(self, header: &str) -> bool {
        ROLE_REGEXES
            .iter()
            .any(|(role, regex)| *role == self && regex.is_match(header.trim()))
    }
}

/// Maps each recognised role to its column index. A later column with the
/// same role wins.
pub fn detect_roles(headers: &[String]) -> IndexMap<ColumnRole, usize> {
    let mut roles = IndexMap::new();
    for (column, header) in headers.iter().enumerate() {
        for role in ColumnRole::ALL {
            if role.is_represented_by(header) {
                roles.insert(role, column);
            }
        }
    }
    roles
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterRecord {
    pub url: Url,
    pub book_id: BookId,
    pub chapter_id: ChapterId,
    pub start_page: Option<String>,
    pub title: String,
    pub number: Option<ChapterNumber>,
    pub group: ScanGroup,
    pub added: Option<DateTime<Utc>>,
    pub language: String,
}

struct ChapterTable<'a> {
    roles: IndexMap<ColumnRole, usize>,
    rows: Vec<Vec<ElementRef<'a>>>,
}

fn analyze(table: ElementRef<'_>) -> Option<ChapterTable<'_>> {
    let thead = table.select(&THEAD).next()?;
    let tbody = table.select(&TBODY).next()?;

    let roles = thead
        .select(&ROWS)
        .map(|row| {
            let headers = row.select(&HEADER_CELLS).map(html::text).collect::<Vec<_>>();
            detect_roles(&headers)
        })
        .find(|roles| {
            ColumnRole::ALL
                .iter()
                .filter(|role| role.is_required())
                .all(|role| roles.contains_key(role))
        })?;

    let rows = tbody
        .select(&ROWS)
        .map(|row| row.children().filter_map(ElementRef::wrap).collect::<Vec<_>>())
        .filter(|cells| cells.len() == roles.len())
        .collect();

    Some(ChapterTable { roles, rows })
}

pub fn extract(
    session: &Extractor<'_>,
) -> Result<IndexMap<ScanGroup, Vec<ChapterRecord>>, ExtractError> {
    let mut chapters: IndexMap<ScanGroup, Vec<ChapterRecord>> = IndexMap::new();

    for (table_index, table) in session.document().select(&TABLES).enumerate() {
        let Some(table) = analyze(table) else {
            tracing::debug!(table_index, "skipping table without a chapters header");
            continue;
        };

        let mut by_group: IndexMap<ScanGroup, Vec<ChapterRecord>> = IndexMap::new();
        for cells in &table.rows {
            let record = read_row(session, &table.roles, cells)?;
            by_group.entry(record.group.clone()).or_default().push(record);
        }

        for (group, mut records) in by_group {
            fill_numbers(&mut records, session.policy()).map_err(|source| {
                ExtractError::Inference {
                    group: group.clone(),
                    source,
                }
            })?;
            chapters.entry(group).or_default().extend(records);
        }
    }

    tracing::debug!(
        groups = chapters.len(),
        chapters = chapters.values().map(Vec::len).sum::<usize>(),
        "extracted chapters"
    );
    Ok(chapters)
}

fn read_row(
    session: &Extractor<'_>,
    roles: &IndexMap<ColumnRole, usize>,
    cells: &[ElementRef<'_>],
) -> Result<ChapterRecord, ExtractError> {
    let cell = |role: ColumnRole| roles.get(&role).and_then(|column| cells.get(*column)).copied();
    let required = |role: ColumnRole| {
        cell(role).ok_or_else(|| ExtractError::missing("chapter column", format!("{role:?}")))
    };

    let chapter = required(ColumnRole::Chapter)?;
    let title = html::text(chapter);

    let href = chapter
        .select(&LINKS)
        .next()
        .and_then(|link| link.value().attr("href"))
        .ok_or_else(|| ExtractError::missing("chapter url", &title))?;
    let url = html::absolute_url(session.location(), href)
        .ok_or_else(|| ExtractError::mismatch("chapter", href))?;

    let matched = CHAPTER_PATTERN.match_url(&url);
    let (true, Some(book_id), Some(chapter_id)) = (
        matched.matches(),
        matched.get("bookid"),
        matched.get("chapterid"),
    ) else {
        return Err(ExtractError::mismatch("chapter", &url));
    };
    let book_id = book_id.to_owned();
    let chapter_id = chapter_id.to_owned();
    let start_page = matched.get("startpage").map(str::to_owned);

    let added_text = html::text(required(ColumnRole::Added)?);
    let added = dates::parse_chapter_date(&added_text, session.now());
    if added.is_none() && !added_text.is_empty() {
        tracing::debug!(date = %added_text, chapter = %title, "unrecognised chapter date");
    }

    let language = cell(ColumnRole::Language)
        .map(|language| html::text(language).trim().to_lowercase())
        .filter(|language| !language.is_empty())
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_owned());

    let number = ChapterNumber::parse(&title)
        .map_err(|err| ExtractError::missing("chapter number", format!("{title:?} ({err})")))?;

    Ok(ChapterRecord {
        number,
        group: html::text(required(ColumnRole::Group)?),
        url,
        book_id,
        chapter_id,
        start_page,
        title,
        added,
        language,
    })
}

fn fill_numbers(
    records: &mut [ChapterRecord],
    policy: InferencePolicy,
) -> Result<(), InferenceError> {
    let numbers = records.iter().map(|record| record.number).collect::<Vec<_>>();
    let filled = inference::infer_missing(&numbers, policy)?;
    for (record, number) in records.iter_mut().zip(filled) {
        record.number = Some(number);
    }
    Ok(())
}
