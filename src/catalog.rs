//! Conversion of extracted data into catalog records.

use indexmap::IndexMap;
use url::Url;

use crate::books::Book;
use crate::chapters::ChapterRecord;
use crate::config::LanguageFilter;
use crate::details::{BookDetails, DetailKind};
use crate::error::ExtractError;
use crate::formats::{
    BookRecord, ChapterEntry, PageRecord, PublishingStatus, SearchHitRecord, UpdateStrategy,
    WorkRecord,
};
use crate::search::SearchHit;
use crate::site::{ScanGroup, Site};

const DESCRIPTION_DIVIDER: &str = "/=/-/=/-/=/-/=/-/=/-/=/-/=/-/=/";
const ALERTS_NOTICE: &str =
    "Alerts have been found, refreshing the book later might help in removing them.";

/// Books shown on a full listing page.
pub const LISTING_PAGE_SIZE: usize = 30;

/// A full listing page suggests the listing continues on the next one.
pub fn has_next_page(book_count: usize) -> bool {
    book_count >= LISTING_PAGE_SIZE
}

pub fn book_record(book: &Book) -> BookRecord {
    BookRecord {
        id: book.id.clone(),
        title: book.title.clone(),
        url: book.url.to_string(),
        thumbnail_url: book.thumbnail.to_string(),
    }
}

pub fn publishing_status(status: Option<&str>) -> PublishingStatus {
    match status.map(|status| status.trim().to_lowercase()).as_deref() {
        Some("ongoing") => PublishingStatus::Ongoing,
        Some("completed") => PublishingStatus::Completed,
        Some("hiatus") => PublishingStatus::OnHiatus,
        Some("cancelled") => PublishingStatus::Cancelled,
        _ => PublishingStatus::Unknown,
    }
}

pub fn update_strategy(status: PublishingStatus) -> UpdateStrategy {
    match status {
        PublishingStatus::Completed | PublishingStatus::Cancelled => UpdateStrategy::OnlyFetchOnce,
        _ => UpdateStrategy::AlwaysUpdate,
    }
}

/// Alerts first, then the synopsis, then one `label  value` line per detail.
pub fn compose_description(details: &BookDetails) -> String {
    let mut out = String::new();

    if !details.alerts.is_empty() {
        out.push_str(ALERTS_NOTICE);
        out.push_str("\n\n");
        for alert in &details.alerts {
            out.push_str(alert);
            out.push_str("\n\n");
        }
        out.push_str(DESCRIPTION_DIVIDER);
        out.push_str("\n\n");
    }

    if !details.description.is_empty() {
        out.push_str(&details.description);
        out.push_str("\n\n");
    }

    out.push_str(DESCRIPTION_DIVIDER);
    out.push_str("\n\n");
    for entry in details.details.values() {
        out.push_str(&entry.label);
        out.push_str("  ");
        out.push_str(entry.value.trim());
        out.push('\n');
    }

    out.trim_end().to_owned()
}

pub fn work_record(details: &BookDetails, site: &Site) -> Result<WorkRecord, ExtractError> {
    let status = publishing_status(details.get(DetailKind::Status));
    Ok(WorkRecord {
        url: site.relative(&details.book.url)?,
        title: details.book.title.clone(),
        thumbnail_url: details.book.thumbnail.to_string(),
        author: details.get(DetailKind::Author).map(str::to_owned),
        artist: details.get(DetailKind::Artist).map(str::to_owned),
        status,
        genre: details.get(DetailKind::Genre).map(str::to_owned),
        description: compose_description(details),
        update_strategy: update_strategy(status),
    })
}

/// Flattens every group into one list, newest chapter first.
pub fn chapter_list(
    chapters: &IndexMap<ScanGroup, Vec<ChapterRecord>>,
    languages: &LanguageFilter,
    site: &Site,
) -> Result<Vec<ChapterEntry>, ExtractError> {
    let mut selected = chapters
        .values()
        .flatten()
        .filter(|chapter| languages.allows(&chapter.language))
        .collect::<Vec<_>>();

    selected.sort_by(|a, b| {
        b.number
            .cmp(&a.number)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.language.cmp(&b.language))
    });

    selected
        .into_iter()
        .map(|chapter| {
            let number = chapter
                .number
                .ok_or_else(|| ExtractError::missing("chapter number", &chapter.title))?;
            Ok(ChapterEntry {
                url: site.relative(&chapter.url)?,
                name: chapter.title.clone(),
                date_upload: chapter.added.map_or(0, |added| added.timestamp_millis()),
                scanlator: format!("{} | {}", chapter.group, capitalize(&chapter.language)),
                chapter_number: number.as_f32(),
            })
        })
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn page_records(pages: &[Url]) -> Vec<PageRecord> {
    pages
        .iter()
        .enumerate()
        .map(|(index, url)| PageRecord {
            index,
            image_url: url.to_string(),
        })
        .collect()
}

pub fn search_hit_records(hits: &[SearchHit], site: &Site) -> Vec<SearchHitRecord> {
    hits.iter()
        .map(|hit| SearchHitRecord {
            book_id: hit.book_id.clone(),
            title: hit.title.clone(),
            url: site.book_url(&hit.book_id).to_string(),
            matches: Some(hit.matches),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};

    use super::*;
    use crate::chapter_number::ChapterNumber;
    use crate::details::DetailEntry;

    fn chapter(id: u32, number: (u32, u32), group: &str, language: &str) -> ChapterRecord {
        let site = Site::default();
        ChapterRecord {
            url: site.chapter_url("42", &id.to_string(), 1),
            book_id: "42".into(),
            chapter_id: id.to_string(),
            start_page: Some("1".into()),
            title: format!("Chapter {}", ChapterNumber::new(number.0, number.1)),
            number: Some(ChapterNumber::new(number.0, number.1)),
            group: group.into(),
            added: None,
            language: language.into(),
        }
    }

    fn details(alerts: Vec<String>, description: &str) -> BookDetails {
        let site = Site::default();
        let mut entries = IndexMap::new();
        for (kind, label, value) in [
            (DetailKind::Author, "Authors:", " Kim "),
            (DetailKind::Status, "Status:", "Completed"),
        ] {
            entries.insert(
                kind,
                DetailEntry {
                    kind,
                    label: label.into(),
                    value: value.into(),
                },
            );
        }
        BookDetails {
            book: Book {
                id: "42".into(),
                title: "Title".into(),
                url: site.book_url("42"),
                thumbnail: site.thumbnail_url("42", "jpg", None),
            },
            details: entries,
            alerts,
            description: description.into(),
        }
    }

    #[test]
    fn only_full_listing_pages_have_a_next_page() {
        assert!(!has_next_page(0));
        assert!(!has_next_page(LISTING_PAGE_SIZE - 1));
        assert!(has_next_page(LISTING_PAGE_SIZE));
    }

    #[test]
    fn status_text_maps_to_publishing_status() {
        assert_eq!(publishing_status(Some(" Ongoing ")), PublishingStatus::Ongoing);
        assert_eq!(publishing_status(Some("HIATUS")), PublishingStatus::OnHiatus);
        assert_eq!(publishing_status(Some("dropped")), PublishingStatus::Unknown);
        assert_eq!(publishing_status(None), PublishingStatus::Unknown);
        assert_eq!(update_strategy(PublishingStatus::Cancelled), UpdateStrategy::OnlyFetchOnce);
        assert_eq!(update_strategy(PublishingStatus::Ongoing), UpdateStrategy::AlwaysUpdate);
    }

    #[test]
    fn description_lists_alerts_then_synopsis_then_details() {
        let composed = compose_description(&details(vec!["Re-uploading".into()], "A story."));
        assert_eq!(
            composed,
            format!(
                "{ALERTS_NOTICE}\n\nRe-uploading\n\n{DESCRIPTION_DIVIDER}\n\nA story.\n\n\
                 {DESCRIPTION_DIVIDER}\n\nAuthors:  Kim\nStatus:  Completed"
            )
        );

        let plain = compose_description(&details(Vec::new(), ""));
        assert_eq!(plain, format!("{DESCRIPTION_DIVIDER}\n\nAuthors:  Kim\nStatus:  Completed"));
    }

    #[test]
    fn work_record_uses_relative_url() -> anyhow::Result<()> {
        let work = work_record(&details(Vec::new(), "x"), &Site::default())?;
        assert_eq!(work.url, "book/42");
        assert_eq!(work.author.as_deref(), Some(" Kim "));
        assert_eq!(work.status, PublishingStatus::Completed);
        assert_eq!(work.update_strategy, UpdateStrategy::OnlyFetchOnce);
        assert_eq!(work.genre, None);
        Ok(())
    }

    #[test]
    fn chapter_list_sorts_and_filters() -> anyhow::Result<()> {
        let mut groups: IndexMap<ScanGroup, Vec<ChapterRecord>> = IndexMap::new();
        groups.insert(
            "Beta".into(),
            vec![chapter(1, (2, 0), "Beta", "english"), chapter(2, (1, 5), "Beta", "spanish")],
        );
        groups.insert(
            "Alpha".into(),
            vec![
                chapter(3, (2, 0), "Alpha", "unknown"),
                chapter(4, (10, 0), "Alpha", "french"),
            ],
        );
        groups["Alpha"][0].added = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let filter = LanguageFilter {
            whitelist: vec!["english".into(), "spanish".into()],
            blacklist: vec!["spanish".into()],
        };
        let entries = chapter_list(&groups, &filter, &Site::default())?;

        let summary = entries
            .iter()
            .map(|entry| (entry.url.as_str(), entry.scanlator.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![("read/42/3/1", "Alpha | Unknown"), ("read/42/1/1", "Beta | English")]
        );
        assert_eq!(entries[0].date_upload, 1_704_067_200_000);
        assert_eq!(entries[1].date_upload, 0);
        assert_eq!(entries[1].chapter_number, 2.0);
        Ok(())
    }

    #[test]
    fn chapter_list_without_filter_keeps_everything() -> anyhow::Result<()> {
        let mut groups: IndexMap<ScanGroup, Vec<ChapterRecord>> = IndexMap::new();
        groups.insert(
            "G".into(),
            vec![chapter(1, (1, 0), "G", "english"), chapter(2, (1, 5), "G", "english")],
        );
        let entries = chapter_list(&groups, &LanguageFilter::default(), &Site::default())?;
        assert_eq!(entries.len(), 2);
        assert!((entries[0].chapter_number - 1.5).abs() < 1e-5);
        Ok(())
    }
}
