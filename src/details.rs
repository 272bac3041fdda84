//! Book page details: the label/value "table", title, alerts and description.
//!
//! The details table is a plain stack of `<div>` rows with no stable class
//! names. It is located by looking for the few values that link somewhere
//! recognisable (author/artist/status/origin searches, genre pages, the
//! rating widget) and taking their nearest common ancestor.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::books::{self, Book};
use crate::error::ExtractError;
use crate::html;
use crate::session::Extractor;
use crate::site::{BOOK_PATTERN, GENRE_PATTERN};

static IMAGES: LazyLock<Selector> = LazyLock::new(|| html::static_selector("img"));
static RATINGS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("#ratings"));
static TAGGED_TITLE: LazyLock<Selector> =
    LazyLock::new(|| html::static_selector("h2[itemprop=title]"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| html::static_selector("h2"));
static ALERTS: LazyLock<Selector> = LazyLock::new(|| html::static_selector(".alert, .alert-info"));
static ALERT_HEADING: LazyLock<Selector> = LazyLock::new(|| html::static_selector("h4"));
static ALERT_PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| html::static_selector("p"));
static DESCRIPTION_COLLAPSE: LazyLock<Selector> =
    LazyLock::new(|| html::static_selector("#descriptionCollapse"));
static DESCRIPTION_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| html::static_selector(".description"));

fn label_regex(source: &str) -> Regex {
    Regex::new(&format!("^(?i:{source})$")).expect("static label regex")
}

static LABEL_REGEXES: LazyLock<Vec<(DetailKind, Regex)>> = LazyLock::new(|| {
    DetailKind::ALL
        .iter()
        .map(|kind| (*kind, label_regex(kind.label_pattern())))
        .collect()
});

static KOREA_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(r"kr|korea\s*(?:\(south\))?"));
static CHINA_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(r"cn|china"));
static JAPAN_RE: LazyLock<Regex> = LazyLock::new(|| label_regex(r"jp|japan"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetailKind {
    AltTitle,
    Author,
    Artist,
    Status,
    Origin,
    ReleaseYear,
    UserRating,
    Views,
    Official,
    Purchase,
    Genre,
}

impl DetailKind {
    pub const ALL: [DetailKind; 11] = [
        Self::AltTitle,
        Self::Author,
        Self::Artist,
        Self::Status,
        Self::Origin,
        Self::ReleaseYear,
        Self::UserRating,
        Self::Views,
        Self::Official,
        Self::Purchase,
        Self::Genre,
    ];

    fn label_pattern(self) -> &'static str {
        match self {
            Self::AltTitle => r"(?:alternative|alt\.?) titles?:?",
            Self::Author => r"authors?:?",
            Self::Artist => r"artists?:?",
            Self::Status => r"status:?",
            Self::Origin => r"origin:?",
            Self::ReleaseYear => r"release(?: year)?:?",
            Self::UserRating => r"user ratings?:?",
            Self::Views => r"views?:?",
            Self::Official => r"official:?",
            Self::Purchase => r"purchase:?",
            Self::Genre => r"genres?(?:\(s\))?:?",
        }
    }

    /// Display label used when rendering the detail.
    pub fn label(self) -> &'static str {
        match self {
            Self::AltTitle => "Alt titles:",
            Self::Author => "Authors:",
            Self::Artist => "Artists:",
            Self::Status => "Status:",
            Self::Origin => "Origin:",
            Self::ReleaseYear => "Release year:",
            Self::UserRating => "User rating:",
            Self::Views => "Views:",
            Self::Official => "Official:",
            Self::Purchase => "Purchase:",
            Self::Genre => "Genres:",
        }
    }

    /// Kind whose label matches the whole of `text`, if any.
    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        LABEL_REGEXES
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(kind, _)| *kind)
    }

    /// Elements likely sitting in the value cell of this kind's row.
    fn find<'a>(self, session: &Extractor<'a>) -> Vec<ElementRef<'a>> {
        let with_query = |name: &str| -> Vec<ElementRef<'a>> {
            session
                .site_anchors()
                .iter()
                .filter(|anchor| anchor.url.query_pairs().any(|(key, _)| key == name))
                .map(|anchor| anchor.element)
                .collect()
        };

        match self {
            Self::Author => with_query("author"),
            Self::Artist => with_query("artist"),
            Self::Status => with_query("status"),
            Self::Origin => with_query("origin"),
            Self::UserRating => session.document().select(&RATINGS).collect(),
            Self::Genre => session
                .site_anchors()
                .iter()
                .filter(|anchor| GENRE_PATTERN.match_url(&anchor.url).matches())
                .map(|anchor| anchor.element)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn value(self, cell: ElementRef<'_>) -> String {
        match self {
            Self::UserRating => {
                let ratings = std::iter::once(cell)
                    .chain(cell.select(&RATINGS))
                    .find(|element| element.value().id() == Some("ratings"));
                let stars = ratings.map_or(0, |ratings| {
                    ratings
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|star| {
                            star.value()
                                .classes()
                                .any(|class| class.eq_ignore_ascii_case("text-warning"))
                        })
                        .count()
                });
                match stars {
                    1..=5 => format!("{stars}/5"),
                    _ => "?/5".to_owned(),
                }
            }
            _ => html::text(cell),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailEntry {
    pub kind: DetailKind,
    pub label: String,
    pub value: String,
}

impl DetailEntry {
    fn new(kind: DetailKind, value: String) -> Self {
        Self {
            kind,
            label: kind.label().to_owned(),
            value,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookDetails {
    pub book: Book,
    pub details: IndexMap<DetailKind, DetailEntry>,
    pub alerts: Vec<String>,
    pub description: String,
}

impl BookDetails {
    pub fn get(&self, kind: DetailKind) -> Option<&str> {
        self.details.get(&kind).map(|entry| entry.value.as_str())
    }
}

pub fn extract(session: &Extractor<'_>) -> Result<BookDetails, ExtractError> {
    let location = session.location();
    let matched = BOOK_PATTERN.match_url(location);
    let book_id = match matched.get("bookid") {
        Some(id) if matched.matches() => id.to_owned(),
        _ => return Err(ExtractError::mismatch("book", location)),
    };

    let table = details_table(session);
    let mut details = table.map(read_rows).unwrap_or_default();
    if details.is_empty() {
        tracing::debug!(book_id = %book_id, "no details table found");
    }
    add_origin_genre(&mut details);

    let title = title(session, table)
        .ok_or_else(|| ExtractError::missing("title", format!("book {book_id}")))?;

    let document = session.document();
    let extension = books::thumbnail_extension(document.select(&IMAGES), location);
    let site = session.site();
    let book = Book {
        url: site.book_url(&book_id),
        thumbnail: site.thumbnail_url(&book_id, &extension, None),
        title,
        id: book_id,
    };

    Ok(BookDetails {
        alerts: alerts(session),
        description: description(session, &book.id),
        details,
        book,
    })
}

fn details_table<'a>(session: &Extractor<'a>) -> Option<ElementRef<'a>> {
    let mut found: IndexMap<_, ElementRef<'a>> = IndexMap::new();
    for kind in DetailKind::ALL {
        for element in kind.find(session) {
            found.entry(element.id()).or_insert(element);
        }
    }
    let candidates = found.into_values().collect::<Vec<_>>();
    html::nearest_common_ancestor(&candidates)
}

fn read_rows(table: ElementRef<'_>) -> IndexMap<DetailKind, DetailEntry> {
    let mut details = IndexMap::new();
    for row in table.children().filter_map(ElementRef::wrap) {
        let mut cells = row.children().filter_map(ElementRef::wrap);
        let (Some(label), Some(value)) = (cells.next(), cells.next()) else {
            continue;
        };
        let Some(kind) = DetailKind::from_label(&html::text(label)) else {
            continue;
        };
        details.insert(kind, DetailEntry::new(kind, kind.value(value)));
    }
    details
}

fn origin_genre(origin: &str) -> Option<&'static str> {
    let origin = origin.trim();
    if KOREA_RE.is_match(origin) {
        Some("Manhwa")
    } else if CHINA_RE.is_match(origin) {
        Some("Manhua")
    } else if JAPAN_RE.is_match(origin) {
        Some("Manga")
    } else {
        None
    }
}

fn add_origin_genre(details: &mut IndexMap<DetailKind, DetailEntry>) {
    let Some(genre) = details
        .get(&DetailKind::Origin)
        .and_then(|origin| origin_genre(&origin.value))
    else {
        return;
    };

    match details.get_mut(&DetailKind::Genre) {
        Some(entry) if entry.value.trim().is_empty() => entry.value = genre.to_owned(),
        Some(entry) => entry.value = format!("{}, {genre}", entry.value),
        None => {
            details.insert(DetailKind::Genre, DetailEntry::new(DetailKind::Genre, genre.to_owned()));
        }
    }
}

fn title(session: &Extractor<'_>, table: Option<ElementRef<'_>>) -> Option<String> {
    let document = session.document();
    let heading = [&*TAGGED_TITLE, &*HEADING]
        .into_iter()
        .flat_map(|selector| document.select(selector))
        .map(html::text)
        .find(|text| !text.is_empty());
    if heading.is_some() {
        return heading;
    }

    // the table sits in a wrapper next to the title
    let grandparent = table?
        .parent()
        .and_then(|parent| parent.parent())
        .and_then(ElementRef::wrap)?;
    grandparent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| html::has_own_text(*child))
        .map(html::text)
        .filter(|text| !text.is_empty())
}

fn alerts(session: &Extractor<'_>) -> Vec<String> {
    session
        .document()
        .select(&ALERTS)
        .filter(|alert| !html::is_hidden_by_style(*alert))
        .map(|alert| {
            let mut parts = Vec::new();
            if let Some(heading) = single(alert, &ALERT_HEADING) {
                parts.push(html::whole_text(heading));
            }
            if let Some(paragraph) = single(alert, &ALERT_PARAGRAPH) {
                parts.push(html::whole_text(paragraph));
            }
            if parts.is_empty() {
                parts.push(html::whole_text(alert));
            }
            parts
                .iter()
                .map(|part| part.trim())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|alert| !alert.is_empty())
        .collect()
}

fn single<'a>(element: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    let mut matches = element.select(selector);
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

fn description(session: &Extractor<'_>, book_id: &str) -> String {
    let document = session.document();
    if let Some(collapse) = document.select(&DESCRIPTION_COLLAPSE).next() {
        return html::whole_text(collapse).trim().to_owned();
    }

    let blocks = document
        .select(&DESCRIPTION_BLOCKS)
        .map(|block| html::whole_text(block).trim().to_owned())
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>();
    if blocks.is_empty() {
        tracing::debug!(book_id, "no description found");
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;
    use crate::site::Site;

    const BOOK_PAGE: &str = r#"
        <div class="container">
          <h2 itemprop="title">  The Archmage  </h2>
          <div class="alert alert-info"><h4>Heads up</h4><p>Chapters are being re-uploaded.</p></div>
          <div class="alert" style="display: none">hidden alert</div>
          <img class="cover" src="/images/gallery/77/thumb.png">
          <div class="row">
            <div class="col">
              <div><span>Alt titles:</span><span>Grand Mage</span></div>
              <div><span>Author</span><span><a href="/search?author=Kim">Kim</a></span></div>
              <div><span>Artist:</span><span><a href="/search?artist=Lee">Lee</a></span></div>
              <div><span>Status:</span><span><a href="/search?status=ongoing">Ongoing</a></span></div>
              <div><span>Origin:</span><span><a href="/search?origin=kr">KR</a></span></div>
              <div><span>Release:</span><span>2019</span></div>
              <div><span>User ratings:</span><span id="ratings"><i class="text-warning"></i><i class="text-warning"></i><i class="text-warning"></i><i></i><i></i></span></div>
              <div><span>Genres:</span><span><a href="/genre/action">Action</a></span></div>
              <div><span>Unknown label</span><span>ignored</span></div>
              <div><span>lonely cell</span></div>
            </div>
          </div>
          <div id="descriptionCollapse">
            A mage returns.
          </div>
        </div>"#;

    fn details_of(markup: &str, location: &str) -> Result<BookDetails, ExtractError> {
        let doc = Html::parse_document(markup);
        let site = Site::default();
        let session = Extractor::new(&doc, location, &site)?;
        session.details().cloned()
    }

    #[test]
    fn reads_the_details_table() -> anyhow::Result<()> {
        let details = details_of(BOOK_PAGE, "https://projectsuki.com/book/77")?;

        assert_eq!(details.book.id, "77");
        assert_eq!(details.book.title, "The Archmage");
        assert_eq!(
            details.book.thumbnail.as_str(),
            "https://projectsuki.com/images/gallery/77/thumb.png"
        );

        assert_eq!(details.get(DetailKind::AltTitle), Some("Grand Mage"));
        assert_eq!(details.get(DetailKind::Author), Some("Kim"));
        assert_eq!(details.get(DetailKind::Artist), Some("Lee"));
        assert_eq!(details.get(DetailKind::Status), Some("Ongoing"));
        assert_eq!(details.get(DetailKind::ReleaseYear), Some("2019"));
        assert_eq!(details.get(DetailKind::UserRating), Some("3/5"));
        assert_eq!(details.get(DetailKind::Genre), Some("Action, Manhwa"));
        assert_eq!(details.details.len(), 8);
        assert_eq!(details.details[&DetailKind::Author].label, "Authors:");

        assert_eq!(details.alerts, vec!["Heads up\nChapters are being re-uploaded."]);
        assert_eq!(details.description, "A mage returns.");
        Ok(())
    }

    #[test]
    fn title_falls_back_to_the_tables_grandparent() -> anyhow::Result<()> {
        let details = details_of(
            r#"<section>
                 <span>Fallback Title</span>
                 <div class="row"><div class="col">
                   <div><b>Status</b><a href="/search?status=completed">Completed</a></div>
                   <div><b>Origin</b><a href="/search?origin=cn">China</a></div>
                 </div></div>
               </section>
               <p class="description">First.</p><p class="description">Second.</p>"#,
            "https://projectsuki.com/book/5",
        )?;
        assert_eq!(details.book.title, "Fallback Title");
        assert_eq!(details.get(DetailKind::Genre), Some("Manhua"));
        assert_eq!(details.description, "First.\n\nSecond.");
        assert!(details.alerts.is_empty());
        Ok(())
    }

    #[test]
    fn empty_details_are_not_an_error() -> anyhow::Result<()> {
        let details = details_of("<h2>Only a title</h2>", "https://projectsuki.com/book/1")?;
        assert!(details.details.is_empty());
        assert_eq!(details.description, "");
        Ok(())
    }

    #[test]
    fn non_book_location_is_a_structural_mismatch() {
        let err = details_of("<h2>x</h2>", "https://projectsuki.com/read/1/2/1").err();
        assert!(matches!(
            err,
            Some(ExtractError::StructuralMismatch { pattern: "book", .. })
        ));
    }

    #[test]
    fn missing_title_is_fatal() {
        let err = details_of("<p>no heading</p>", "https://projectsuki.com/book/1").err();
        assert!(matches!(
            err,
            Some(ExtractError::MissingRequiredField { field: "title", .. })
        ));
    }

    #[test]
    fn label_lookup_is_whole_text_and_case_insensitive() {
        assert_eq!(DetailKind::from_label("GENRE(S):"), Some(DetailKind::Genre));
        assert_eq!(DetailKind::from_label("release year"), Some(DetailKind::ReleaseYear));
        assert_eq!(DetailKind::from_label("Authors of note"), None);
    }

    #[test]
    fn every_display_label_reads_back_as_its_kind() {
        for kind in DetailKind::ALL {
            assert_eq!(DetailKind::from_label(kind.label()), Some(kind), "{}", kind.label());
        }
        assert_eq!(DetailKind::from_label("Genre"), Some(DetailKind::Genre));
    }

    #[test]
    fn empty_tagged_title_falls_through_the_chain() -> anyhow::Result<()> {
        let details = details_of(
            r#"<h2 itemprop="title">  </h2><h2>Plain Heading</h2>"#,
            "https://projectsuki.com/book/3",
        )?;
        assert_eq!(details.book.title, "Plain Heading");

        let details = details_of(
            r#"<h2 itemprop="title"></h2>
               <section>
                 <span>Wrapper Title</span>
                 <div class="row"><div class="col">
                   <div><b>Status</b><a href="/search?status=ongoing">Ongoing</a></div>
                   <div><b>Author</b><a href="/search?author=Q">Q</a></div>
                 </div></div>
               </section>"#,
            "https://projectsuki.com/book/4",
        )?;
        assert_eq!(details.book.title, "Wrapper Title");
        Ok(())
    }

    #[test]
    fn origin_maps_to_regional_genre() {
        assert_eq!(origin_genre("Korea (South)"), Some("Manhwa"));
        assert_eq!(origin_genre("cn"), Some("Manhua"));
        assert_eq!(origin_genre("Japan"), Some("Manga"));
        assert_eq!(origin_genre("France"), None);
    }
}
