//! Per-document extraction session.
//!
//! Every derived property is computed at most once and cached for the
//! lifetime of the [`Extractor`]. Failures are not cached: asking again
//! recomputes and fails again.

use std::cell::OnceCell;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::books::{self, Book};
use crate::chapters::{self, ChapterRecord};
use crate::details::{self, BookDetails};
use crate::error::ExtractError;
use crate::html;
use crate::inference::InferencePolicy;
use crate::site::{ScanGroup, Site};

static HREF_ANCHORS: LazyLock<Selector> = LazyLock::new(|| html::static_selector("a[href]"));

/// An `<a href>` together with its resolved absolute target.
#[derive(Debug, Clone)]
pub struct Anchor<'a> {
    pub element: ElementRef<'a>,
    pub url: Url,
}

pub struct Extractor<'a> {
    document: &'a Html,
    location: Url,
    site: &'a Site,
    now: DateTime<Utc>,
    policy: InferencePolicy,

    all_href_anchors: OnceCell<Vec<Anchor<'a>>>,
    site_anchors: OnceCell<Vec<Anchor<'a>>>,
    books: OnceCell<IndexSet<Book>>,
    details: OnceCell<BookDetails>,
    chapters: OnceCell<IndexMap<ScanGroup, Vec<ChapterRecord>>>,
}

impl<'a> Extractor<'a> {
    /// `location` is the absolute URL the document was served from.
    pub fn new(document: &'a Html, location: &str, site: &'a Site) -> Result<Self, ExtractError> {
        let location = Url::parse(location.trim())
            .ok()
            .filter(|url| url.host_str().is_some())
            .ok_or_else(|| ExtractError::InvalidLocation(location.to_owned()))?;

        Ok(Self {
            document,
            location,
            site,
            now: Utc::now(),
            policy: InferencePolicy::default(),
            all_href_anchors: OnceCell::new(),
            site_anchors: OnceCell::new(),
            books: OnceCell::new(),
            details: OnceCell::new(),
            chapters: OnceCell::new(),
        })
    }

    /// Reference time for relative dates such as "3 days ago".
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_policy(mut self, policy: InferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn document(&self) -> &'a Html {
        self.document
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn site(&self) -> &'a Site {
        self.site
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn policy(&self) -> InferencePolicy {
        self.policy
    }

    /// Every anchor whose `href` resolves to a well-formed absolute URL.
    pub fn all_href_anchors(&self) -> &[Anchor<'a>] {
        self.all_href_anchors.get_or_init(|| {
            self.document
                .select(&HREF_ANCHORS)
                .filter_map(|element| {
                    let href = element.value().attr("href")?;
                    let url = html::absolute_url(&self.location, href)?;
                    Some(Anchor { element, url })
                })
                .collect()
        })
    }

    /// Anchors pointing somewhere on the configured site.
    pub fn site_anchors(&self) -> &[Anchor<'a>] {
        self.site_anchors.get_or_init(|| {
            self.all_href_anchors()
                .iter()
                .filter(|anchor| self.site.is_in_domain(&anchor.url))
                .cloned()
                .collect()
        })
    }

    pub fn books(&self) -> Result<&IndexSet<Book>, ExtractError> {
        memoized(&self.books, "Extractor.books", || books::extract(self))
    }

    pub fn details(&self) -> Result<&BookDetails, ExtractError> {
        memoized(&self.details, "Extractor.details", || details::extract(self))
    }

    pub fn chapters(&self) -> Result<&IndexMap<ScanGroup, Vec<ChapterRecord>>, ExtractError> {
        memoized(&self.chapters, "Extractor.chapters", || chapters::extract(self))
    }
}

fn memoized<'s, T>(
    cell: &'s OnceCell<T>,
    location: &'static str,
    compute: impl FnOnce() -> Result<T, ExtractError>,
) -> Result<&'s T, ExtractError> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    match compute() {
        Ok(value) => Ok(cell.get_or_init(|| value)),
        Err(err) => {
            tracing::warn!(location, error = %err, "extraction failed, the site structure has likely changed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_location_is_rejected() {
        let doc = Html::parse_document("<p></p>");
        let site = Site::default();
        let err = Extractor::new(&doc, "/book/1", &site).err();
        assert!(matches!(err, Some(ExtractError::InvalidLocation(_))));
    }

    #[test]
    fn anchors_resolve_against_location_and_filter_by_domain() -> anyhow::Result<()> {
        let doc = Html::parse_document(
            r#"<a href="/book/1">One</a>
               <a href="https://cdn.projectsuki.com/x">Cdn</a>
               <a href="https://example.com/book/2">Elsewhere</a>
               <a href="  ">Blank</a>"#,
        );
        let site = Site::default();
        let session = Extractor::new(&doc, "https://projectsuki.com/browse", &site)?;

        assert_eq!(session.all_href_anchors().len(), 3);
        let site_urls = session
            .site_anchors()
            .iter()
            .map(|anchor| anchor.url.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            site_urls,
            vec!["https://projectsuki.com/book/1", "https://cdn.projectsuki.com/x"]
        );
        Ok(())
    }

    #[test]
    fn memoized_values_are_computed_once() -> anyhow::Result<()> {
        let doc = Html::parse_document(r#"<a href="/book/7">Seven</a>"#);
        let site = Site::default();
        let session = Extractor::new(&doc, "https://projectsuki.com/", &site)?;

        let first = session.books()?;
        let second = session.books()?;
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.len(), 1);
        Ok(())
    }

    #[test]
    fn failures_are_not_cached() {
        let cell: OnceCell<u32> = OnceCell::new();
        let failed = memoized(&cell, "test", || Err(ExtractError::MalformedResponse("x".into())));
        assert!(failed.is_err());
        assert_eq!(memoized(&cell, "test", || Ok(3)).ok(), Some(&3));
        assert_eq!(memoized(&cell, "test", || Ok(4)).ok(), Some(&3));
    }
}
