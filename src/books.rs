//! Book discovery from the links of any catalog page.
//!
//! Listing pages are hand-written and shift around often, so nothing here
//! relies on fixed markup: every in-domain link to `/book/<id>` is a
//! candidate, and title and thumbnail come from positional heuristics.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use scraper::{ElementRef, Selector};
use serde::Serialize;
use url::Url;

use crate::error::ExtractError;
use crate::html;
use crate::session::Extractor;
use crate::site::{BOOK_PATTERN, BookId, THUMBNAIL_PATTERN};

static IMAGES: LazyLock<Selector> = LazyLock::new(|| html::static_selector("img"));

const SHOW_MORE: &str = "show more";

/// A discovered book. Equality and hashing only look at `id`.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub url: Url,
    pub thumbnail: Url,
}

impl PartialEq for Book {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Book {}

impl Hash for Book {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

pub fn extract(session: &Extractor<'_>) -> Result<IndexSet<Book>, ExtractError> {
    let mut containers: IndexMap<BookId, Vec<ElementRef<'_>>> = IndexMap::new();
    for anchor in session.site_anchors() {
        let matched = BOOK_PATTERN.match_url(&anchor.url);
        if !matched.matches() {
            continue;
        }
        if let Some(id) = matched.get("bookid") {
            containers.entry(id.to_owned()).or_default().push(anchor.element);
        }
    }

    let site = session.site();
    let mut books = IndexSet::with_capacity(containers.len());
    for (id, elements) in containers {
        let images = elements.iter().flat_map(|element| element.select(&IMAGES));
        let extension = thumbnail_extension(images, session.location());

        let title = title(&elements).ok_or_else(|| ExtractError::missing("title", format!("book {id}")))?;

        books.insert(Book {
            url: site.book_url(&id),
            thumbnail: site.thumbnail_url(&id, &extension, None),
            title,
            id,
        });
    }

    tracing::debug!(count = books.len(), "extracted books");
    Ok(books)
}

/// Extension of the first image pointing at a book thumbnail, or `""`.
pub(crate) fn thumbnail_extension<'a>(
    images: impl IntoIterator<Item = ElementRef<'a>>,
    base: &Url,
) -> String {
    images
        .into_iter()
        .filter_map(|image| html::image_src(image, base))
        .map(|src| THUMBNAIL_PATTERN.match_url(&src))
        .find(|matched| matched.matches())
        .and_then(|matched| matched.get("thumbextension").map(str::to_owned))
        .unwrap_or_default()
}

fn title(containers: &[ElementRef<'_>]) -> Option<String> {
    containers
        .iter()
        .filter(|container| container.select(&IMAGES).next().is_none())
        .filter(|container| !html::has_ancestor_named(**container, "small"))
        .map(|container| html::own_text(*container))
        .find(|text| !text.is_empty() && !text.eq_ignore_ascii_case(SHOW_MORE))
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;
    use crate::site::Site;

    fn books_of(markup: &str) -> Result<IndexSet<Book>, ExtractError> {
        let doc = Html::parse_document(markup);
        let site = Site::default();
        let session = Extractor::new(&doc, "https://projectsuki.com/browse", &site)?;
        session.books().cloned()
    }

    #[test]
    fn groups_links_by_book_id() -> anyhow::Result<()> {
        let books = books_of(
            r#"<div class="card">
                 <a href="/book/42"><img data-src="/images/gallery/42/thumb.webp"></a>
                 <a href="/book/42">Solo Leveling</a>
                 <small><a href="/book/42">chapter 3</a></small>
                 <a href="/book/42?ref=home">SHOW MORE</a>
               </div>
               <a href="https://projectsuki.com/book/7/">Omniscient Reader</a>
               <a href="/search?author=x">Someone</a>"#,
        )?;

        let collected = books.iter().collect::<Vec<_>>();
        assert_eq!(collected.len(), 2);

        assert_eq!(collected[0].id, "42");
        assert_eq!(collected[0].title, "Solo Leveling");
        assert_eq!(collected[0].url.as_str(), "https://projectsuki.com/book/42");
        assert_eq!(
            collected[0].thumbnail.as_str(),
            "https://projectsuki.com/images/gallery/42/thumb.webp"
        );

        assert_eq!(collected[1].id, "7");
        assert_eq!(
            collected[1].thumbnail.as_str(),
            "https://projectsuki.com/images/gallery/7/thumb"
        );
        Ok(())
    }

    #[test]
    fn identity_is_the_id_alone() {
        let site = Site::default();
        let a = Book {
            id: "1".into(),
            title: "First".into(),
            url: site.book_url("1"),
            thumbnail: site.thumbnail_url("1", "", None),
        };
        let b = Book {
            title: "Other title".into(),
            thumbnail: site.thumbnail_url("1", "png", None),
            ..a.clone()
        };

        let mut set = IndexSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].title, "First");
    }

    #[test]
    fn first_text_link_wins_the_title() -> anyhow::Result<()> {
        let books = books_of(
            r#"<a href="/book/3">Alpha</a><a href="/book/3">Beta</a>"#,
        )?;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Alpha");
        Ok(())
    }

    #[test]
    fn book_without_any_title_is_fatal() {
        let err = books_of(r#"<a href="/book/9"><img src="/images/gallery/9/thumb.jpg"></a>"#)
            .err();
        assert!(matches!(
            err,
            Some(ExtractError::MissingRequiredField { field: "title", .. })
        ));
    }

    #[test]
    fn look_alike_hosts_are_not_books() -> anyhow::Result<()> {
        let books = books_of(
            r#"<a href="https://evilprojectsuki.com/book/666">Phish</a>
               <a href="https://www.projectsuki.com/book/8">Real One</a>"#,
        )?;
        let ids = books.iter().map(|book| book.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["8"]);
        Ok(())
    }

    #[test]
    fn pages_without_books_yield_an_empty_set() -> anyhow::Result<()> {
        assert!(books_of("<p>nothing here</p>")?.is_empty());
        Ok(())
    }
}
