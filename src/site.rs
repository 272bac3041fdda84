//! Site profile: where the catalog lives and what its URLs look like.

use std::sync::LazyLock;

use url::Url;

use crate::error::ExtractError;
use crate::path_match::PathPattern;

pub type BookId = String;
pub type ChapterId = String;
pub type ScanGroup = String;

pub const DEFAULT_HOMEPAGE: &str = "https://projectsuki.com";

/// Used when a chapters table has no language column.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

fn pattern(slots: &[Option<&str>]) -> PathPattern {
    PathPattern::new(slots.iter().copied()).expect("static path pattern")
}

/// `/book/<bookid>`
pub static BOOK_PATTERN: LazyLock<PathPattern> =
    LazyLock::new(|| pattern(&[Some("book"), Some("(?<bookid>.+)")]));

/// `/read/<bookid>/<chapterid>/<startpage>`
pub static CHAPTER_PATTERN: LazyLock<PathPattern> = LazyLock::new(|| {
    pattern(&[
        Some("read"),
        Some("(?<bookid>.+)"),
        Some("(?<chapterid>.+)"),
        Some("(?<startpage>.+)"),
    ])
});

/// `/images/gallery/<bookid>/[<width>-]thumb[.<ext>]`
pub static THUMBNAIL_PATTERN: LazyLock<PathPattern> = LazyLock::new(|| {
    pattern(&[
        Some("images"),
        Some("gallery"),
        Some("(?<bookid>.+)"),
        Some(r"(?<thumbwidth>\d+-)?thumb(?:\.(?<thumbextension>.+))?"),
    ])
});

/// `/images/gallery/<bookid>/<uuid>/<pagenum>`
pub static PAGE_PATTERN: LazyLock<PathPattern> = LazyLock::new(|| {
    pattern(&[
        Some("images"),
        Some("gallery"),
        Some("(?<bookid>.+)"),
        Some("(?<uuid>.+)"),
        Some("(?<pagenum>.+)"),
    ])
});

/// `/genre/<genre>`
pub static GENRE_PATTERN: LazyLock<PathPattern> =
    LazyLock::new(|| pattern(&[Some("genre"), Some("(?<genre>.+)")]));

#[derive(Debug, Clone)]
pub struct Site {
    homepage: Url,
}

impl Site {
    pub fn new(homepage: Url) -> Self {
        Self { homepage }
    }

    pub fn homepage(&self) -> &Url {
        &self.homepage
    }

    /// Whether `url` points somewhere on this site (subdomains included).
    pub fn is_in_domain(&self, url: &Url) -> bool {
        match (url.host_str(), self.homepage.host_str()) {
            (Some(host), Some(home)) => {
                host == home
                    || host
                        .strip_suffix(home)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            _ => false,
        }
    }

    fn with_segments<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.homepage.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(segments);
        }
        url
    }

    pub fn book_url(&self, book_id: &str) -> Url {
        self.with_segments(["book", book_id])
    }

    /// Not every URL built here has to point at an existing asset.
    pub fn thumbnail_url(&self, book_id: &str, extension: &str, size: Option<u32>) -> Url {
        let file = match (size, extension.trim().is_empty()) {
            (None, true) => "thumb".to_owned(),
            (None, false) => format!("thumb.{extension}"),
            (Some(size), true) => format!("{size}-thumb"),
            (Some(size), false) => format!("{size}-thumb.{extension}"),
        };
        self.with_segments(["images", "gallery", book_id, file.as_str()])
    }

    pub fn chapter_url(&self, book_id: &str, chapter_id: &str, start_page: u32) -> Url {
        let start_page = start_page.to_string();
        self.with_segments(["read", book_id, chapter_id, start_page.as_str()])
    }

    /// Path, query and fragment of `url` without the leading `/`.
    pub fn relative(&self, url: &Url) -> Result<String, ExtractError> {
        if url.scheme() != self.homepage.scheme()
            || url.host_str() != self.homepage.host_str()
            || url.port_or_known_default() != self.homepage.port_or_known_default()
        {
            return Err(ExtractError::mismatch("homepage", url));
        }

        let mut relative = url.path().trim_start_matches('/').to_owned();
        if let Some(query) = url.query() {
            relative.push('?');
            relative.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            relative.push('#');
            relative.push_str(fragment);
        }
        Ok(relative)
    }

    /// Resolves a relative path produced by [`Site::relative`] back to an absolute URL.
    pub fn absolute(&self, relative: &str) -> Result<Url, ExtractError> {
        let base = self.with_segments([""]);
        base.join(relative)
            .map_err(|_| ExtractError::mismatch("homepage", relative))
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_HOMEPAGE).expect("static homepage url"))
    }
}
