//! Matching of URL path segments against per-segment slot patterns.

use regex::Regex;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum PathPatternError {
    #[error("a path pattern needs at least one slot")]
    Empty,

    #[error("invalid regex in slot {index}")]
    Regex {
        index: usize,
        #[source]
        source: regex::Error,
    },
}

/// Ordered list of segment slots. `None` is a wildcard that accepts any
/// segment; a regex slot must match the whole segment, case-insensitively.
#[derive(Debug, Clone)]
pub struct PathPattern {
    slots: Vec<Option<Regex>>,
}

impl PathPattern {
    pub fn new<I, S>(slots: I) -> Result<Self, PathPatternError>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let slots = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.map(|source| {
                    Regex::new(&format!("^(?i:{})$", source.as_ref()))
                        .map_err(|source| PathPatternError::Regex { index, source })
                })
                .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;

        if slots.is_empty() {
            return Err(PathPatternError::Empty);
        }

        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Matches the path of `url` exactly (no sub paths, empty segments ignored).
    pub fn match_url(&self, url: &Url) -> PathMatchResult {
        let segments = url_segments(url, true);
        match_path(&segments, self, false, true)
    }
}

/// Per-slot outcome of a successful regex match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMatch {
    pub segment: String,
    pub groups: Vec<(String, String)>,
}

impl SegmentMatch {
    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(group, _)| group == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatchResult {
    matches: bool,
    captures: Option<Vec<Option<SegmentMatch>>>,
}

impl PathMatchResult {
    pub fn matches(&self) -> bool {
        self.matches
    }

    /// `None` when the segment count rule failed; otherwise one entry per slot,
    /// `None` for wildcards and for slots whose regex did not match.
    pub fn captures(&self) -> Option<&[Option<SegmentMatch>]> {
        self.captures.as_deref()
    }

    /// First present group called `name`, scanning slots in declared order.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures
            .as_deref()?
            .iter()
            .flatten()
            .find_map(|slot| slot.group(name))
    }
}

pub fn url_segments(url: &Url, ignore_empty_segments: bool) -> Vec<&str> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|segment| !ignore_empty_segments || !segment.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn match_path<S: AsRef<str>>(
    segments: &[S],
    pattern: &PathPattern,
    allow_sub_paths: bool,
    ignore_empty_segments: bool,
) -> PathMatchResult {
    let segments = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|segment| !ignore_empty_segments || !segment.is_empty())
        .collect::<Vec<&str>>();

    let count_ok = if allow_sub_paths {
        segments.len() >= pattern.len()
    } else {
        segments.len() == pattern.len()
    };
    if !count_ok {
        return PathMatchResult {
            matches: false,
            captures: None,
        };
    }

    let mut matches = true;
    let captures = pattern
        .slots
        .iter()
        .zip(&segments)
        .map(|(slot, segment)| {
            let regex = slot.as_ref()?;
            let Some(caps) = regex.captures(segment) else {
                matches = false;
                return None;
            };
            let groups = regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_owned(), m.as_str().to_owned()))
                })
                .collect();
            Some(SegmentMatch {
                segment: (*segment).to_owned(),
                groups,
            })
        })
        .collect::<Vec<_>>();

    PathMatchResult {
        matches,
        captures: Some(captures),
    }
}
