use std::fmt;
use std::num::ParseIntError;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CHAPTER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:chapter|ch\.?)\s*(\d+)(?:\s*[.,-]\s*(\d+)?)?").unwrap()
});

/// Chapter ordinal, e.g. `10.5` is `(10, 5)`.
///
/// Ordered the way a reader expects: `main` first, then `sub`, so 10.15
/// comes after 10.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChapterNumber {
    pub main: u32,
    pub sub: u32,
}

impl ChapterNumber {
    pub const fn new(main: u32, sub: u32) -> Self {
        Self { main, sub }
    }

    /// Finds "Chapter 12", "Ch. 12.5", "ch 3-1" anywhere in `title`.
    ///
    /// `Ok(None)` when the title carries no ordinal. An ordinal too large for
    /// `u32` is an error, not an absent number.
    pub fn parse(title: &str) -> Result<Option<Self>, ParseIntError> {
        let Some(caps) = CHAPTER_NUMBER_RE.captures(title) else {
            return Ok(None);
        };
        let main = caps[1].parse()?;
        let sub = match caps.get(2) {
            Some(sub) => sub.as_str().parse()?,
            None => 0,
        };
        Ok(Some(Self { main, sub }))
    }

    /// Number expected right before this one (the next row down the list).
    /// `None` for chapter 0.
    pub fn predict_previous(self) -> Option<Self> {
        match self.sub {
            0 => self.main.checked_sub(1).map(|main| Self::new(main, 0)),
            5 => Some(Self::new(self.main, 0)),
            sub => Some(Self::new(self.main, sub - 1)),
        }
    }

    /// Number expected right after this one (the next row up the list).
    pub fn predict_next(self) -> Option<Self> {
        match self.sub {
            0 | 5 => self.main.checked_add(1).map(|main| Self::new(main, 0)),
            sub => Some(Self::new(self.main, sub + 1)),
        }
    }

    /// `main.sub` as a float, keeping `sub` digits verbatim: (10, 15) -> 10.15.
    pub fn as_f32(self) -> f32 {
        if self.sub == 0 {
            return self.main as f32;
        }
        let digits = self.sub.ilog10() + 1;
        let fractional = f64::from(self.sub) / 10f64.powi(digits as i32);
        (f64::from(self.main) + fractional) as f32
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub == 0 {
            write!(f, "{}", self.main)
        } else {
            write!(f, "{}.{}", self.main, self.sub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_title_shapes() -> anyhow::Result<()> {
        assert_eq!(ChapterNumber::parse("Chapter 10")?, Some(ChapterNumber::new(10, 0)));
        assert_eq!(ChapterNumber::parse("Ch. 3.5 - Side")?, Some(ChapterNumber::new(3, 5)));
        assert_eq!(ChapterNumber::parse("vol 2 ch7")?, Some(ChapterNumber::new(7, 0)));
        assert_eq!(ChapterNumber::parse("CHAPTER 4-2")?, Some(ChapterNumber::new(4, 2)));
        assert_eq!(ChapterNumber::parse("Chapter 8. The End")?, Some(ChapterNumber::new(8, 0)));
        Ok(())
    }

    #[test]
    fn no_ordinal_means_absent_not_zero() -> anyhow::Result<()> {
        assert_eq!(ChapterNumber::parse("Prologue")?, None);
        assert_eq!(ChapterNumber::parse("")?, None);
        Ok(())
    }

    #[test]
    fn oversized_ordinal_is_an_error() {
        assert!(ChapterNumber::parse("Chapter 99999999999").is_err());
        assert!(ChapterNumber::parse("Chapter 3.99999999999").is_err());
    }

    #[test]
    fn ordering_is_main_then_sub() {
        let mut numbers = vec![
            ChapterNumber::new(10, 15),
            ChapterNumber::new(2, 0),
            ChapterNumber::new(10, 9),
            ChapterNumber::new(10, 0),
        ];
        numbers.sort();
        assert_eq!(
            numbers,
            vec![
                ChapterNumber::new(2, 0),
                ChapterNumber::new(10, 0),
                ChapterNumber::new(10, 9),
                ChapterNumber::new(10, 15),
            ]
        );
    }

    #[test]
    fn predictions_follow_half_step_rules() {
        let n = ChapterNumber::new;
        assert_eq!(n(18, 0).predict_previous(), Some(n(17, 0)));
        assert_eq!(n(18, 5).predict_previous(), Some(n(18, 0)));
        assert_eq!(n(18, 4).predict_previous(), Some(n(18, 3)));
        assert_eq!(n(0, 0).predict_previous(), None);

        assert_eq!(n(17, 0).predict_next(), Some(n(18, 0)));
        assert_eq!(n(17, 5).predict_next(), Some(n(18, 0)));
        assert_eq!(n(18, 3).predict_next(), Some(n(18, 4)));
    }

    #[test]
    fn next_of_previous_is_identity_away_from_half_steps() {
        // sub 1, 5 and 6 sit next to a half-step boundary and do not round-trip.
        for main in 1..50 {
            for sub in [0, 2, 3, 4, 7, 8, 9, 12] {
                let x = ChapterNumber::new(main, sub);
                let back = x.predict_previous().and_then(ChapterNumber::predict_next);
                assert_eq!(back, Some(x), "{x}");
            }
        }
    }

    #[test]
    fn float_projection_keeps_sub_digits() {
        assert_eq!(ChapterNumber::new(10, 0).as_f32(), 10.0);
        assert!((ChapterNumber::new(10, 5).as_f32() - 10.5).abs() < 1e-5);
        assert!((ChapterNumber::new(10, 15).as_f32() - 10.15).abs() < 1e-5);
    }
}
