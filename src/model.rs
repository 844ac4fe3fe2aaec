use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Movie,
    TvShow,
}

impl ContentType {
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Movie => "Movie",
            ContentType::TvShow => "TV Show",
        }
    }

    /// Parses the loose spellings found in config sheets and CLI flags.
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Some(ContentType::Movie),
            "tv" | "tv show" | "tv shows" | "tvshow" | "show" | "shows" | "series" => Some(ContentType::TvShow),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtitleLabel {
    Burmese,
    English,
}

impl SubtitleLabel {
    pub fn label(&self) -> &'static str {
        match self {
            SubtitleLabel::Burmese => "Burmese Subtitle",
            SubtitleLabel::English => "English Subtitle",
        }
    }
}

impl fmt::Display for SubtitleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One movie or show after normalisation. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub title: String,
    pub year: String,
    pub language: String,
    pub genre: Vec<String>,
    pub synopsis: String,
    pub cast: Vec<String>,
    /// 0.0 means unrated, never a real score of zero.
    pub imdb_rating: f32,
    pub poster_url: String,
    pub trailer_url: String,
    pub episodes: Vec<String>,
    pub subtitle: SubtitleLabel,
    pub director: Option<String>,
    pub streaming_platform: Option<String>,
    pub content_type: ContentType,
    pub source_order_index: usize,
}

impl ContentRecord {
    pub fn is_rated(&self) -> bool {
        self.imdb_rating > 0.0
    }

    /// Leading digits of `year`, if any.
    pub fn year_number(&self) -> Option<u32> {
        let digits: String = self.year.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() { None } else { digits.parse().ok() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigRowKind {
    Row,
    Banner,
}

/// A curated row or banner described by the optional `Config` sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRow {
    pub name: String,
    pub kind: ConfigRowKind,
    /// Explicit titles win over the predicate fields when non-empty.
    pub titles: Vec<String>,
    pub content_type: Option<ContentType>,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub platform: Option<String>,
    pub sort: Option<crate::sort::SortMode>,
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::record;

    #[test]
    fn year_number_reads_the_leading_digits() {
        let mut r = record("Dark", ContentType::TvShow, 0);
        r.year = "2017-2020".into();
        assert_eq!(r.year_number(), Some(2017));
        r.year = " 1995 ".into();
        assert_eq!(r.year_number(), Some(1995));
        r.year = "N/A".into();
        assert_eq!(r.year_number(), None);
    }
}
