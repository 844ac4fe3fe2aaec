use std::cmp::Ordering;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::{ContentRecord, ContentType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Latest,
    Rating,
    Year,
    Title,
    /// Promotional shuffling only; never use for deterministic listings.
    Random,
}

impl SortMode {
    pub fn parse_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "recent" | "new" | "newest" => Some(SortMode::Latest),
            "rating" | "imdb" | "top" => Some(SortMode::Rating),
            "year" => Some(SortMode::Year),
            "title" | "name" | "az" | "a-z" => Some(SortMode::Title),
            "random" | "shuffle" => Some(SortMode::Random),
            _ => None,
        }
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("unknown sort mode `{s}` (expected latest, rating, year, title, random)"))
    }
}

/// Returns the records in the requested order. `interleave` only affects `Latest`.
pub fn sort_records<'a>(records: Vec<&'a ContentRecord>, mode: SortMode, interleave: bool) -> Vec<&'a ContentRecord> {
    let mut records = records;
    match mode {
        SortMode::Latest => return sort_latest(records, interleave),
        SortMode::Rating => records.sort_by(|a, b| b.imdb_rating.partial_cmp(&a.imdb_rating).unwrap_or(Ordering::Equal)),
        SortMode::Year => records.sort_by(|a, b| cmp_year_desc(a, b)),
        SortMode::Title => records.sort_by(|a, b| {
            a.title.to_lowercase().cmp(&b.title.to_lowercase()).then_with(|| a.title.cmp(&b.title))
        }),
        SortMode::Random => records.shuffle(&mut rand::rng()),
    }
    records
}

// Source indices are per sheet, so each type is ordered on its own first.
fn sort_latest(records: Vec<&ContentRecord>, interleave: bool) -> Vec<&ContentRecord> {
    let (mut movies, mut shows): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|r| r.content_type == ContentType::Movie);
    movies.sort_by(|a, b| b.source_order_index.cmp(&a.source_order_index));
    shows.sort_by(|a, b| b.source_order_index.cmp(&a.source_order_index));

    if !interleave {
        movies.extend(shows);
        return movies;
    }

    let mut out = Vec::with_capacity(movies.len() + shows.len());
    let mut m = movies.into_iter();
    let mut s = shows.into_iter();
    loop {
        match (m.next(), s.next()) {
            (None, None) => break,
            (a, b) => {
                out.extend(a);
                out.extend(b);
            }
        }
    }
    out
}

fn cmp_year_desc(a: &ContentRecord, b: &ContentRecord) -> Ordering {
    match (a.year_number(), b.year_number()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
