//! Text search over the catalog: plain substring matching and weighted fuzzy ranking.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};

use crate::filter::ListingFilter;
use crate::model::ContentRecord;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.4;

const EXACT_DISTANCE: f64 = 0.0;
const SUBSTRING_DISTANCE: f64 = 0.1;
// Fuzzy-only hits never rank above a substring hit.
const MIN_FUZZY_DISTANCE: f64 = 0.2;
const EPSILON: f64 = 1e-3;

/// Case-insensitive substring match on title, cast, director or genre.
pub fn text_matches(r: &ContentRecord, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    r.title.to_lowercase().contains(&q)
        || r.cast.iter().any(|c| c.to_lowercase().contains(&q))
        || r.director.as_ref().is_some_and(|d| d.to_lowercase().contains(&q))
        || r.genre.iter().any(|g| g.to_lowercase().contains(&q))
}

/// Substring search AND-ed with the listing filter, in catalog order.
pub fn text_search<'a>(records: &'a [ContentRecord], query: &str, filter: &ListingFilter) -> Vec<&'a ContentRecord> {
    records
        .iter()
        .filter(|r| filter.matches(r) && text_matches(r, query))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f64,
    pub cast: f64,
    pub director: f64,
    pub genre: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { title: 0.4, cast: 0.3, director: 0.2, genre: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored<'a> {
    pub record: &'a ContentRecord,
    /// Lower is better; 0.0 is an exact hit.
    pub score: f64,
}

pub struct FuzzySearch {
    matcher: SkimMatcherV2,
    weights: FieldWeights,
    threshold: f64,
}

impl std::fmt::Debug for FuzzySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzySearch")
            .field("weights", &self.weights)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl Default for FuzzySearch {
    fn default() -> Self {
        Self::new(FieldWeights::default(), DEFAULT_FUZZY_THRESHOLD)
    }
}

impl FuzzySearch {
    pub fn new(weights: FieldWeights, threshold: f64) -> Self {
        Self { matcher: SkimMatcherV2::default().ignore_case(), weights, threshold: threshold.clamp(0.0, 1.0) }
    }

    /// Ranks matching records by ascending weighted distance. An empty query
    /// returns every filtered record with score 0 in catalog order.
    pub fn search<'a>(&self, records: &'a [ContentRecord], query: &str, filter: &ListingFilter) -> Vec<Scored<'a>> {
        let q = query.trim().to_lowercase();
        let candidates = records.iter().filter(|r| filter.matches(r));
        if q.is_empty() {
            return candidates.map(|record| Scored { record, score: 0.0 }).collect();
        }

        let perfect = self.matcher.fuzzy_match(&q, &q).unwrap_or(1).max(1) as f64;
        let mut ranked: Vec<Scored<'a>> = candidates
            .filter_map(|record| self.score(record, &q, perfect).map(|score| Scored { record, score }))
            .collect();
        ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    fn score(&self, r: &ContentRecord, q: &str, perfect: f64) -> Option<f64> {
        let fields: [(f64, Option<f64>); 4] = [
            (self.weights.title, self.field_distance(std::iter::once(r.title.as_str()), q, perfect)),
            (self.weights.cast, self.field_distance(r.cast.iter().map(String::as_str), q, perfect)),
            (self.weights.director, self.field_distance(r.director.iter().map(String::as_str), q, perfect)),
            (self.weights.genre, self.field_distance(r.genre.iter().map(String::as_str), q, perfect)),
        ];

        let mut total = 1.0;
        let mut matched = false;
        for (weight, distance) in fields {
            let Some(d) = distance.filter(|d| *d <= self.threshold) else { continue };
            if weight <= 0.0 {
                continue;
            }
            matched = true;
            total *= d.max(EPSILON).powf(weight);
        }
        matched.then_some(total)
    }

    fn field_distance<'s>(&self, values: impl Iterator<Item = &'s str>, q: &str, perfect: f64) -> Option<f64> {
        values
            .filter_map(|v| {
                let lower = v.to_lowercase();
                if lower == q {
                    Some(EXACT_DISTANCE)
                } else if lower.contains(q) {
                    Some(SUBSTRING_DISTANCE)
                } else {
                    self.matcher
                        .fuzzy_match(&lower, q)
                        .map(|s| (1.0 - s as f64 / perfect).clamp(MIN_FUZZY_DISTANCE, 1.0))
                }
            })
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
