//! Predicates over content records: home-row categories, listing filters and related items.

use serde::{Deserialize, Serialize};

use crate::model::{ContentRecord, ContentType};

pub const RELATED_LIMIT: usize = 6;

/// Predicate used to build the fixed home-page rows.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryFilter {
    All,
    Type(ContentType),
    MinRating(f32),
    /// Any genre token contains any of the needles, ignoring case.
    GenreContains(Vec<String>),
    And(Vec<CategoryFilter>),
}

impl CategoryFilter {
    pub fn matches(&self, r: &ContentRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Type(t) => r.content_type == *t,
            CategoryFilter::MinRating(min) => r.imdb_rating >= *min,
            CategoryFilter::GenreContains(needles) => r.genre.iter().any(|g| {
                let g = g.to_lowercase();
                needles.iter().any(|n| g.contains(&n.to_lowercase()))
            }),
            CategoryFilter::And(parts) => parts.iter().all(|p| p.matches(r)),
        }
    }

    pub fn genres(needles: &[&str]) -> Self {
        CategoryFilter::GenreContains(needles.iter().map(|s| s.to_string()).collect())
    }
}

/// Conjunctive listing filter; `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub content_type: Option<ContentType>,
    pub language: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub subtitle: Option<String>,
    pub platform: Option<String>,
}

impl ListingFilter {
    pub fn is_empty(&self) -> bool {
        *self == ListingFilter::default()
    }

    pub fn matches(&self, r: &ContentRecord) -> bool {
        if let Some(t) = self.content_type {
            if r.content_type != t { return false; }
        }
        if let Some(lang) = &self.language {
            if !r.language.eq_ignore_ascii_case(lang.trim()) { return false; }
        }
        if let Some(year) = &self.year {
            if r.year != year.trim() { return false; }
        }
        if let Some(genre) = &self.genre {
            let want = genre.trim().to_lowercase();
            if !r.genre.iter().any(|g| g.to_lowercase() == want) { return false; }
        }
        if let Some(sub) = &self.subtitle {
            if !r.subtitle.label().to_lowercase().contains(&sub.trim().to_lowercase()) { return false; }
        }
        if let Some(platform) = &self.platform {
            match &r.streaming_platform {
                Some(p) if p.eq_ignore_ascii_case(platform.trim()) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply<'a>(&self, records: impl IntoIterator<Item = &'a ContentRecord>) -> Vec<&'a ContentRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Up to [`RELATED_LIMIT`] other records sharing at least one genre token.
pub fn related<'a>(source: &ContentRecord, records: &'a [ContentRecord]) -> Vec<&'a ContentRecord> {
    let wanted: Vec<String> = source.genre.iter().map(|g| g.to_lowercase()).collect();
    if wanted.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| r.id != source.id)
        .filter(|r| r.genre.iter().any(|g| wanted.contains(&g.to_lowercase())))
        .take(RELATED_LIMIT)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubtitleLabel;
    use crate::testutil::record;

    fn sample() -> Vec<ContentRecord> {
        let mut a = record("Alpha", ContentType::Movie, 0);
        a.year = "2020".into();
        a.genre = vec!["Comedy".into(), "Drama".into()];
        a.imdb_rating = 8.2;
        let mut b = record("Beta", ContentType::Movie, 1);
        b.year = "2020".into();
        b.genre = vec!["Action".into()];
        b.subtitle = SubtitleLabel::Burmese;
        let mut c = record("Gamma", ContentType::TvShow, 0);
        c.year = "2020".into();
        c.genre = vec!["Comedy".into()];
        c.language = "Korean".into();
        c.streaming_platform = Some("Netflix".into());
        vec![a, b, c]
    }

    #[test]
    fn category_filters() {
        let recs = sample();
        let top = CategoryFilter::MinRating(8.0);
        assert_eq!(recs.iter().filter(|r| top.matches(r)).count(), 1);
        let sci = CategoryFilter::genres(&["act", "thriller"]);
        assert!(sci.matches(&recs[1]));
        assert!(!sci.matches(&recs[0]));
        let trending = CategoryFilter::And(vec![CategoryFilter::Type(ContentType::Movie), CategoryFilter::MinRating(7.0)]);
        assert!(trending.matches(&recs[0]));
        assert!(!trending.matches(&recs[2]));
    }

    #[test]
    fn adding_a_filter_narrows_to_a_subset() {
        let recs = sample();
        let two = ListingFilter { content_type: Some(ContentType::Movie), year: Some("2020".into()), ..Default::default() };
        let three = ListingFilter { genre: Some("comedy".into()), ..two.clone() };
        let wide = two.apply(&recs);
        let narrow = three.apply(&recs);
        assert_eq!(wide.len(), 2);
        assert_eq!(narrow.len(), 1);
        assert!(narrow.iter().all(|n| wide.iter().any(|w| w.id == n.id)));
    }

    #[test]
    fn language_subtitle_and_platform_filters() {
        let recs = sample();
        let korean = ListingFilter { language: Some("korean".into()), ..Default::default() };
        assert_eq!(korean.apply(&recs).len(), 1);
        let burmese = ListingFilter { subtitle: Some("Burmese".into()), ..Default::default() };
        assert_eq!(burmese.apply(&recs)[0].title, "Beta");
        let netflix = ListingFilter { platform: Some("netflix".into()), ..Default::default() };
        assert_eq!(netflix.apply(&recs)[0].title, "Gamma");
        assert!(ListingFilter::default().is_empty());
        assert_eq!(ListingFilter::default().apply(&recs).len(), 3);
    }

    #[test]
    fn related_excludes_source_and_caps() {
        let mut recs = sample();
        for i in 0..10 {
            let mut r = record(&format!("Extra {i}"), ContentType::Movie, 10 + i);
            r.genre = vec!["comedy".into()];
            recs.push(r);
        }
        let rel = related(&recs[0], &recs);
        assert_eq!(rel.len(), RELATED_LIMIT);
        assert!(rel.iter().all(|r| r.id != recs[0].id));
        assert_eq!(rel[0].title, "Gamma");
    }
}
