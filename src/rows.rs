//! Home-page composition: the fixed category rows, curated rows from the
//! config sheet and the hero carousel.

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::filter::{CategoryFilter, ListingFilter};
use crate::model::{ConfigRow, ConfigRowKind, ContentRecord, ContentType};
use crate::sort::{sort_records, SortMode};

pub const ROW_LIMIT: usize = 10;
pub const HERO_LIMIT: usize = 5;
const HERO_MIN_RATING: f32 = 7.5;

#[derive(Debug, Clone, Serialize)]
pub struct HomeRow<'a> {
    pub title: String,
    pub items: Vec<&'a ContentRecord>,
}

struct Category {
    title: &'static str,
    filter: CategoryFilter,
    sort: Option<SortMode>,
}

fn categories() -> Vec<Category> {
    use CategoryFilter::*;
    vec![
        Category { title: "Recently Added", filter: All, sort: Some(SortMode::Latest) },
        Category { title: "Trending Movies", filter: And(vec![Type(ContentType::Movie), MinRating(7.0)]), sort: None },
        Category { title: "TV Shows", filter: Type(ContentType::TvShow), sort: None },
        Category { title: "Action & Thriller", filter: CategoryFilter::genres(&["Action", "Thriller"]), sort: None },
        Category { title: "Comedy", filter: CategoryFilter::genres(&["Comedy"]), sort: None },
        Category { title: "Sci-Fi & Fantasy", filter: CategoryFilter::genres(&["Sci-Fi", "Science Fiction", "Fantasy"]), sort: None },
        Category { title: "Top Rated", filter: MinRating(8.0), sort: None },
    ]
}

/// The fixed rows, [`ROW_LIMIT`] items each; empty rows are omitted.
pub fn home_rows(catalog: &Catalog) -> Vec<HomeRow<'_>> {
    categories()
        .into_iter()
        .filter_map(|cat| {
            let matched: Vec<&ContentRecord> = catalog.records().iter().filter(|r| cat.filter.matches(r)).collect();
            let mut items = match cat.sort {
                Some(mode) => sort_records(matched, mode, true),
                None => matched,
            };
            items.truncate(ROW_LIMIT);
            (!items.is_empty()).then(|| HomeRow { title: cat.title.to_string(), items })
        })
        .collect()
}

/// Resolves one config row: the explicit title list in its given order, or else
/// the predicate columns with the requested sort.
pub fn curated_row<'a>(catalog: &'a Catalog, row: &ConfigRow) -> HomeRow<'a> {
    let mut items: Vec<&ContentRecord> = if !row.titles.is_empty() {
        row.titles.iter().filter_map(|t| catalog.find_title(t)).collect()
    } else {
        let filter = ListingFilter {
            content_type: row.content_type,
            language: row.language.clone(),
            genre: row.genre.clone(),
            platform: row.platform.clone(),
            ..Default::default()
        };
        let matched = filter.apply(catalog.records());
        sort_records(matched, row.sort.unwrap_or_default(), true)
    };
    items.truncate(row.limit);
    HomeRow { title: row.name.clone(), items }
}

pub fn curated_rows(catalog: &Catalog) -> Vec<HomeRow<'_>> {
    catalog
        .config_rows()
        .iter()
        .filter(|r| r.kind == ConfigRowKind::Row)
        .map(|r| curated_row(catalog, r))
        .filter(|r| !r.items.is_empty())
        .collect()
}

/// Hero carousel. Precedence: stored banner titles, config-sheet banners,
/// then a random pick of well-rated records with a real poster. Falls back to
/// the first record so a non-empty catalog always has a hero.
pub fn hero<'a>(catalog: &'a Catalog, banner_titles: &[String]) -> Vec<&'a ContentRecord> {
    let from_titles = |titles: &[String]| -> Vec<&'a ContentRecord> {
        titles.iter().filter_map(|t| catalog.find_title(t)).take(HERO_LIMIT).collect()
    };

    let stored = from_titles(banner_titles);
    if !stored.is_empty() {
        return stored;
    }

    let sheet_titles: Vec<String> = catalog
        .config_rows()
        .iter()
        .filter(|r| r.kind == ConfigRowKind::Banner)
        .flat_map(|r| r.titles.iter().cloned())
        .collect();
    let configured = from_titles(&sheet_titles);
    if !configured.is_empty() {
        return configured;
    }

    let candidates: Vec<&ContentRecord> = catalog
        .records()
        .iter()
        .filter(|r| r.imdb_rating > HERO_MIN_RATING && r.poster_url.starts_with("http"))
        .collect();
    let picked: Vec<&ContentRecord> = candidates.choose_multiple(&mut rand::rng(), HERO_LIMIT).copied().collect();
    if !picked.is_empty() {
        return picked;
    }
    catalog.records().first().into_iter().collect()
}
