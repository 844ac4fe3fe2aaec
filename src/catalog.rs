//! The content store: every record of one load, in load order, with an id index.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::model::{ConfigRow, ContentRecord, ContentType};
use crate::normalize::{parse_config_rows, RowNormalizer};
use crate::source::RawFeed;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<ContentRecord>,
    by_id: HashMap<String, usize>,
    config_rows: Vec<ConfigRow>,
}

impl Catalog {
    pub fn from_feed(feed: &RawFeed, normalizer: &RowNormalizer) -> Self {
        let mut records = normalizer.normalize_sheet(&feed.movies, ContentType::Movie);
        records.extend(normalizer.normalize_sheet(&feed.tv, ContentType::TvShow));
        let mut catalog = Self::from_records(records);
        catalog.config_rows = parse_config_rows(&feed.config);
        info!(
            records = catalog.records.len(),
            config_rows = catalog.config_rows.len(),
            "catalog built"
        );
        catalog
    }

    /// Builds the store and makes ids unique: empty slugs become `<type>-<index>`,
    /// later duplicates get `-2`, `-3`, ... in load order.
    pub fn from_records(records: Vec<ContentRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::with_capacity(records.len());

        for mut r in records {
            if r.id.is_empty() {
                let prefix = match r.content_type {
                    ContentType::Movie => "movie",
                    ContentType::TvShow => "tv",
                };
                r.id = format!("{prefix}-{}", r.source_order_index);
            }
            let base = r.id.clone();
            let mut id = base.clone();
            let count = seen.entry(base.clone()).or_insert(0);
            while by_id.contains_key(&id) {
                *count += 1;
                id = format!("{base}-{}", *count + 1);
            }
            if id != base {
                debug!(title = %r.title, base = %base, id = %id, "id collision resolved with suffix");
            }
            r.id = id;
            by_id.insert(r.id.clone(), out.len());
            out.push(r);
        }

        Self { records: out, by_id, config_rows: Vec::new() }
    }

    pub fn with_config_rows(mut self, rows: Vec<ConfigRow>) -> Self {
        self.config_rows = rows;
        self
    }

    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn config_rows(&self) -> &[ConfigRow] {
        &self.config_rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ContentRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// First record whose title equals `title`, ignoring case.
    pub fn find_title(&self, title: &str) -> Option<&ContentRecord> {
        let want = title.trim().to_lowercase();
        self.records.iter().find(|r| r.title.to_lowercase() == want)
    }

    /// Resolves ids in order; ids missing from the catalog are skipped.
    pub fn resolve<'a, I, S>(&'a self, ids: I) -> Vec<&'a ContentRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter().filter_map(|id| self.get(id.as_ref())).collect()
    }

    /// Distinct years, newest first, without the `N/A` placeholder.
    pub fn years(&self) -> Vec<String> {
        let mut years: Vec<String> = self.records.iter().map(|r| r.year.clone()).filter(|y| y != "N/A").collect();
        years.sort();
        years.dedup();
        years.reverse();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::record;

    #[test]
    fn colliding_titles_get_suffixes() {
        let recs = vec![
            record("Up", ContentType::Movie, 0),
            record("UP!", ContentType::Movie, 1),
            record("up", ContentType::TvShow, 0),
        ];
        let cat = Catalog::from_records(recs);
        let ids: Vec<&str> = cat.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["up", "up-2", "up-3"]);
        assert_eq!(cat.get("up-2").map(|r| r.title.as_str()), Some("UP!"));
    }

    #[test]
    fn suffix_never_overwrites_an_earlier_id() {
        let mut nameless = record("x", ContentType::Movie, 2);
        nameless.id = String::new();
        let recs = vec![
            record("Movie", ContentType::Movie, 0),
            record("Movie", ContentType::Movie, 1),
            nameless,
        ];
        let cat = Catalog::from_records(recs);
        let ids: Vec<&str> = cat.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["movie", "movie-2", "movie-2-2"]);
        assert_eq!(cat.len(), 3);
    }

    #[test]
    fn empty_slugs_use_type_and_index() {
        let mut r = record("x", ContentType::TvShow, 7);
        r.id = String::new();
        let cat = Catalog::from_records(vec![r]);
        assert!(cat.get("tv-7").is_some());
    }

    #[test]
    fn resolve_skips_stale_ids_and_years_are_desc() {
        let mut a = record("A", ContentType::Movie, 0);
        a.year = "2019".into();
        let mut b = record("B", ContentType::Movie, 1);
        b.year = "2021".into();
        let c = record("C", ContentType::Movie, 2);
        let cat = Catalog::from_records(vec![a, b, c]);
        let got: Vec<&str> = cat.resolve(["b", "gone", "a"]).iter().map(|r| r.title.as_str()).collect();
        assert_eq!(got, ["B", "A"]);
        assert_eq!(cat.years(), ["2021", "2019"]);
        assert_eq!(cat.find_title("b").map(|r| r.id.as_str()), Some("b"));
    }
}
