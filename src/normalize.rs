//! Row normaliser: positional sheet rows in, typed records out.
//!
//! All knowledge of column offsets lives here. Movies and shows share the
//! first nine cells; shows carry an episodes cell at the movie's subtitle-flag
//! position, which shifts the remaining columns. Which offsets apply is chosen
//! by [`SchemaVersion`] and can be overridden per content type.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::genre;
use crate::model::{ConfigRow, ConfigRowKind, ContentRecord, ContentType, SubtitleLabel};
use crate::poster::PosterRules;
use crate::sort::SortMode;
use crate::source::RawRow;

const COL_TITLE: usize = 0;
const COL_YEAR: usize = 1;
const COL_LANGUAGE: usize = 2;
const COL_GENRE: usize = 3;
const COL_SYNOPSIS: usize = 4;
const COL_CAST: usize = 5;
const COL_IMDB: usize = 6;
const COL_POSTER: usize = 7;
const COL_TRAILER: usize = 8;

const DEFAULT_CURATED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// First sheet revision: subtitle flag only, no director or platform.
    Classic,
    /// Director and streaming platform follow the subtitle flag.
    #[default]
    Extended,
}

/// Offsets of the type-dependent columns. `None` means the sheet has no such column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub episodes: Option<usize>,
    pub subtitle_flag: Option<usize>,
    pub director: Option<usize>,
    pub platform: Option<usize>,
}

impl ColumnLayout {
    pub fn for_schema(version: SchemaVersion, kind: ContentType) -> Self {
        match (version, kind) {
            (SchemaVersion::Classic, ContentType::Movie) => Self { episodes: None, subtitle_flag: Some(9), director: None, platform: None },
            (SchemaVersion::Classic, ContentType::TvShow) => Self { episodes: Some(9), subtitle_flag: Some(11), director: None, platform: None },
            (SchemaVersion::Extended, ContentType::Movie) => Self { episodes: None, subtitle_flag: Some(9), director: Some(10), platform: Some(11) },
            (SchemaVersion::Extended, ContentType::TvShow) => Self { episodes: Some(9), subtitle_flag: Some(11), director: Some(12), platform: Some(13) },
        }
    }

    fn apply(mut self, o: &LayoutOverride) -> Self {
        if o.episodes.is_some() { self.episodes = o.episodes; }
        if o.subtitle_flag.is_some() { self.subtitle_flag = o.subtitle_flag; }
        if o.director.is_some() { self.director = o.director; }
        if o.platform.is_some() { self.platform = o.platform; }
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutOverride {
    pub episodes: Option<usize>,
    pub subtitle_flag: Option<usize>,
    pub director: Option<usize>,
    pub platform: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaConfig {
    pub version: SchemaVersion,
    pub movie: LayoutOverride,
    pub tv: LayoutOverride,
}

impl SchemaConfig {
    pub fn layout(&self, kind: ContentType) -> ColumnLayout {
        let base = ColumnLayout::for_schema(self.version, kind);
        match kind {
            ContentType::Movie => base.apply(&self.movie),
            ContentType::TvShow => base.apply(&self.tv),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowNormalizer {
    movie: ColumnLayout,
    tv: ColumnLayout,
    posters: PosterRules,
    canonical_genres: bool,
}

impl RowNormalizer {
    pub fn new(schema: &SchemaConfig, posters: PosterRules, canonical_genres: bool) -> Self {
        Self {
            movie: schema.layout(ContentType::Movie),
            tv: schema.layout(ContentType::TvShow),
            posters,
            canonical_genres,
        }
    }

    pub fn layout(&self, kind: ContentType) -> &ColumnLayout {
        match kind {
            ContentType::Movie => &self.movie,
            ContentType::TvShow => &self.tv,
        }
    }

    /// Normalises a whole sheet. The first row is the header and is skipped;
    /// `source_order_index` counts data rows before invalid ones are dropped.
    pub fn normalize_sheet(&self, rows: &[RawRow], kind: ContentType) -> Vec<ContentRecord> {
        let Some((header, data)) = rows.split_first() else {
            return Vec::new();
        };
        self.check_header(header, kind);

        let records: Vec<ContentRecord> = data
            .iter()
            .enumerate()
            .filter(|(_, row)| is_valid_row(row))
            .map(|(idx, row)| self.normalize_row(row, kind, idx))
            .collect();
        debug!(kind = %kind, rows = data.len(), kept = records.len(), "normalized sheet");
        records
    }

    pub fn normalize_row(&self, row: &[String], kind: ContentType, index: usize) -> ContentRecord {
        let layout = self.layout(kind);
        let title = non_empty(cell(row, COL_TITLE)).unwrap_or("Untitled").to_string();
        let subtitle = match layout.subtitle_flag.map(|i| cell(row, i)) {
            Some(flag) if flag.eq_ignore_ascii_case("true") => SubtitleLabel::Burmese,
            _ => SubtitleLabel::English,
        };
        let mut genre = split_list(cell(row, COL_GENRE));
        if self.canonical_genres {
            genre = genre.iter().map(|g| genre::canonicalize(g)).collect();
        }

        ContentRecord {
            id: slugify(cell(row, COL_TITLE)),
            title,
            year: non_empty(cell(row, COL_YEAR)).unwrap_or("N/A").to_string(),
            language: non_empty(cell(row, COL_LANGUAGE)).unwrap_or("Unknown").to_string(),
            genre,
            synopsis: cell(row, COL_SYNOPSIS).to_string(),
            cast: split_list(cell(row, COL_CAST)),
            imdb_rating: parse_rating(cell(row, COL_IMDB)),
            poster_url: self.posters.normalize(cell(row, COL_POSTER)),
            trailer_url: cell(row, COL_TRAILER).to_string(),
            episodes: layout.episodes.map(|i| split_lines(cell(row, i))).unwrap_or_default(),
            subtitle,
            director: layout.director.and_then(|i| non_empty(cell(row, i))).map(str::to_string),
            streaming_platform: layout.platform.and_then(|i| non_empty(cell(row, i))).map(str::to_string),
            content_type: kind,
            source_order_index: index,
        }
    }

    // Sheets carry no schema marker; the header is the only hint that the
    // configured revision matches.
    fn check_header(&self, header: &[String], kind: ContentType) {
        if !self.header_matches(header, kind) {
            let column = self.layout(kind).director;
            warn!(kind = %kind, ?column, "director column header mismatch; check the schema version");
        }
    }

    /// False when the layout's director column is headed by something else.
    /// Blank headers and layouts without a director column always match.
    pub fn header_matches(&self, header: &[String], kind: ContentType) -> bool {
        self.layout(kind)
            .director
            .map(|i| cell(header, i).to_ascii_lowercase())
            .map_or(true, |name| name.is_empty() || name.contains("director"))
    }
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(&SchemaConfig::default(), PosterRules::default(), true)
    }
}

pub fn is_valid_row(row: &[String]) -> bool {
    !cell(row, COL_TITLE).is_empty() || !cell(row, COL_YEAR).is_empty()
}

/// Lower-cases and keeps ASCII alphanumerics only. May return an empty string.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

pub fn parse_rating(raw: &str) -> f32 {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("n/a") {
        return 0.0;
    }
    match raw.parse::<f32>() {
        Ok(v) if v.is_finite() && (0.0..=10.0).contains(&v) => v,
        _ => 0.0,
    }
}

/// Parses the optional `Config` sheet. The header row is skipped and nameless rows dropped.
pub fn parse_config_rows(rows: &[RawRow]) -> Vec<ConfigRow> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let name = non_empty(cell(row, 0))?.to_string();
            let kind = if cell(row, 1).eq_ignore_ascii_case("banner") { ConfigRowKind::Banner } else { ConfigRowKind::Row };
            Some(ConfigRow {
                name,
                kind,
                titles: split_list(cell(row, 2)),
                content_type: ContentType::parse_loose(cell(row, 3)),
                language: non_empty(cell(row, 4)).map(str::to_string),
                genre: non_empty(cell(row, 5)).map(str::to_string),
                platform: non_empty(cell(row, 6)).map(str::to_string),
                sort: SortMode::parse_loose(cell(row, 7)),
                limit: cell(row, 8).parse().ok().filter(|n| *n > 0).unwrap_or(DEFAULT_CURATED_LIMIT),
            })
        })
        .collect()
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn split_lines(s: &str) -> Vec<String> {
    s.lines().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}
