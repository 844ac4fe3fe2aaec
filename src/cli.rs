use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use showcase::model::ContentType;
use showcase::prelude::ListingFilter;
use showcase::sort::SortMode;
use showcase::SearchMode;

/// Browse a spreadsheet-backed movie and TV catalog
#[derive(Parser, Debug)]
#[command(name = "showcase", version)]
#[command(about = "Browse, filter and search a movie and TV catalog", long_about = None)]
pub struct Cli {
    /// Config file (default: showcase.toml in the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read this content.json snapshot instead of the live spreadsheet
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Database URL (default: SQLite in the platform data dir)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Ignore and evict the cached feed
    #[arg(long, global = true)]
    pub refresh: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the live sheets and write a content.json snapshot
    Snapshot {
        #[arg(short, long, default_value = "content.json")]
        out: PathBuf,
    },
    /// Hero carousel and home rows
    Home,
    /// Filtered, sorted, paginated listing
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "latest")]
        sort: SortMode,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Search titles, cast, directors and genres
    Search {
        query: String,
        #[arg(long, default_value = "text")]
        mode: SearchMode,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Details, related titles and trailer for one record
    Show { id: String },
    /// Manage "My List"
    Fav {
        #[command(subcommand)]
        action: FavAction,
    },
    /// Manage the hero banner override
    Banner {
        #[command(subcommand)]
        action: BannerAction,
    },
    /// Distinct years, newest first
    Years,
    /// Read queries from stdin, one per line
    Interactive {
        #[arg(long, default_value = "text")]
        mode: SearchMode,
    },
}

#[derive(Subcommand, Debug)]
pub enum FavAction {
    List,
    Toggle { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum BannerAction {
    Show,
    /// Feature these titles in the carousel
    Set {
        #[arg(required = true)]
        titles: Vec<String>,
    },
    Clear,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// movie or tv
    #[arg(long = "type", value_parser = parse_content_type)]
    pub content_type: Option<ContentType>,
    #[arg(long)]
    pub language: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub subtitle: Option<String>,
    #[arg(long)]
    pub platform: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> ListingFilter {
        ListingFilter {
            content_type: self.content_type,
            language: self.language.clone(),
            year: self.year.clone(),
            genre: self.genre.clone(),
            subtitle: self.subtitle.clone(),
            platform: self.platform.clone(),
        }
    }
}

fn parse_content_type(s: &str) -> Result<ContentType, String> {
    ContentType::parse_loose(s).ok_or_else(|| format!("unknown content type `{s}` (expected movie or tv)"))
}
