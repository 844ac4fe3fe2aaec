mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{BannerAction, Cli, Commands, FavAction};
use showcase::config::Config;
use showcase::error::LoadError;
use showcase::model::ContentRecord;
use showcase::session::{Debouncer, SearchSequencer};
use showcase::source::{self, write_snapshot};
use showcase::{SearchMode, Showcase};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if e.chain().any(|c| c.downcast_ref::<LoadError>().is_some()) {
                eprintln!("the catalog could not be loaded; retry later or pass --snapshot <content.json>");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "showcase=info",
        _ => "showcase=debug",
    };
    let filter = EnvFilter::try_from_env("SHOWCASE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.snapshot.clone() {
        config.snapshot = Some(path);
    }
    if let Some(url) = cli.database_url.clone() {
        config.database_url = Some(url);
    }
    let json = cli.json;

    if let Commands::Snapshot { out } = &cli.command {
        let src = showcase::source_for(&config)?;
        let feed = source::load_feed(src.as_ref(), &config.retry_policy()).await?;
        write_snapshot(&feed, out).await?;
        info!(path = %out.display(), "snapshot written");
        if !json {
            println!("wrote {} movie rows and {} show rows to {}", feed.movies.len().saturating_sub(1), feed.tv.len().saturating_sub(1), out.display());
        }
        return Ok(());
    }

    let mut app = Showcase::connect(config, cli.refresh).await?;
    debug!(?app, "session ready");

    match cli.command {
        Commands::Snapshot { .. } => unreachable!("handled above"),
        Commands::Home => {
            let home = app.home().await?;
            if json {
                return print_json(&home);
            }
            println!("== Featured ==");
            print_records(&home.hero);
            for row in &home.rows {
                println!("\n== {} ==", row.title);
                print_records(&row.items);
            }
        }
        Commands::List { filter, sort, page } => {
            let page = app.list(&filter.to_filter(), sort, page);
            if json {
                return print_json(&page);
            }
            print_records(&page.items);
            println!("-- page {} of {} ({} titles)", page.page, page.page_count.max(1), page.total);
        }
        Commands::Search { query, mode, filter } => {
            let out = app.search(&query, mode, &filter.to_filter()).await;
            if json {
                return print_json(&out);
            }
            if out.fell_back {
                eprintln!("(semantic search unavailable; showing substring matches)");
            }
            print_records(&out.results);
        }
        Commands::Show { id } => {
            let Some(detail) = app.detail(&id) else {
                anyhow::bail!("no title with id `{id}`");
            };
            if json {
                return print_json(&detail);
            }
            let r = detail.record;
            println!("{} ({}) - {}", r.title, r.year, r.content_type);
            println!("IMDb {}  |  {}  |  {}", rating_text(r), r.language, r.subtitle);
            if !r.genre.is_empty() {
                println!("Genres: {}", r.genre.join(", "));
            }
            if let Some(d) = &r.director {
                println!("Director: {d}");
            }
            if !r.cast.is_empty() {
                println!("Cast: {}", r.cast.join(", "));
            }
            if let Some(p) = &r.streaming_platform {
                println!("Streaming on: {p}");
            }
            if !r.synopsis.is_empty() {
                println!("\n{}", r.synopsis);
            }
            if !r.episodes.is_empty() {
                println!("\nEpisodes:");
                for ep in &r.episodes {
                    println!("  {ep}");
                }
            }
            println!("\nPoster: {}", r.poster_url);
            match &detail.trailer_embed {
                Some(url) => println!("Trailer: {url}"),
                None => println!("Trailer: none"),
            }
            println!("In My List: {}", if detail.favorite { "yes" } else { "no" });
            if !detail.related.is_empty() {
                println!("\nRelated:");
                print_records(&detail.related);
            }
        }
        Commands::Fav { action } => match action {
            FavAction::List => {
                let favs = app.favorites();
                if json {
                    return print_json(&favs);
                }
                print_records(&favs);
            }
            FavAction::Toggle { id } => {
                let now = app.toggle_favorite(&id).await?;
                if json {
                    return print_json(&serde_json::json!({ "id": id, "favorite": now }));
                }
                println!("{id}: {}", if now { "added to My List" } else { "removed from My List" });
            }
            FavAction::Clear => {
                app.clear_favorites().await?;
                if !json {
                    println!("My List cleared");
                }
            }
        },
        Commands::Banner { action } => match action {
            BannerAction::Show => {
                let titles = app.banner_titles().await?;
                if json {
                    return print_json(&titles);
                }
                if titles.is_empty() {
                    println!("no banner override");
                }
                for t in titles {
                    println!("{t}");
                }
            }
            BannerAction::Set { titles } => {
                let unknown: Vec<&String> = titles.iter().filter(|t| app.catalog().find_title(t).is_none()).collect();
                if !unknown.is_empty() {
                    eprintln!("warning: not in the catalog: {unknown:?}");
                }
                app.set_banner(&titles).await?;
            }
            BannerAction::Clear => app.clear_banner().await?,
        },
        Commands::Years => {
            let years = app.years();
            if json {
                return print_json(&years);
            }
            for y in years {
                println!("{y}");
            }
        }
        Commands::Interactive { mode } => interactive(Arc::new(app), mode, json).await?,
    }
    Ok(())
}

/// One query per stdin line. Lines arriving within the debounce window
/// supersede each other and late answers for older queries are dropped.
async fn interactive(app: Arc<Showcase>, mode: SearchMode, json: bool) -> Result<()> {
    let debouncer = Debouncer::new(app.config().debounce());
    let sequencer = SearchSequencer::new();
    let mut tasks = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("type a query per line; ctrl-d to quit");
    while let Some(line) = lines.next_line().await? {
        let pending = debouncer.input();
        let (app, debouncer, sequencer) = (app.clone(), debouncer.clone(), sequencer.clone());
        tasks.spawn(async move {
            if !debouncer.settled(pending).await {
                return;
            }
            let ticket = sequencer.issue();
            let out = app.search(&line, mode, &Default::default()).await;
            if !sequencer.accept(ticket) {
                return;
            }
            if json {
                if let Ok(s) = serde_json::to_string(&out) {
                    println!("{s}");
                }
            } else {
                println!("-- {} result(s) for \"{}\"", out.results.len(), line.trim());
                print_records(&out.results);
            }
        });
    }
    while tasks.join_next().await.is_some() {}
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(records: &[&ContentRecord]) {
    for r in records {
        println!("{:<28} {} ({}) [{}] {}", r.id, r.title, r.year, r.content_type, rating_text(r));
    }
}

fn rating_text(r: &ContentRecord) -> String {
    if r.is_rated() { format!("{:.1}", r.imdb_rating) } else { "N/A".to_string() }
}
