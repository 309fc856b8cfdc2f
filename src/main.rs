use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use subtitle_finder_lib::commands;
use subtitle_finder_lib::{AppConfig, AppError, Database};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "subfind", version, about = "Search TV dialogue and get series recommendations")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides the configuration)
    #[arg(long, global = true, env = "SUBFIND_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema if needed and check the store
    Init,
    /// Index one subtitle file
    Index {
        file: PathBuf,
        #[arg(long)]
        show: Option<String>,
        #[arg(long)]
        season: Option<i64>,
        #[arg(long)]
        episode: Option<i64>,
    },
    /// Index every subtitle file under a directory
    Bulk {
        /// Defaults to the configured subtitles root
        root: Option<PathBuf>,
        /// Keep every language
        #[arg(long)]
        all_languages: bool,
    },
    /// Recompute document frequencies over the whole corpus
    RebuildDf,
    /// Search episodes by dialogue
    Search { query: String },
    /// Rate a show from 1 to 5
    Rate {
        user: String,
        show: String,
        rating: i64,
    },
    /// List a user's ratings
    Ratings { user: String },
    /// Recommend shows from a user's ratings
    Recommend { user: String },
    /// Most frequent words of an episode
    Unigrams {
        episode_id: i64,
        #[arg(long, default_value_t = commands::DEFAULT_TOP)]
        top: i64,
    },
    /// Most frequent word pairs of an episode
    Bigrams {
        episode_id: i64,
        #[arg(long, default_value_t = commands::DEFAULT_TOP)]
        top: i64,
    },
    /// Row counts of the index
    Stats,
    /// Token counts of a file without indexing it
    Preview {
        file: PathBuf,
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<(), AppError> {
    let cwd = std::env::current_dir()?;
    let mut config = AppConfig::load(cli.config.as_deref(), &cwd)?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let open_db = || -> Result<Database, AppError> {
        info!("Using database {}", config.database_path.display());
        Ok(Database::new(&config.database_path)?)
    };

    match cli.command {
        // reads the file only; the store is never opened
        Commands::Preview { file, top } => print_json(&commands::preview_file(&file, top)?),
        Commands::Init => print_json(&commands::check_db(&open_db()?)),
        Commands::Index {
            file,
            show,
            season,
            episode,
        } => print_json(&commands::index_subtitle_file(
            &open_db()?,
            &file,
            show.as_deref(),
            season,
            episode,
        )?),
        Commands::Bulk {
            root,
            all_languages,
        } => {
            let root = root.unwrap_or_else(|| config.subtitles_root.clone());
            let mut bulk = config.bulk.clone();
            if all_languages {
                bulk.language_tags.clear();
            }
            print_json(&commands::bulk_index(&open_db()?, &root, &bulk)?)
        }
        Commands::RebuildDf => print_json(&commands::rebuild_df(&open_db()?)?),
        Commands::Search { query } => print_json(&commands::search(&open_db()?, &query, &config.ranking)?),
        Commands::Rate { user, show, rating } => {
            let message = commands::rate(&open_db()?, &user, &show, rating)?;
            print_json(&serde_json::json!({ "message": message }))
        }
        Commands::Ratings { user } => print_json(&commands::list_ratings(&open_db()?, &user)?),
        Commands::Recommend { user } => {
            print_json(&commands::recommend(&open_db()?, &user, &config.recommend)?)
        }
        Commands::Unigrams { episode_id, top } => {
            print_json(&commands::top_unigrams(&open_db()?, episode_id, top)?)
        }
        Commands::Bigrams { episode_id, top } => {
            print_json(&commands::top_bigrams(&open_db()?, episode_id, top)?)
        }
        Commands::Stats => print_json(&commands::index_stats(&open_db()?)?),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subfind=info,subtitle_finder_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(if e.is_client_error() { 2 } else { 1 });
    }
}
