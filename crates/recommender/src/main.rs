//! Maverick - command-line front end for the recommendation engine
//!
//! Loads the catalog and rating snapshots, trains every model once and
//! prints the requested recommendations as JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use maverick_recommender::{
    init_logging, leave_one_out, EngineConfig, HybridRequest, ModelBundle, UserId,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "maverick")]
#[command(about = "Hybrid movie recommendations from catalog and rating snapshots", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        long,
        global = true,
        env = "MAVERICK_CONFIG",
        default_value = "config/recommender",
        help = "Configuration file (extension optional)"
    )]
    config: String,

    #[arg(
        long,
        global = true,
        env = "MAVERICK_DATA_DIR",
        help = "Directory holding movies.csv and ratings.csv"
    )]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Most popular titles by weighted rating")]
    Popular {
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    #[command(about = "Titles similar in content to the given titles")]
    Similar {
        #[arg(required = true, help = "Seed titles")]
        titles: Vec<String>,
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    #[command(about = "Titles rated by the same users as the given title")]
    AlsoRated {
        title: String,
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    #[command(about = "Collaborative recommendations for a user")]
    ForUser {
        user_id: UserId,
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    #[command(about = "Hybrid recommendations from seeds and user history")]
    Hybrid {
        #[arg(long = "seed", help = "Seed title (repeatable)")]
        seeds: Vec<String>,
        #[arg(long)]
        user: Option<UserId>,
        #[arg(long, help = "Override the user's rating count")]
        rating_count: Option<usize>,
        #[arg(short, long, default_value = "10")]
        n: usize,
    },

    #[command(about = "Leave-one-out hit rate of the collaborative model")]
    Evaluate {
        #[arg(short, long, default_value = "10")]
        n: usize,
        #[arg(long, help = "Override evaluation.max_users")]
        max_users: Option<usize>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let mut config = EngineConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    if let Some(dir) = &cli.data_dir {
        config.data.movies_path = dir.join("movies.csv");
        config.data.ratings_path = dir.join("ratings.csv");
    }

    init_logging(&config.logging).context("Failed to initialize logging")?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting maverick");

    let bundle = ModelBundle::load(&config).context("Failed to load snapshots")?;

    let output = match cli.command {
        Commands::Popular { n } => json!({ "titles": bundle.popularity().recommend(n) }),
        Commands::Similar { titles, n } => {
            json!({ "titles": bundle.content().recommend(&titles, n) })
        }
        Commands::AlsoRated { title, n } => {
            json!({ "titles": bundle.collaborative().similar_titles(&title, n) })
        }
        Commands::ForUser { user_id, n } => {
            json!({ "titles": bundle.collaborative().recommend(user_id, n) })
        }
        Commands::Hybrid {
            seeds,
            user,
            rating_count,
            n,
        } => {
            let mut request = HybridRequest::new(seeds, user, n);
            request.rating_count = rating_count;
            serde_json::to_value(bundle.recommend(&request))?
        }
        Commands::Evaluate { n, max_users } => {
            let mut evaluation = config.evaluation.clone();
            if let Some(max_users) = max_users {
                evaluation.max_users = max_users;
            }
            let report = leave_one_out(
                Arc::clone(bundle.catalog()),
                bundle.ratings(),
                &config.collaborative,
                &evaluation,
                n,
            );
            serde_json::to_value(report)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
