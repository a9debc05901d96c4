mod analyze;
mod cache;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kwscope-cli")]
#[command(about = "YouTube keyword discovery from a seed topic")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Expand a seed topic and print ranked keywords with predictions
    Analyze {
        /// Seed topic, e.g. "minecraft building"
        seed: String,

        /// Content category (gaming, education, entertainment, tech, vlog, food, music, howto)
        #[arg(long)]
        category: Option<String>,

        /// Analysis depth: light, medium or deep
        #[arg(long, default_value = "medium")]
        depth: String,

        /// Keyword that must appear in the result (repeatable)
        #[arg(long = "hint")]
        hints: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show cache hit/miss counters and durable mirror health
    CacheStatus {
        /// Print the stats as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `--help` and usage errors must not require GEMINI_API_KEY.
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("kwscope-cli ready; run `kwscope-cli analyze <seed>`");
        return Ok(());
    };

    dotenvy::dotenv().ok();
    let config = kwscope_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let tuning = kwscope_core::load_tuning(config.tuning_path.as_deref())?;

    match command {
        Commands::Analyze {
            seed,
            category,
            depth,
            hints,
            json,
        } => {
            let request = analyze::build_request(&seed, category.as_deref(), &depth, hints)?;
            let store = cache::build_cache(&config, &tuning).await;
            analyze::run_analyze(&config, tuning, store, request, json).await?;
        }
        Commands::CacheStatus { json } => {
            let store = cache::build_cache(&config, &tuning).await;
            cache::run_cache_status(&store, json)?;
        }
    }

    Ok(())
}
