//! Shiksha CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config
//! - `doctor`: Diagnose config, catalog, vector store and providers
//! - `chapters`: List textbook chapters from the curriculum catalog
//! - `index`: Load JSONL chunk records into a vector collection
//! - `tutor`: Start a grounded tutoring session and chat interactively

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "shiksha",
    about = "Shiksha — grounded tutoring for K-12 teachers",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Diagnose system health
    Doctor,

    /// List catalog textbooks, or the chapters of one subject
    Chapters {
        /// Grade, e.g. "10" or "Class 10"
        #[arg(short, long)]
        grade: Option<String>,

        /// Subject, e.g. "Mathematics"
        #[arg(short, long)]
        subject: Option<String>,
    },

    /// Load a JSONL file of {content, metadata} records into a collection
    Index {
        /// Target collection, e.g. "pedagogy" or "material_42"
        #[arg(short, long)]
        collection: String,

        /// JSONL file, one record per line
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Start a tutoring session and chat about a topic
    Tutor {
        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        grade: String,

        #[arg(short, long, default_value = "CBSE")]
        board: String,

        #[arg(long, default_value = "")]
        state: String,

        /// The teacher holds a B.Ed
        #[arg(long)]
        bed: bool,

        /// Ground the session on an uploaded material's collection
        #[arg(long)]
        material_id: Option<u64>,

        #[arg(long)]
        material_filename: Option<String>,

        /// Send one follow-up question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Chapters { grade, subject } => commands::chapters::run(grade, subject).await?,
        Commands::Index { collection, file } => commands::index::run(&collection, &file).await?,
        Commands::Tutor {
            topic,
            subject,
            grade,
            board,
            state,
            bed,
            material_id,
            material_filename,
            message,
        } => {
            let options = commands::tutor::TutorOptions {
                topic,
                subject,
                grade,
                board,
                state,
                is_bed_qualified: bed,
                material_id,
                material_filename,
            };
            commands::tutor::run(options, message).await?
        }
    }

    Ok(())
}
