//! services/app/src/bin/seed.rs
//!
//! Replaces the hosted catalog with the tutors in a JSON file. The file holds an
//! array of tutor records; keys are assigned in file order.

use app_lib::{
    adapters::{FirebaseCatalogAdapter, TutorRecord},
    config::Config,
    error::AppError,
};
use clap::Parser;
use learnlingo_core::{catalog::seed_key, CatalogStore, Tutor};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "seed", about = "Overwrite the tutor catalog from a JSON file")]
struct Cli {
    /// JSON array of tutor records.
    #[arg(default_value = "teachers.json")]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let raw = tokio::fs::read_to_string(&cli.file).await?;
    let records: Vec<TutorRecord> = serde_json::from_str(&raw)?;
    let tutors: Vec<Tutor> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_domain(seed_key(index)))
        .collect();
    info!(count = tutors.len(), file = ?cli.file, "Seeding tutors...");

    let catalog = FirebaseCatalogAdapter::new(
        reqwest::Client::new(),
        config.database_url.clone(),
        config.catalog_path.clone(),
    );
    catalog.replace_all(tutors).await?;
    info!("Seed complete.");
    Ok(())
}
