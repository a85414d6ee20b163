use clap::Parser;
use env_logger::Env;
use importer::config::ImportConfig;
use importer::job_controller::state::{start_job_updater, JobsState};
use importer::services::import::start::run_import_job;
use importer::store::connect_with_timeout;
use log::{error, info, warn};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ImportConfig::parse();
    let default_filter = if config.debug_import { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(default_filter));

    let store = match connect_with_timeout(&config.store_path, config.connect_timeout()).await {
        Ok(store) => store,
        Err(e) => {
            error!("Database connection error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.truncate {
        match store.clear() {
            Ok(removed) => info!("Removed {} existing sightings", removed),
            Err(e) => {
                error!("Unable to clear the sightings collection: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let (jobs_state, rx) = JobsState::new();
    let updater = tokio::spawn(start_job_updater(jobs_state.jobs.clone(), rx));

    let outcome = run_import_job(&jobs_state, config, store).await;

    // Close the channel so the updater drains and exits.
    drop(jobs_state);
    let _ = updater.await;

    match outcome {
        Ok((summary, store)) => {
            match serde_json::to_string(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Unable to serialize run summary: {}", e),
            }
            match store.count() {
                Ok(count) => info!("Sightings in collection: {}", count),
                Err(e) => warn!("Unable to count sightings: {}", e),
            }
            if let Ok(Some((name, country))) = store.sample() {
                info!("Sample document: {} ({})", name, country);
            }
            info!("Database connection closed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Import aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
