use std::fs::File;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use haulboard::cli::{Cli, Command};
use haulboard::config::HaulboardConfig;
use haulboard::eta::DistanceMatrixClient;
use haulboard::ingest;
use haulboard::lifecycle::{NewJob, TransitionPolicy};
use haulboard::store::FileStore;
use haulboard::{DispatchError, JobService, ui};

type Service = JobService<FileStore, DistanceMatrixClient>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match HaulboardConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config, cli.verbose);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<DispatchError>() {
                Some(err) => ui::print_error(err),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &HaulboardConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(cli: &Cli, config: &HaulboardConfig) -> Result<Service> {
    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
    let store = FileStore::open(&store_path)
        .with_context(|| format!("failed to open job store {}", store_path.display()))?;
    let provider = DistanceMatrixClient::with_base_url(
        config.maps_api_key.clone(),
        config.provider_url.clone(),
        config.provider_timeout(),
    )
    .context("failed to build routing client")?;
    let policy = if cli.strict {
        TransitionPolicy::Forward
    } else {
        config.transition_policy()
    };
    Ok(JobService::with_policy(store, provider, policy))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli, config: HaulboardConfig) -> Result<()> {
    let service = build_service(&cli, &config)?;
    let json = cli.json;

    let job = match cli.command {
        Command::Add {
            reference,
            customer,
            driver,
            collection_address,
            delivery_address,
            collection_time,
            notes,
        } => service.create(NewJob {
            reference_number: reference,
            customer_name: customer,
            driver_name: driver,
            collection_address,
            delivery_address,
            collection_time,
            notes,
            status: None,
        })?,
        Command::List => {
            let jobs = service.list()?;
            return if json {
                print_json(&jobs)
            } else {
                ui::print_jobs(&jobs);
                Ok(())
            };
        }
        Command::Show { id } => service.get(&id)?,
        Command::Status { id, status } => {
            let spinner = (status == "Loaded" && !json).then(|| ui::EtaSpinner::start(&id));
            let result = service.update_status(&id, &status).await;
            if let Some(spinner) = spinner {
                spinner.finish();
            }
            result?
        }
        Command::Notes { id, text } => service.update_notes(&id, &text)?,
        Command::Timestamp { id, field, time } => service.correct_timestamp(&id, &field, &time)?,
        Command::Eta { id } => {
            let spinner = (!json).then(|| ui::EtaSpinner::start(&id));
            let result = service.refresh_eta(&id).await;
            if let Some(spinner) = spinner {
                spinner.finish();
            }
            result?
        }
        Command::Import { file, replace } => {
            let reader = File::open(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            let rows = ingest::read_csv(reader)?;
            let report = service.ingest(rows, replace)?;
            return if json {
                print_json(&report)
            } else {
                ui::print_report(&report);
                Ok(())
            };
        }
    };

    if json {
        print_json(&job)
    } else {
        ui::print_job(&job);
        Ok(())
    }
}
