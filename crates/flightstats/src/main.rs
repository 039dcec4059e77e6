//! `flightstats` - CLI for the flight duration and route history library.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, warn};

use flightstats::cli::{
    Cli, Command, ConfigCommand, DurationCommand, LatestCommand, PruneCommand, RecordCommand,
    RoutesCommand, StatsCommand,
};
use flightstats::record::now_millis;
use flightstats::{
    flight_duration_minutes, format_duration, init_logging, Config, Flight, FlightRecord,
    FlightStore, FlightTimes, RouteInfo,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    let result = match cli.command {
        Command::Record(cmd) => handle_record(&config, &cmd).await,
        Command::Duration(cmd) => handle_duration(&cmd),
        Command::Latest(cmd) => handle_latest(&config, &cmd).await,
        Command::Routes(cmd) => handle_routes(&config, &cmd).await,
        Command::Stats(cmd) => handle_stats(&config, &cmd).await,
        Command::Prune(cmd) => handle_prune(&config, &cmd).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    };

    if let Err(err) = &result {
        if err
            .downcast_ref::<flightstats::Error>()
            .is_some_and(flightstats::Error::is_storage_error)
        {
            error!(
                "Database at {} failed; it may be locked by another process",
                config.database_path().display()
            );
        }
    }

    result
}

fn open_store(config: &Config) -> Result<FlightStore> {
    FlightStore::open_with_config(config)
        .with_context(|| format!("opening {}", config.database_path().display()))
}

fn read_snapshot(path: &Path) -> Result<Flight> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    Flight::from_json(&json).with_context(|| format!("parsing snapshot {}", path.display()))
}

async fn handle_record(config: &Config, cmd: &RecordCommand) -> Result<()> {
    let flight = read_snapshot(&cmd.snapshot)?;
    let record = FlightRecord::from_flight(&flight, cmd.at.unwrap_or_else(now_millis));
    if record.flight_number.is_empty() {
        warn!("Snapshot has no flight code; recording it under an empty flight number");
    }

    let times = FlightTimes::from_flight(&flight);
    let display = format_duration(flight_duration_minutes(&times));
    let tier = times
        .tier()
        .map_or_else(|| "none".to_string(), |tier| tier.to_string());

    let store = open_store(config)?;
    let route = record.route();
    let flight_number = record.flight_number.clone();
    let id = store.insert(record).await?;

    println!("Recorded {flight_number} {route} (id {id}): {display} [{tier}]");
    Ok(())
}

fn handle_duration(cmd: &DurationCommand) -> Result<()> {
    let flight = read_snapshot(&cmd.snapshot)?;
    println!("{}", flightstats::flight_time_display(&flight));
    Ok(())
}

async fn handle_latest(config: &Config, cmd: &LatestCommand) -> Result<()> {
    let store = open_store(config)?;
    let latest = store.latest_record(&cmd.flight_number).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&latest)?);
        return Ok(());
    }

    match latest {
        Some(record) => {
            println!("Flight:      {}", record.flight_number);
            println!("Route:       {}", record.route());
            println!("Recorded:    {}", record.record_date);
            println!(
                "Duration:    {}",
                format_duration(record.duration_minutes())
            );
            if let Some(tier) = record.duration_tier() {
                println!("Source:      {tier}");
            }
        }
        None => println!("No records for {}", cmd.flight_number),
    }
    Ok(())
}

async fn handle_routes(config: &Config, cmd: &RoutesCommand) -> Result<()> {
    let store = open_store(config)?;
    let routes = store.distinct_routes().await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&routes)?);
    } else if routes.is_empty() {
        println!("No routes recorded");
    } else {
        for route in routes {
            println!("{route}");
        }
    }
    Ok(())
}

async fn handle_stats(config: &Config, cmd: &StatsCommand) -> Result<()> {
    let mut config = config.clone();
    if let Some(days) = cmd.days {
        config.stats.window_days = days;
    }

    let store = open_store(&config)?;
    let route = RouteInfo::new(&cmd.departure, &cmd.arrival);
    let summary = store
        .route_summary(&route, config.stats_window_start(now_millis()))
        .await?;
    let total = store.flight_count(&route).await?;

    if cmd.json {
        let output = serde_json::json!({
            "summary": summary,
            "total_flights": total,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Route:           {}", summary.route);
        println!(
            "Average (last {}d): {}",
            config.stats.window_days,
            format_duration(summary.average_minutes)
        );
        println!("Flights in window: {}", summary.flight_count);
        println!("Flights total:     {total}");
    }
    Ok(())
}

async fn handle_prune(config: &Config, cmd: &PruneCommand) -> Result<()> {
    let store = open_store(config)?;
    let before = store.record_count().await?;

    match (cmd.before, config.retention()) {
        (Some(cutoff), _) => store.prune(cutoff).await?,
        (None, Some(retention)) => store.prune_older_than(retention).await?,
        (None, None) => {
            println!("Retention is disabled; nothing pruned");
            return Ok(());
        }
    }

    let after = store.record_count().await?;
    println!("Pruned {} records ({} remaining)", before - after, after);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Retention (days):   {}", config.storage.retention_days);
                println!(
                    "  Subscriber buffer:  {}",
                    config.storage.subscription_capacity
                );
                println!();
                println!("[Stats]");
                println!("  Window (days):      {}", config.stats.window_days);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
