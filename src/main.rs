use clap::{Parser, Subcommand};
use hotel_upkeep::config::Config;
use hotel_upkeep::db::Store;
use hotel_upkeep::services::alerts::{self, SystemClock};
use hotel_upkeep::services::reconcile::{self, ReconcileOptions};
use hotel_upkeep::services::{demo, stats};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hotel-upkeep", version, about = "Hotel facility and maintenance store")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the canonical schema.
    InitDb,
    /// Copy buildings, rooms and tickets from the legacy SQLite store.
    Reconcile {
        /// Wipe canonical tables first.
        #[arg(long)]
        clean: bool,
    },
    /// Fire due maintenance alerts.
    Alerts {
        /// Sweep once and exit instead of looping.
        #[arg(long)]
        once: bool,
    },
    /// Print room status statistics merged with presentation settings.
    Dashboard,
    /// Fill an empty store with sample data.
    SeedDemo,
}

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

fn load_env(explicit: Option<&PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(format!("env file not found: {}", path.display()));
            }
            // dotenvy never overrides variables already set in the process.
            dotenvy::from_path(path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
            Ok(Some(LoadedEnvFile {
                path: path.clone(),
                explicit: true,
            }))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(LoadedEnvFile { path, explicit: false })),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(format!("failed to load .env: {}", e)),
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| format!("serializing output failed: {}", e))?;
    println!("{}", out);
    Ok(())
}

fn open_store(cfg: &Config) -> Result<Store, String> {
    let mut store = Store::open(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    store.apply_migrations().map_err(|e| e.to_string())?;
    Ok(store)
}

fn run(cli: Cli) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (legacy_database_path={}, alert_sweep_interval={}s, reconcile_clean={})",
        cfg.legacy_database_path.display(),
        cfg.alert_sweep_interval.as_secs(),
        cfg.reconcile_clean
    );

    match cli.command {
        Command::InitDb => {
            open_store(&cfg)?.close();
            info!("Canonical schema ready");
        }
        Command::Reconcile { clean } => {
            let options = ReconcileOptions {
                clean: clean || cfg.reconcile_clean,
            };
            let report = reconcile::run_from_paths(&cfg.legacy_database_path, &cfg.database_url, options)
                .map_err(|e| format!("reconciliation failed: {}", e))?;
            print_json(&report)?;
        }
        Command::Alerts { once: true } => {
            let mut store = open_store(&cfg)?;
            let fired = alerts::sweep_alerts(store.conn(), chrono::Local::now()).map_err(|e| e.to_string())?;
            print_json(&fired)?;
            store.close();
        }
        Command::Alerts { once: false } => {
            let mut store = open_store(&cfg)?;
            info!(
                "Starting alert loop: interval={}s",
                cfg.alert_sweep_interval.as_secs()
            );
            alerts::run_loop(store.conn(), &SystemClock, cfg.alert_sweep_interval).map_err(|e| e.to_string())?;
        }
        Command::Dashboard => {
            let mut store = open_store(&cfg)?;
            let dashboard = stats::dashboard(store.conn()).map_err(|e| e.to_string())?;
            print_json(&dashboard)?;
            store.close();
        }
        Command::SeedDemo => {
            let mut store = open_store(&cfg)?;
            let summary = demo::seed(store.conn()).map_err(|e| e.to_string())?;
            info!(
                "Seeded {} building(s), {} room(s), {} ticket(s)",
                summary.buildings, summary.rooms, summary.tickets
            );
            store.close();
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let loaded_env = match load_env(cli.env_file.as_ref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "hotel-upkeep {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
