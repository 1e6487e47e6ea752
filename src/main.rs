//! gardu-monitor entry point: configuration, logging, and subcommand dispatch.

use std::fs;
use std::path::Path;
use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gardu_monitor::auth::hash_token;
use gardu_monitor::cli::{Cli, Command, resolve_month};
use gardu_monitor::config::AppConfig;
use gardu_monitor::error::Result;
use gardu_monitor::io::{ExportFormat, csv_export, xlsx_export, xlsx_import};
use gardu_monitor::ops::{DashboardReport, MonthSnapshot, normalize, recompute};
use gardu_monitor::store::{Store, now_timestamp};

fn load_config(path: Option<&Path>) -> AppConfig {
    let config = match path {
        Some(path) => AppConfig::from_toml_file(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => AppConfig::default(),
    };
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

/// `RUST_LOG` wins over `logging.filter`. Logs go to stderr so command
/// output on stdout stays clean.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &AppConfig) -> Result<Store> {
    Store::open(Path::new(&config.database.path))
}

fn run(command: Command, config: AppConfig) -> Result<()> {
    match command {
        #[cfg(feature = "api")]
        Command::Serve { port } => {
            use std::sync::Arc;

            let mut addr = config.socket_addr()?;
            if let Some(port) = port {
                addr.set_port(port);
            }
            let store = open_store(&config)?;
            let state = Arc::new(gardu_monitor::api::AppState::new(store, config));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(gardu_monitor::api::serve(state, addr))
        }
        Command::Import { file, month } => {
            let month = resolve_month(month.as_deref())?;
            let bytes = fs::read(&file)?;
            let store = open_store(&config)?;
            let now = now_timestamp();
            let report = store.write(|c| xlsx_import::import_xlsx(c, &bytes, &month, &now))?;
            println!(
                "Imported {} for {}: {} substations created, {} updated, {} rows written",
                file.display(),
                report.month,
                report.substations_created,
                report.substations_updated,
                report.rows_written
            );
            for e in &report.errors {
                println!("  row {}: {}", e.index, e.message);
            }
            Ok(())
        }
        Command::Export { file, month } => {
            let format = ExportFormat::from_path(&file)?;
            let month = resolve_month(month.as_deref())?;
            let store = open_store(&config)?;
            let snap = store.read(|c| MonthSnapshot::load(c, &month))?;
            match format {
                ExportFormat::Xlsx => fs::write(&file, xlsx_export::export_xlsx(&snap)?)?,
                ExportFormat::Csv => csv_export::export_csv(&snap, &file)?,
            }
            eprintln!("Exported {} substations to {}", snap.substations.len(), file.display());
            Ok(())
        }
        Command::Normalize { month } => {
            let month = resolve_month(month.as_deref())?;
            let store = open_store(&config)?;
            let report = store.write(|c| normalize::backfill_all(c, &month))?;
            println!(
                "Audited {} substations for {}: created {} rows ({} siang, {} malam)",
                report.substations_audited,
                report.month,
                report.created.total(),
                report.created.siang,
                report.created.malam
            );
            Ok(())
        }
        Command::Recompute => {
            let store = open_store(&config)?;
            let report = store.write(recompute::recompute_all)?;
            println!(
                "Recomputed {} rows, {} changed",
                report.scanned, report.changed
            );
            Ok(())
        }
        Command::Dashboard { month } => {
            let month = resolve_month(month.as_deref())?;
            let store = open_store(&config)?;
            let snap = store.read(|c| MonthSnapshot::load(c, &month))?;
            println!("{}", DashboardReport::from_snapshot(&snap, &config.thresholds));
            Ok(())
        }
        #[cfg(feature = "tui")]
        Command::Tui { month } => {
            let month = resolve_month(month.as_deref())?;
            let store = open_store(&config)?;
            gardu_monitor::tui::run(store, config.thresholds, month)
        }
        Command::HashToken { token } => {
            println!("{}", hash_token(&token));
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.logging.filter);

    if let Err(e) = run(cli.command, config) {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        process::exit(1);
    }
}
