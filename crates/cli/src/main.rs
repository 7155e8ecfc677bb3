use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cli::report;
use cli::watch::{self, WatchTarget};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use validator_core::config::{self, AppConfig};
use validator_core::pipeline;
use validator_core::{CategoryConfig, Settings, SettingsPatch, SettingsStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let catalog = pipeline::load_catalog(&cfg.rules)?;

    match cli.command {
        Commands::Facets { dir } => run_facets(&cfg, dir),
        Commands::Scan {
            dir,
            year,
            date,
            json,
        } => run_scan(&cfg, &catalog, dir, year, &date, json).await,
        Commands::Categories { json } => run_categories(&cfg, &catalog, json).await,
        Commands::Settings { action } => run_settings(&cfg, &catalog, action).await,
        Commands::Watch {
            dir,
            year,
            date,
            json,
        } => {
            let year = year_folder(&dir, year)?;
            let settings = load_settings(&cfg).await?;
            watch::watch_transfer(
                WatchTarget {
                    root: dir,
                    year,
                    date,
                    json,
                },
                cfg.scan.clone(),
                catalog,
                settings,
            )
            .await
        }
    }
}

#[derive(Parser)]
#[command(name = "folder-validator")]
#[command(about = "Checks transfer folders for required file types", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the year and date folders of a transfer folder
    Facets {
        /// The year transfer folder, e.g. "2024 TRANSFER"
        dir: PathBuf,
    },
    /// Check one date folder against every category
    Scan {
        dir: PathBuf,
        /// Year folder name; defaults to the selected folder's own name
        #[arg(long)]
        year: Option<String>,
        /// Date folder name below the year
        #[arg(long)]
        date: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the configured categories
    Categories {
        #[arg(long)]
        json: bool,
    },
    /// Show or change validation settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Re-scan a date folder whenever the tree changes
    Watch {
        dir: PathBuf,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        date: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Turn the time-of-day check on or off
    TimeCheck {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Set the hour window (0-23, inclusive) for a category
    Range {
        id: String,
        #[arg(long)]
        start: Option<u8>,
        #[arg(long)]
        end: Option<u8>,
    },
    /// Restore built-in settings
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

async fn load_settings(cfg: &AppConfig) -> Result<SettingsStore> {
    let backing = cfg.settings.open_store().await?;
    Ok(SettingsStore::with_key(backing, cfg.settings.key.clone()))
}

/// The selected folder is itself the year folder unless told otherwise.
fn year_folder(dir: &Path, year: Option<String>) -> Result<String> {
    if let Some(year) = year {
        return Ok(year);
    }
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .with_context(|| format!("cannot derive the year folder from {:?}", dir))
}

fn run_facets(cfg: &AppConfig, dir: PathBuf) -> Result<()> {
    let listing = pipeline::open_transfer(&dir, &cfg.scan)?;
    print!("{}", report::render_facets(&listing));
    Ok(())
}

async fn run_scan(
    cfg: &AppConfig,
    catalog: &[CategoryConfig],
    dir: PathBuf,
    year: Option<String>,
    date: &str,
    json: bool,
) -> Result<()> {
    let year = year_folder(&dir, year)?;
    let settings = load_settings(cfg).await?.load().await;
    let report = pipeline::run_scan(&dir, &cfg.scan, &year, date, catalog, &settings)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report::scan_json(&report)?)?);
    } else {
        print!("{}", report::render_scan(&report, catalog));
    }
    Ok(())
}

async fn run_categories(cfg: &AppConfig, catalog: &[CategoryConfig], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }
    let settings = load_settings(cfg).await?.load().await;
    print!("{}", report::render_catalog(catalog, &settings));
    Ok(())
}

async fn run_settings(
    cfg: &AppConfig,
    catalog: &[CategoryConfig],
    action: SettingsAction,
) -> Result<()> {
    let mut store = load_settings(cfg).await?;
    let current = store.load().await;
    let updated = match action {
        SettingsAction::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&current)?);
            } else {
                print!("{}", report::render_settings(&current, catalog));
            }
            return Ok(());
        }
        SettingsAction::TimeCheck { state } => {
            store
                .update(SettingsPatch {
                    time_check_enabled: Some(matches!(state, Toggle::On)),
                    time_ranges: None,
                })
                .await
        }
        SettingsAction::Range { id, start, end } => {
            if !catalog.iter().any(|c| c.id == id) {
                tracing::warn!(id = %id, "no category with this id; the range will be unused");
            }
            let patch = current.range_patch(&id, start, end)?;
            store.update(patch).await
        }
        SettingsAction::Reset => {
            let defaults = Settings::default();
            store
                .update(SettingsPatch {
                    time_check_enabled: Some(defaults.time_check_enabled),
                    time_ranges: Some(defaults.time_ranges),
                })
                .await
        }
    };
    print!("{}", report::render_settings(&updated, catalog));
    Ok(())
}
