use crate::report;
use anyhow::{Context, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use validator_core::config::ScanConfig;
use validator_core::pipeline::{self, ScanReport};
use validator_core::{CategoryConfig, SettingsStore};

/// How long the tree must stay quiet before a re-scan starts.
pub const SETTLE: Duration = Duration::from_millis(750);

pub struct WatchTarget {
    pub root: PathBuf,
    pub year: String,
    pub date: String,
    pub json: bool,
}

pub async fn watch_transfer(
    target: WatchTarget,
    scan: ScanConfig,
    catalog: Vec<CategoryConfig>,
    mut settings: SettingsStore,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher: RecommendedWatcher = Watcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(ev) if !matches!(ev.kind, EventKind::Access(_)) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "watch error"),
        },
        notify::Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;
    watcher.watch(&target.root, RecursiveMode::Recursive)?;

    println!(
        "Watching {} for {}/{} (Ctrl-C to stop)...",
        target.root.display(),
        target.year,
        target.date
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = rescan(&target, &scan, &catalog, &mut settings) => {}
            _ = &mut ctrl_c => break,
        }
        tokio::select! {
            changed = next_change(&mut rx) => {
                if !changed {
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }
    println!("Stopped watching.");
    Ok(())
}

/// Resolves once a change burst has settled; `false` when the watcher is gone.
async fn next_change(rx: &mut mpsc::UnboundedReceiver<()>) -> bool {
    if rx.recv().await.is_none() {
        return false;
    }
    settle(rx).await;
    true
}

/// Waits until no event has arrived for [`SETTLE`], folding every queued
/// trigger into the one scan that follows.
async fn settle(rx: &mut mpsc::UnboundedReceiver<()>) {
    let mut coalesced = 0usize;
    loop {
        match tokio::time::timeout(SETTLE, rx.recv()).await {
            Ok(Some(())) => coalesced += 1,
            Ok(None) | Err(_) => break,
        }
    }
    debug!(coalesced, "change burst settled");
}

/// Runs one scan with the settings as currently stored, so edits made from
/// another shell apply to the next change.
pub async fn scan_once(
    target: &WatchTarget,
    scan: &ScanConfig,
    catalog: &[CategoryConfig],
    settings: &mut SettingsStore,
) -> Result<ScanReport> {
    let current = settings.load().await;
    let root = target.root.clone();
    let scan_cfg = scan.clone();
    let year = target.year.clone();
    let date = target.date.clone();
    let catalog_owned = catalog.to_vec();
    tokio::task::spawn_blocking(move || {
        pipeline::run_scan(&root, &scan_cfg, &year, &date, &catalog_owned, &current)
    })
    .await
    .context("scan task failed")?
}

async fn rescan(
    target: &WatchTarget,
    scan: &ScanConfig,
    catalog: &[CategoryConfig],
    settings: &mut SettingsStore,
) {
    let report = match scan_once(target, scan, catalog, settings).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("scan failed: {e:#}");
            return;
        }
    };
    if target.json {
        match report::scan_json(&report) {
            Ok(value) => println!("{value}"),
            Err(e) => eprintln!("failed to encode scan: {e}"),
        }
    } else {
        println!(
            "[{}]\n{}",
            chrono::Local::now().format("%H:%M:%S"),
            report::render_scan(&report, catalog)
        );
    }
}
