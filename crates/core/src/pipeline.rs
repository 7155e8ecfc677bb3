//! List -> accept -> evaluate, for one selected folder and date.

use crate::catalog;
use crate::config::{RuleConfig, ScanConfig};
use crate::matcher;
use crate::models::{CategoryResult, Status};
use crate::rules::{self, CategoryConfig};
use crate::scanner;
use crate::settings::Settings;
use crate::transfer::TransferListing;
use anyhow::Context;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub base_prefix: String,
    pub files_listed: usize,
    pub results: Vec<CategoryResult>,
}

impl ScanReport {
    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Lists `root` and accepts it as a transfer folder.
pub fn open_transfer(root: &Path, scan: &ScanConfig) -> anyhow::Result<TransferListing> {
    let records = scanner::list_directory(root, scan)?;
    let listing = TransferListing::from_records(records)?;
    info!(
        root = %root.display(),
        years = listing.years().len(),
        files = listing.files().len(),
        "accepted transfer folder"
    );
    Ok(listing)
}

pub fn run_scan(
    root: &Path,
    scan: &ScanConfig,
    year: &str,
    date: &str,
    catalog: &[CategoryConfig],
    settings: &Settings,
) -> anyhow::Result<ScanReport> {
    let listing = open_transfer(root, scan)?;
    let base_prefix = listing.base_prefix(year, date)?;
    let results = matcher::evaluate(listing.files(), &base_prefix, catalog, settings);
    Ok(ScanReport {
        base_prefix,
        files_listed: listing.files().len(),
        results,
    })
}

/// The configured category directory, or the built-in catalog.
pub fn load_catalog(rules_cfg: &RuleConfig) -> anyhow::Result<Vec<CategoryConfig>> {
    let Some(dir) = &rules_cfg.path else {
        return Ok(catalog::builtin());
    };
    let categories = rules::load_categories_from_dir(Path::new(dir))
        .with_context(|| format!("loading categories from {dir}"))?;
    if categories.is_empty() {
        warn!(dir = %dir, "no category files found; using built-in catalog");
        return Ok(catalog::builtin());
    }
    Ok(categories)
}
