//! Human-readable and JSON renderings of scans, facets and settings.

use validator_core::pipeline::ScanReport;
use validator_core::{CategoryConfig, CategoryResult, Settings, Status, TransferListing};

fn status_mark(status: Status) -> &'static str {
    match status {
        Status::Passing => "[PASS]",
        Status::Failing => "[FAIL]",
        Status::Pending => "[ -- ]",
    }
}

fn required_list(config: &CategoryConfig) -> String {
    config
        .required
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-label found/missing breakdown, labels in rule order.
fn label_breakdown(config: &CategoryConfig, result: &CategoryResult) -> Option<String> {
    let mut labels: Vec<&str> = Vec::new();
    for label in config.rules.iter().filter_map(|r| r.category.as_deref()) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    let parts: Vec<String> = labels
        .into_iter()
        .map(|label| {
            let mark = if result.has_label(label) { "ok" } else { "missing" };
            format!("{label}: {mark}")
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

pub fn render_scan(report: &ScanReport, catalog: &[CategoryConfig]) -> String {
    let mut out = format!(
        "Scan of {} ({} files listed)\n",
        report.base_prefix, report.files_listed
    );
    let width = catalog
        .iter()
        .map(|c| c.display_name().len())
        .max()
        .unwrap_or(0);
    for (config, result) in catalog.iter().zip(&report.results) {
        out.push_str(&format!(
            "{} {:width$}  {}  [{}]\n",
            status_mark(result.status),
            config.display_name(),
            config.display_path,
            required_list(config),
            width = width
        ));
        out.push_str(&format!("       {}\n", result.message));
        if let Some(breakdown) = label_breakdown(config, result) {
            out.push_str(&format!("       {breakdown}\n"));
        }
    }
    out.push_str(&format!(
        "{} passing, {} failing, {} pending\n",
        report.count(Status::Passing),
        report.count(Status::Failing),
        report.count(Status::Pending)
    ));
    out
}

pub fn scan_json(report: &ScanReport) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(report)
}

pub fn render_facets(listing: &TransferListing) -> String {
    let mut out = String::new();
    for year in listing.years() {
        out.push_str(&format!("{year}\n"));
        for date in listing.dates(year) {
            out.push_str(&format!("  {date}\n"));
        }
    }
    out
}

pub fn render_catalog(catalog: &[CategoryConfig], settings: &Settings) -> String {
    let mut out = String::new();
    for config in catalog {
        let window = settings
            .time_ranges
            .get(&config.id)
            .map(|r| format!("  hours {:02}-{:02}", r.start(), r.end()))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:<28} {:<32} [{}] {} rule(s){}\n",
            config.id,
            config.display_name(),
            required_list(config),
            config.rules.len(),
            window
        ));
    }
    out
}

pub fn render_settings(settings: &Settings, catalog: &[CategoryConfig]) -> String {
    let mut out = format!(
        "time check: {}\n",
        if settings.time_check_enabled { "on" } else { "off" }
    );
    for (id, range) in &settings.time_ranges {
        let known = catalog.iter().any(|c| &c.id == id);
        out.push_str(&format!(
            "  {:<28} {:02}-{:02}{}\n",
            id,
            range.start(),
            range.end(),
            if known { "" } else { "  (unused)" }
        ));
    }
    out
}
