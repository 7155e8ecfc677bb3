//! Accepting a selected directory tree and exposing its year/date facets.

use crate::models::FileRecord;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

lazy_static::lazy_static! {
    static ref TRANSFER_ROOT: Regex = Regex::new(r"^\d{4} TRANSFER$").unwrap();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("no files were found in the selected folder")]
    Empty,
    #[error(
        "incorrect folder structure: select a year transfer folder such as '2024 TRANSFER', not '{found}'"
    )]
    InvalidRoot { found: String },
    #[error("'{year}/{date}' is not a date folder of this transfer")]
    UnknownSelection { year: String, date: String },
}

pub fn is_transfer_root(name: &str) -> bool {
    TRANSFER_ROOT.is_match(name)
}

/// An accepted listing. Only constructed through [`TransferListing::from_records`],
/// so every record sits below a valid transfer root.
#[derive(Debug, Clone)]
pub struct TransferListing {
    files: Vec<FileRecord>,
    dates_by_year: BTreeMap<String, BTreeSet<String>>,
}

impl TransferListing {
    pub fn from_records(files: Vec<FileRecord>) -> Result<Self, UploadError> {
        if files.is_empty() {
            return Err(UploadError::Empty);
        }
        if let Some(bad) = files
            .iter()
            .map(|f| root_segment(&f.path))
            .find(|root| !is_transfer_root(root))
        {
            return Err(UploadError::InvalidRoot {
                found: bad.to_string(),
            });
        }

        let mut dates_by_year: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for file in &files {
            let mut segments = file.path.split('/');
            let year = segments.next().unwrap_or_default();
            let dates = dates_by_year.entry(year.to_string()).or_default();
            // The date segment must be a directory, not a file in the root.
            if let (Some(date), Some(_)) = (segments.next(), segments.next()) {
                if !date.is_empty() {
                    dates.insert(date.to_string());
                }
            }
        }
        Ok(Self {
            files,
            dates_by_year,
        })
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn years(&self) -> Vec<&str> {
        self.dates_by_year.keys().map(String::as_str).collect()
    }

    pub fn dates(&self, year: &str) -> Vec<&str> {
        self.dates_by_year
            .get(year)
            .map(|dates| dates.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn dates_by_year(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.dates_by_year
    }

    /// The scan scope for a selection: `"{year}/{date}"`.
    pub fn base_prefix(&self, year: &str, date: &str) -> Result<String, UploadError> {
        let known = self
            .dates_by_year
            .get(year)
            .map(|dates| dates.contains(date))
            .unwrap_or(false);
        if !known {
            return Err(UploadError::UnknownSelection {
                year: year.to_string(),
                date: date.to_string(),
            });
        }
        Ok(format!("{year}/{date}"))
    }
}

fn root_segment(path: &str) -> &str {
    path.split('/').next().unwrap_or_default()
}
