use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One entry of a selected directory tree.
///
/// `path` is relative to the folder the user picked, `/`-separated, and
/// starts with that folder's own name (`2024 TRANSFER/05-01/PHOTOS/a.jpg`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub mtime_ms: i64,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, mtime_ms: i64) -> Self {
        Self {
            path: path.into(),
            mtime_ms,
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.path)
    }

    /// The containing directory, without a trailing slash.
    pub fn dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// Lowercased text after the last `.` of the file name.
    pub fn extension(&self) -> Option<String> {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
    }

    /// True when the record lives below `base` on a path-segment boundary.
    pub fn is_within(&self, base: &str) -> bool {
        let base = base.trim_end_matches('/');
        if base.is_empty() {
            return true;
        }
        self.path
            .strip_prefix(base)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passing,
    Failing,
    Pending,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passing => "passing",
            Status::Failing => "failing",
            Status::Pending => "pending",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension -> sub-category labels of the rules it satisfied.
pub type FoundDetails = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub id: String,
    pub status: Status,
    pub message: String,
    pub found_details: FoundDetails,
}

impl CategoryResult {
    pub fn pending(id: &str, message: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Status::Pending,
            message: message.to_string(),
            found_details: FoundDetails::new(),
        }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.found_details
            .values()
            .any(|labels| labels.iter().any(|l| l == label))
    }
}
