use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("duplicate category id '{0}'")]
    DuplicateId(String),
    #[error("category '{0}' declares no required extensions")]
    NoExtensions(String),
}

/// One path-pattern constraint inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchRule {
    /// Directory pattern below the base prefix; `*` matches any substring.
    pub path_pattern: String,
    /// Any-of, case-insensitive substrings of the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Sub-category label recorded on a match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl MatchRule {
    pub fn new(path_pattern: &str) -> Self {
        Self {
            path_pattern: path_pattern.to_string(),
            keywords: None,
            category: None,
        }
    }

    pub fn labelled(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = Some(keywords.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn accepts_name(&self, file_name: &str) -> bool {
        match &self.keywords {
            None => true,
            Some(keywords) => {
                let name = file_name.to_lowercase();
                keywords.iter().any(|k| name.contains(&k.to_lowercase()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryConfig {
    pub id: String,
    /// Folder type, e.g. "Airport".
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_kind: Option<String>,
    #[serde(default)]
    pub display_path: String,
    /// Required extensions, lowercase, in declared order.
    pub required: Vec<String>,
    #[serde(default)]
    pub rules: Vec<MatchRule>,
}

impl CategoryConfig {
    pub fn display_name(&self) -> String {
        match &self.sub_kind {
            Some(sub) => format!("{} {}", self.kind, sub),
            None => self.kind.clone(),
        }
    }

    pub fn requires(&self, ext: &str) -> bool {
        self.required.iter().any(|r| r == ext)
    }

    /// Lowercases and dedupes required extensions, keeping first occurrence.
    fn normalize(mut self) -> Self {
        let mut seen = HashSet::new();
        self.required = self
            .required
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| seen.insert(e.clone()))
            .collect();
        self
    }
}

/// A rule's directory pattern joined to a base prefix and compiled to an
/// anchored matcher. Only `*` is special.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn compile(base: &str, pattern: &str) -> Result<Self, regex::Error> {
        let base = base.trim_end_matches('/');
        let source = if base.is_empty() {
            pattern.to_string()
        } else {
            format!("{base}/{pattern}")
        };
        let body = regex::escape(&source).replace(r"\*", ".*");
        let regex = Regex::new(&format!("(?s)^{body}$"))?;
        Ok(Self { source, regex })
    }

    pub fn is_match(&self, dir: &str) -> bool {
        self.regex.is_match(dir)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

pub fn validate_catalog(categories: &[CategoryConfig]) -> Result<(), CatalogError> {
    let mut ids = HashSet::new();
    for category in categories {
        if !ids.insert(category.id.as_str()) {
            return Err(CatalogError::DuplicateId(category.id.clone()));
        }
        if category.required.is_empty() {
            return Err(CatalogError::NoExtensions(category.id.clone()));
        }
    }
    Ok(())
}

/// Loads one category per `*.toml` file, ordered by file name.
pub fn load_categories_from_dir(dir: &Path) -> Result<Vec<CategoryConfig>, CatalogError> {
    let mut categories = Vec::new();
    if !dir.exists() {
        return Ok(categories);
    }
    let read_err = |source: std::io::Error| CatalogError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("toml") {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let content = fs::read_to_string(&path).map_err(|source| CatalogError::Read {
            path: path.clone(),
            source,
        })?;
        let category: CategoryConfig =
            toml::from_str(&content).map_err(|source| CatalogError::Parse {
                path: path.clone(),
                source,
            })?;
        categories.push(category.normalize());
    }
    validate_catalog(&categories)?;
    Ok(categories)
}
