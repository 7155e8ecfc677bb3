//! Validation preferences: the time-of-day check toggle and per-category
//! hour windows, persisted as one JSON blob in a [`KvStore`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use storage::KvStore;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SETTINGS_KEY: &str = "folder-finder-settings";

const DEFAULT_RANGES: &[(&str, u8, u8)] = &[
    ("titlow-park-ruston-pics", 15, 16),
    ("airport-pics", 9, 13),
    ("arriving-sign-pics", 8, 9),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("hour {0} is out of range (0-23)")]
    HourOutOfRange(i64),
    #[error("start hour {start} is after end hour {end}")]
    Inverted { start: u8, end: u8 },
    #[error("no time range is configured for '{0}'; give both --start and --end")]
    NoBaseRange(String),
}

/// Inclusive hour-of-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: u8,
    end: u8,
}

impl TimeRange {
    pub fn new(start: u8, end: u8) -> Result<Self, SettingsError> {
        for hour in [start, end] {
            if hour > 23 {
                return Err(SettingsError::HourOutOfRange(i64::from(hour)));
            }
        }
        if start > end {
            return Err(SettingsError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn contains(&self, hour: u32) -> bool {
        hour >= u32::from(self.start) && hour <= u32::from(self.end)
    }
}

/// A window as found in storage, before the hours are known to fit.
#[derive(Debug, Deserialize)]
struct StoredRange {
    start: i64,
    end: i64,
}

impl StoredRange {
    fn into_range(self) -> Result<TimeRange, SettingsError> {
        let hour = |h: i64| {
            u8::try_from(h)
                .ok()
                .filter(|h| *h <= 23)
                .ok_or(SettingsError::HourOutOfRange(h))
        };
        TimeRange::new(hour(self.start)?, hour(self.end)?)
    }
}

/// The raw shape of a stored blob. Values stay untyped so each one is
/// checked on its own and a bad entry costs only itself.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    time_check_enabled: Option<Value>,
    #[serde(default)]
    time_ranges: Option<Value>,
}

pub fn default_time_ranges() -> BTreeMap<String, TimeRange> {
    DEFAULT_RANGES
        .iter()
        .map(|(id, start, end)| {
            (
                id.to_string(),
                TimeRange {
                    start: *start,
                    end: *end,
                },
            )
        })
        .collect()
}

/// The built-in window for a category, if it is time-relevant.
pub fn default_time_range(id: &str) -> Option<TimeRange> {
    DEFAULT_RANGES
        .iter()
        .find(|(default_id, _, _)| *default_id == id)
        .map(|(_, start, end)| TimeRange {
            start: *start,
            end: *end,
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub time_check_enabled: bool,
    pub time_ranges: BTreeMap<String, TimeRange>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_check_enabled: true,
            time_ranges: default_time_ranges(),
        }
    }
}

/// A partial update: each present key replaces the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_check_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_ranges: Option<BTreeMap<String, TimeRange>>,
}

impl Settings {
    /// Shallow merge: each key present in `patch` replaces the current value.
    pub fn merged(mut self, patch: SettingsPatch) -> Self {
        if let Some(enabled) = patch.time_check_enabled {
            self.time_check_enabled = enabled;
        }
        if let Some(ranges) = patch.time_ranges {
            self.time_ranges = ranges;
        }
        self
    }

    /// Builds the patch that changes one or both bounds of `id`'s window.
    /// A missing bound comes from the current window, then the default.
    pub fn range_patch(
        &self,
        id: &str,
        start: Option<u8>,
        end: Option<u8>,
    ) -> Result<SettingsPatch, SettingsError> {
        let base = self
            .time_ranges
            .get(id)
            .copied()
            .or_else(|| default_time_range(id));
        let (start, end) = match (start, end, base) {
            (Some(s), Some(e), _) => (s, e),
            (s, e, Some(base)) => (s.unwrap_or(base.start), e.unwrap_or(base.end)),
            _ => return Err(SettingsError::NoBaseRange(id.to_string())),
        };
        let range = TimeRange::new(start, end)?;
        let mut ranges = self.time_ranges.clone();
        ranges.insert(id.to_string(), range);
        Ok(SettingsPatch {
            time_check_enabled: None,
            time_ranges: Some(ranges),
        })
    }

    /// Defaults overlaid with whatever a stored blob carries. Stored ranges
    /// win and unknown ids are kept. Invalid entries are dropped one by one.
    fn from_stored(stored: StoredSettings) -> Self {
        let mut settings = Settings::default();
        match stored.time_check_enabled {
            None => {}
            Some(Value::Bool(enabled)) => settings.time_check_enabled = enabled,
            Some(other) => warn!(value = %other, "ignoring stored timeCheckEnabled"),
        }
        match stored.time_ranges {
            None => {}
            Some(Value::Object(entries)) => {
                for (id, raw) in entries {
                    let range = serde_json::from_value::<StoredRange>(raw)
                        .map_err(|e| e.to_string())
                        .and_then(|raw| raw.into_range().map_err(|e| e.to_string()));
                    match range {
                        Ok(range) => {
                            settings.time_ranges.insert(id, range);
                        }
                        Err(e) => warn!(id = %id, error = %e, "ignoring stored time range"),
                    }
                }
            }
            Some(other) => warn!(value = %other, "ignoring stored timeRanges"),
        }
        settings
    }
}

/// Loads, merges and persists [`Settings`] against a single key.
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
    key: String,
    current: Settings,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_key(store, SETTINGS_KEY)
    }

    pub fn with_key(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            current: Settings::default(),
        }
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    /// Never fails: absent or unreadable settings fall back to defaults.
    pub async fn load(&mut self) -> Settings {
        let settings = match self.store.get(&self.key).await {
            Ok(Some(raw)) => match serde_json::from_str::<StoredSettings>(&raw) {
                Ok(stored) => {
                    debug!(key = %self.key, "loaded stored settings");
                    Settings::from_stored(stored)
                }
                Err(e) => {
                    warn!(key = %self.key, error = %e, "failed to parse stored settings; using defaults");
                    Settings::default()
                }
            },
            Ok(None) => {
                debug!(key = %self.key, "no stored settings; using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read stored settings; using defaults");
                Settings::default()
            }
        };
        self.current = settings.clone();
        settings
    }

    /// Best effort: failures are logged, not returned.
    pub async fn save(&self, settings: &Settings) {
        let raw = match serde_json::to_string(settings) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to serialize settings");
                return;
            }
        };
        match self.store.set(&self.key, &raw).await {
            Ok(()) => info!(key = %self.key, "saved settings"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to save settings"),
        }
    }

    pub async fn update(&mut self, patch: SettingsPatch) -> Settings {
        let updated = self.current.clone().merged(patch);
        self.save(&updated).await;
        self.current = updated.clone();
        updated
    }
}
