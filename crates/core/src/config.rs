use crate::settings::SETTINGS_KEY;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use storage::{FileStore, KvStore, MemoryStore, SqliteStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub rules: RuleConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory holding the settings blob (file) or database (sqlite).
    #[serde(default = "default_state_dir")]
    pub path: String,
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_state_dir(),
            key: default_key(),
        }
    }
}

impl SettingsConfig {
    pub async fn open_store(&self) -> anyhow::Result<Arc<dyn KvStore>> {
        let store: Arc<dyn KvStore> = match self.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File => Arc::new(FileStore::new(&self.path)),
            StoreBackend::Sqlite => {
                let db = PathBuf::from(&self.path).join("settings.db");
                let db = db.to_string_lossy().into_owned();
                Arc::new(
                    SqliteStore::open(&db)
                        .await
                        .with_context(|| format!("opening settings database {db}"))?,
                )
            }
        };
        Ok(store)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Globs matched against paths relative to the selected folder.
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: default_excludes(),
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Directory of category TOML files replacing the built-in catalog.
    pub path: Option<String>,
}

fn default_state_dir() -> String {
    dirs::config_dir()
        .map(|d| d.join("folder-validator"))
        .unwrap_or_else(|| PathBuf::from(".folder-validator"))
        .to_string_lossy()
        .into_owned()
}

fn default_key() -> String {
    SETTINGS_KEY.to_string()
}

fn default_excludes() -> Vec<String> {
    vec!["**/Thumbs.db".to_string(), "**/desktop.ini".to_string()]
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(config::Environment::with_prefix("VALIDATOR").separator("__"));
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_take_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("validator.toml");
        std::fs::write(&file, "[scan]\ninclude_hidden = true\n").unwrap();

        let cfg = load(Some(file.to_str().unwrap())).unwrap();
        assert!(cfg.scan.include_hidden);
        assert_eq!(cfg.scan.exclude, default_excludes());
        assert_eq!(cfg.settings.backend, StoreBackend::File);
        assert_eq!(cfg.settings.key, SETTINGS_KEY);
        assert!(cfg.rules.path.is_none());
    }

    #[test]
    fn reads_backend_and_rule_dir() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("validator.toml");
        std::fs::write(
            &file,
            "[settings]\nbackend = \"sqlite\"\npath = \"/tmp/fv\"\n\n[rules]\npath = \"rules\"\n",
        )
        .unwrap();

        let cfg = load(Some(file.to_str().unwrap())).unwrap();
        assert_eq!(cfg.settings.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.settings.path, "/tmp/fv");
        assert_eq!(cfg.rules.path.as_deref(), Some("rules"));
    }

    #[tokio::test]
    async fn file_backend_opens_under_the_state_dir() {
        let temp = tempfile::tempdir().unwrap();
        let cfg = SettingsConfig {
            backend: StoreBackend::File,
            path: temp.path().to_string_lossy().into_owned(),
            key: SETTINGS_KEY.to_string(),
        };
        let store = cfg.open_store().await.unwrap();
        store.set(SETTINGS_KEY, "{}").await.unwrap();
        assert!(temp.path().join(format!("{SETTINGS_KEY}.json")).exists());
    }
}
