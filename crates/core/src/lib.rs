//! Core library: transfer-folder listing, category rules, matching, settings.

pub mod catalog;
pub mod config;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod scanner;
pub mod settings;
pub mod transfer;

pub use matcher::{evaluate, evaluate_in};
pub use models::{CategoryResult, FileRecord, FoundDetails, Status};
pub use rules::{CategoryConfig, MatchRule};
pub use settings::{Settings, SettingsPatch, SettingsStore, TimeRange};
pub use transfer::{TransferListing, UploadError};
