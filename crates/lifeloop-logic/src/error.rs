//! Error types for the loading and persistence edges of the library.
//!
//! The per-tick simulation itself is infallible: shortages degrade output,
//! clock regressions are reported as a [`crate::scheduler::PassOutcome`].
//! Only whole-document parse failures surface here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifeSupportError {
    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot version: found {found}, supported up to {supported}")]
    UnsupportedSnapshotVersion { found: u32, supported: u32 },
}

pub type LifeSupportResult<T> = Result<T, LifeSupportError>;
