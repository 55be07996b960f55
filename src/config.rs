//! Runtime configuration
//!
//! Read from environment variables at startup.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::DuplicatePolicy;

pub const DATABASE_PATH_VAR: &str = "KAIROSMIX_DATABASE_PATH";
pub const DUPLICATE_POLICY_VAR: &str = "KAIROSMIX_DUPLICATE_POLICY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be 'reject' or 'merge', got '{value}'")]
    InvalidDuplicatePolicy { var: &'static str, value: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        let duplicate_policy = match lookup(DUPLICATE_POLICY_VAR) {
            Some(value) => DuplicatePolicy::parse(&value).ok_or(
                ConfigError::InvalidDuplicatePolicy {
                    var: DUPLICATE_POLICY_VAR,
                    value,
                },
            )?,
            None => DuplicatePolicy::default(),
        };

        Ok(Self {
            database_path,
            duplicate_policy,
        })
    }
}

/// `data/kairosmix.db` under the project root (or next to the executable)
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("kairosmix.db");
    path
}
