//! Build information
//!
//! Values embedded by `build.rs`, shown in the startup banner and by
//! `kairos_status`.

use std::fmt;

use serde::Serialize;

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const BUILD_NUMBER: Option<&str> = option_env!("KAIROSMIX_BUILD_NUMBER");
const BUILD_TIMESTAMP: Option<&str> = option_env!("KAIROSMIX_BUILD_TIMESTAMP");

/// Version and build stamp of the running binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self::from_stamp(BUILD_NUMBER, BUILD_TIMESTAMP)
    }

    /// A missing or unparsable stamp reads as build 0, time "unknown"
    fn from_stamp(number: Option<&'static str>, timestamp: Option<&'static str>) -> Self {
        Self {
            version: VERSION,
            build_number: number.and_then(|n| n.trim().parse().ok()).unwrap_or(0),
            build_timestamp: timestamp.unwrap_or("unknown"),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{} build {} ({})",
            self.version, self.build_number, self.build_timestamp
        )
    }
}

/// Print the startup banner to stderr
pub fn print_startup_banner() {
    eprintln!("-----------------------------------------------");
    eprintln!("  KairosMix custom mix designer");
    eprintln!("  {}", BuildInfo::current());
    eprintln!("-----------------------------------------------");
}
