//! Command-line tools for scanned PDFs.
//!
//! `pdfscan-dump` writes every page image of a document next to it, and
//! `pdfscan-inject` puts edited copies of those images back.

pub mod commands;
pub mod effects;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use pdfscan_core::PdfScanConfig;

/// Install the global subscriber, with the level taken from the `-v` count.
pub fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// `<config dir>/pdfscan/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pdfscan")
        .join("config.json")
}

/// Load the configuration from `path`, else the default location, else defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PdfScanConfig> {
    if let Some(path) = path {
        return PdfScanConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config {}", default_path.display());
        PdfScanConfig::from_file(&default_path)
            .with_context(|| format!("Failed to load config {}", default_path.display()))
    } else {
        Ok(PdfScanConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"extract": {"page_digits": 4}}"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.extract.page_digits, 4);
        assert_eq!(config.inject, PdfScanConfig::default().inject);
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }
}
