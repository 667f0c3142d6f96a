//! Configuration structures for extraction and injection.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PdfScanError, Result};

/// Main configuration for the pdfscan tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfScanConfig {
    /// Extraction (dump) configuration.
    pub extract: ExtractConfig,

    /// Injection configuration.
    pub inject: InjectConfig,
}

/// Extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Zero-padding width of the page number in output file names.
    pub page_digits: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { page_digits: 3 }
    }
}

/// Injection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectConfig {
    /// JPEG quality (1-100) for re-encoded replacement images.
    pub jpeg_quality: u8,

    /// Resampling filter used to fit a replacement to the original size.
    pub resize_filter: ResizeFilter,

    /// Keep the `.bak` copy of the document instead of trashing it.
    pub keep_backup: bool,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 75,
            resize_filter: ResizeFilter::CatmullRom,
            keep_backup: false,
        }
    }
}

/// Resampling filters available for resizing replacements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl PdfScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| PdfScanError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.inject.jpeg_quality) {
            return Err(PdfScanError::Config(format!(
                "inject.jpeg_quality must be between 1 and 100, got {}",
                self.inject.jpeg_quality
            )));
        }
        if self.extract.page_digits == 0 {
            return Err(PdfScanError::Config(
                "extract.page_digits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
