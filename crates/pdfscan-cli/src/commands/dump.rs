//! Dump command - write every page image of a document next to it.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{debug, warn};

use pdfscan_core::models::config::PdfScanConfig;
use pdfscan_core::{ScanDocument, naming, recover_image};

use crate::effects::Effects;

/// Arguments for the dump command.
#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    /// PDF document to extract images from
    #[arg(required = true)]
    pub doc_path: PathBuf,

    /// Print results but don't write any files (images are still counted as extracted)
    #[arg(long)]
    pub dry: bool,
}

/// Counts reported at the end of a dump.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DumpReport {
    /// Image placements over all pages.
    pub placements: usize,
    /// Distinct image objects.
    pub unique: usize,
    /// Images written (or that would be, in a dry run).
    pub extracted: usize,
    /// Images that could not be recovered.
    pub failed: usize,
}

pub fn run(args: &DumpArgs, config: &PdfScanConfig, effects: &mut dyn Effects) -> anyhow::Result<DumpReport> {
    let doc = ScanDocument::open(&args.doc_path)
        .with_context(|| format!("Failed to open {}", args.doc_path.display()))?;

    let mut report = DumpReport::default();
    let mut seen = HashSet::new();

    for page_index in 0..doc.page_count() {
        let images = doc.page_images(page_index)?;
        let mut written_on_page = HashSet::new();

        for image in images {
            report.placements += 1;
            if !seen.insert(image.xref) {
                debug!("Image {:?} already extracted", image.xref);
                continue;
            }

            let recovered = match recover_image(&doc, &image) {
                Ok(recovered) => recovered,
                Err(e) => {
                    println!(
                        "{} Failed to extract image '{}' on page {}: {}",
                        style("✗").red(),
                        image.name,
                        page_index + 1,
                        e
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let path = naming::image_file_name(
                &args.doc_path,
                page_index,
                recovered.ext,
                config.extract.page_digits,
            );
            if !written_on_page.insert(path.clone()) {
                warn!("Several images on page {} share {}", page_index + 1, path.display());
            }

            println!("Got image '{}'", path.display());
            effects.write_file(&path, &recovered.data)?;
            report.extracted += 1;
        }
    }

    report.unique = seen.len();
    println!(
        "{} images in total ({} placements)",
        report.unique, report.placements
    );
    println!("{} images extracted", report.extracted);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{DiskEffects, DryRunEffects};
    use pdfscan_core::testing::{FixtureImage, PdfBuilder, scan_pdf};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn dump(doc_path: &Path, dry: bool) -> DumpReport {
        let args = DumpArgs {
            doc_path: doc_path.to_path_buf(),
            dry,
        };
        let mut effects: Box<dyn Effects> = if dry {
            Box::new(DryRunEffects)
        } else {
            Box::new(DiskEffects)
        };
        run(&args, &PdfScanConfig::default(), effects.as_mut()).unwrap()
    }

    #[test]
    fn test_dump_unique_images() {
        let dir = TempDir::new().unwrap();
        let doc_path = dir.path().join("scan.pdf");
        fs::write(&doc_path, scan_pdf(3, 8, 8)).unwrap();

        let report = dump(&doc_path, false);
        assert_eq!(
            report,
            DumpReport {
                placements: 3,
                unique: 3,
                extracted: 3,
                failed: 0
            }
        );
        for page in 1..=3 {
            assert!(dir.path().join(format!("scan p00{}.jpg", page)).exists());
        }
    }

    #[test]
    fn test_dump_shared_image_once() {
        let dir = TempDir::new().unwrap();
        let doc_path = dir.path().join("shared.pdf");
        let mut builder = PdfBuilder::new();
        let logo = builder.add_image(FixtureImage::jpeg(4, 4));
        let photo = builder.add_image(FixtureImage::rgb(4, 4));
        builder.add_page(&[logo]);
        builder.add_page(&[logo]);
        builder.add_page(&[photo]);
        builder.write_to(&doc_path).unwrap();

        let report = dump(&doc_path, false);
        assert_eq!(report.placements, 3);
        assert_eq!(report.unique, 2);
        assert_eq!(report.extracted, 2);

        assert!(dir.path().join("shared p001.jpg").exists());
        assert!(!dir.path().join("shared p002.jpg").exists());
        assert!(dir.path().join("shared p003.png").exists());
    }

    #[test]
    fn test_dump_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let doc_path = dir.path().join("scan.pdf");
        fs::write(&doc_path, scan_pdf(2, 8, 8)).unwrap();

        let report = dump(&doc_path, true);
        assert_eq!(report.extracted, 2);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_dump_skips_broken_image() {
        let dir = TempDir::new().unwrap();
        let doc_path = dir.path().join("broken.pdf");
        let mut builder = PdfBuilder::new();
        let mut truncated = FixtureImage::rgb(10, 10);
        truncated.data.truncate(7);
        let bad = builder.add_image(truncated);
        let good = builder.add_image(FixtureImage::jpeg(4, 4));
        builder.add_page(&[bad]);
        builder.add_page(&[good]);
        builder.write_to(&doc_path).unwrap();

        let report = dump(&doc_path, false);
        assert_eq!(report.failed, 1);
        assert_eq!(report.extracted, 1);
        assert!(dir.path().join("broken p002.jpg").exists());
    }

    #[test]
    fn test_dump_missing_document() {
        let dir = TempDir::new().unwrap();
        let args = DumpArgs {
            doc_path: dir.path().join("absent.pdf"),
            dry: true,
        };
        let err = run(&args, &PdfScanConfig::default(), &mut DryRunEffects).unwrap_err();
        assert!(err.to_string().contains("Failed to open"));
    }
}
