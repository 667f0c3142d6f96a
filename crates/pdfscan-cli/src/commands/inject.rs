//! Inject command - put edited page images back into a document.
//!
//! Each replacement file names its page the way `pdfscan-dump` does
//! (`<doc base> p<NNN>.<ext>`) and takes the place of the first image on
//! that page.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use glob::{Pattern, glob};
use tracing::{debug, info};

use pdfscan_core::models::config::{InjectConfig, PdfScanConfig};
use pdfscan_core::{JpegReplacement, PdfError, ScanDocument, naming};

use crate::effects::Effects;

/// Arguments for the inject command.
#[derive(Args, Debug, Clone)]
pub struct InjectArgs {
    /// PDF document to inject images into
    #[arg(required = true)]
    pub doc_path: PathBuf,

    /// Images to inject (default: files named after the document)
    pub img_paths: Vec<PathBuf>,

    /// Print results but don't modify anything
    #[arg(long)]
    pub dry: bool,

    /// Keep the backup copy of the original document
    #[arg(long)]
    pub backup: bool,
}

/// Outcome of an inject run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InjectReport {
    /// Replacement files considered.
    pub candidates: usize,
    /// Files whose image went into the document.
    pub injected: Vec<PathBuf>,
    /// Files skipped with a diagnostic.
    pub skipped: usize,
    /// Whether the document was saved.
    pub saved: bool,
    /// Backup copy left in place.
    pub kept_backup: Option<PathBuf>,
}

pub fn run(args: &InjectArgs, config: &PdfScanConfig, effects: &mut dyn Effects) -> anyhow::Result<InjectReport> {
    let mut doc = ScanDocument::open(&args.doc_path)
        .with_context(|| format!("Failed to open {}", args.doc_path.display()))?;

    let candidates = if args.img_paths.is_empty() {
        discover_images(&args.doc_path)?
    } else {
        args.img_paths.clone()
    };

    let mut report = InjectReport {
        candidates: candidates.len(),
        ..Default::default()
    };

    if candidates.is_empty() {
        println!("No images to inject! Exiting");
        return Ok(report);
    }

    for img_path in &candidates {
        match inject_one(&mut doc, img_path, &config.inject) {
            Ok(page_number) => {
                println!(
                    "Replacing image on page {} with '{}'",
                    page_number,
                    img_path.display()
                );
                report.injected.push(img_path.clone());
            }
            Err(e) => {
                println!(
                    "{} Skipping '{}': {}",
                    style("✗").red(),
                    img_path.display(),
                    e
                );
                report.skipped += 1;
            }
        }
    }

    if report.injected.is_empty() {
        println!("Nothing injected, {} left untouched", args.doc_path.display());
        return Ok(report);
    }

    if !doc.can_save_incrementally() {
        anyhow::bail!(
            "Cannot save {} incrementally: the document is encrypted",
            args.doc_path.display()
        );
    }

    let backup = naming::backup_path(&args.doc_path);
    println!(
        "Copy original {} -> {}",
        args.doc_path.display(),
        backup.display()
    );
    effects.copy_file(&args.doc_path, &backup)?;

    println!("Save -> {}", args.doc_path.display());
    effects.save_document(&mut doc, &args.doc_path)?;
    report.saved = true;

    for img_path in &report.injected {
        println!("Trashing '{}'", img_path.display());
        effects.trash(img_path)?;
    }

    if args.backup || config.inject.keep_backup {
        println!("{} Kept backup {}", style("✓").green(), backup.display());
        report.kept_backup = Some(backup);
    } else {
        println!("Trashing backup {}", backup.display());
        effects.trash(&backup)?;
    }

    Ok(report)
}

/// Files sharing the document's base name, other than the document and its backup.
pub fn discover_images(doc_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let base = naming::doc_base(doc_path);
    let pattern = format!("{}*", Pattern::escape(&base.to_string_lossy()));
    debug!("Looking for replacement images matching {}", pattern);

    let excluded = [
        doc_path.file_name().map(|n| n.to_os_string()),
        naming::backup_path(doc_path).file_name().map(|n| n.to_os_string()),
    ];

    let mut paths: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| !excluded.contains(&p.file_name().map(|n| n.to_os_string())))
        .collect();
    paths.sort();

    info!("Found {} replacement images", paths.len());
    Ok(paths)
}

/// Replace the first image on the file's page, returning the 1-based page number.
fn inject_one(doc: &mut ScanDocument, img_path: &Path, config: &InjectConfig) -> pdfscan_core::Result<u32> {
    let page_number = naming::page_from_file_name(img_path)?;

    let target = doc
        .page_images(page_number - 1)?
        .into_iter()
        .next()
        .ok_or(PdfError::NoImageOnPage(page_number))?;

    let replacement = JpegReplacement::from_file(img_path, target.width, target.height, config)?;
    doc.replace_image(target.xref, &replacement)?;
    Ok(page_number)
}
