//! Side effects of the dump and inject commands.
//!
//! Everything that touches the filesystem goes through [`Effects`], so a dry
//! run swaps in [`DryRunEffects`] and tests can observe what was done.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use pdfscan_core::ScanDocument;

/// Destructive operations performed by a command.
pub trait Effects {
    /// Write a new file.
    fn write_file(&mut self, path: &Path, data: &[u8]) -> anyhow::Result<()>;

    /// Copy a file.
    fn copy_file(&mut self, from: &Path, to: &Path) -> anyhow::Result<()>;

    /// Save a modified document in place as an incremental update.
    fn save_document(&mut self, doc: &mut ScanDocument, path: &Path) -> anyhow::Result<()>;

    /// Move a file to the recycle bin.
    fn trash(&mut self, path: &Path) -> anyhow::Result<()>;
}

/// Effects for a dry run or a real one.
pub fn for_run(dry: bool) -> Box<dyn Effects> {
    if dry {
        Box::new(DryRunEffects)
    } else {
        Box::new(DiskEffects)
    }
}

/// Performs every operation on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskEffects;

impl Effects for DiskEffects {
    fn write_file(&mut self, path: &Path, data: &[u8]) -> anyhow::Result<()> {
        fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> anyhow::Result<()> {
        fs::copy(from, to)
            .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
        Ok(())
    }

    fn save_document(&mut self, doc: &mut ScanDocument, path: &Path) -> anyhow::Result<()> {
        doc.save_incremental(path)
            .with_context(|| format!("Failed to save {}", path.display()))
    }

    fn trash(&mut self, path: &Path) -> anyhow::Result<()> {
        trash::delete(path).with_context(|| format!("Failed to trash {}", path.display()))
    }
}

/// Logs each operation and performs none.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunEffects;

impl Effects for DryRunEffects {
    fn write_file(&mut self, path: &Path, data: &[u8]) -> anyhow::Result<()> {
        info!("Dry run: would write {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> anyhow::Result<()> {
        info!("Dry run: would copy {} to {}", from.display(), to.display());
        Ok(())
    }

    fn save_document(&mut self, doc: &mut ScanDocument, path: &Path) -> anyhow::Result<()> {
        info!(
            "Dry run: would save {} replaced images to {}",
            doc.replaced_images(),
            path.display()
        );
        Ok(())
    }

    fn trash(&mut self, path: &Path) -> anyhow::Result<()> {
        info!("Dry run: would trash {}", path.display());
        Ok(())
    }
}

/// Real writes, with "trashed" files moved into a directory.
#[cfg(test)]
pub(crate) struct TestEffects {
    pub trash_dir: std::path::PathBuf,
    pub trashed: Vec<std::path::PathBuf>,
    pub copies: Vec<(std::path::PathBuf, std::path::PathBuf)>,
}

#[cfg(test)]
impl TestEffects {
    pub fn new(trash_dir: &Path) -> Self {
        fs::create_dir_all(trash_dir).unwrap();
        Self {
            trash_dir: trash_dir.to_path_buf(),
            trashed: Vec::new(),
            copies: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Effects for TestEffects {
    fn write_file(&mut self, path: &Path, data: &[u8]) -> anyhow::Result<()> {
        DiskEffects.write_file(path, data)
    }

    fn copy_file(&mut self, from: &Path, to: &Path) -> anyhow::Result<()> {
        self.copies.push((from.to_path_buf(), to.to_path_buf()));
        DiskEffects.copy_file(from, to)
    }

    fn save_document(&mut self, doc: &mut ScanDocument, path: &Path) -> anyhow::Result<()> {
        DiskEffects.save_document(doc, path)
    }

    fn trash(&mut self, path: &Path) -> anyhow::Result<()> {
        let name = path.file_name().context("no file name")?;
        fs::rename(path, self.trash_dir.join(name))?;
        self.trashed.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"keep").unwrap();

        let mut effects = for_run(true);
        effects.write_file(&dir.path().join("b.txt"), b"x").unwrap();
        effects.copy_file(&source, &dir.path().join("c.txt")).unwrap();
        effects.trash(&source).unwrap();

        assert!(source.exists());
        assert!(!dir.path().join("b.txt").exists());
        assert!(!dir.path().join("c.txt").exists());
    }

    #[test]
    fn test_disk_effects_write_and_copy() {
        let dir = TempDir::new().unwrap();
        let written = dir.path().join("out.bin");
        let copied = dir.path().join("copy.bin");

        let mut effects = DiskEffects;
        effects.write_file(&written, b"payload").unwrap();
        effects.copy_file(&written, &copied).unwrap();

        assert_eq!(fs::read(&copied).unwrap(), b"payload");
    }

    #[test]
    fn test_disk_effects_write_into_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = DiskEffects
            .write_file(&dir.path().join("missing/out.bin"), b"x")
            .unwrap_err();
        assert!(err.to_string().contains("Failed to write"));
    }
}
