//! File naming shared by extraction and injection.
//!
//! Extracted images are written as `<doc base> p<NNN>.<ext>` next to the
//! document, and a replacement image addresses its page through the same
//! `p<NNN>` token.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::PageNumberError;
use crate::models::extracted::ImageExt;

lazy_static! {
    // Runs of non-word characters separate file name tokens
    static ref TOKEN_SEPARATOR: Regex = Regex::new(r"\W+").unwrap();

    static ref NON_DIGIT: Regex = Regex::new(r"[^0-9]").unwrap();
}

/// Resolve the 1-based page a replacement file targets.
///
/// The page is the second-to-last token of the file name with every
/// non-digit removed, so `scan p007.png` and `scan_page7.jpg` both give 7.
pub fn page_from_file_name(path: &Path) -> Result<u32, PageNumberError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tokens: Vec<&str> = TOKEN_SEPARATOR.split(&file_name).collect();
    if tokens.len() < 2 {
        return Err(PageNumberError::Unresolvable(file_name));
    }

    let digits = NON_DIGIT.replace_all(tokens[tokens.len() - 2], "");
    match digits.parse::<u32>() {
        Ok(0) => Err(PageNumberError::Zero(file_name)),
        Ok(page) => Ok(page),
        Err(_) => Err(PageNumberError::Unresolvable(file_name)),
    }
}

/// The document path without its extension.
pub fn doc_base(doc_path: &Path) -> PathBuf {
    doc_path.with_extension("")
}

/// Output path for the image extracted from a 0-based page index.
pub fn image_file_name(doc_path: &Path, page_index: u32, ext: ImageExt, digits: usize) -> PathBuf {
    let mut name = doc_base(doc_path).into_os_string();
    name.push(format!(" p{:0width$}.{}", page_index + 1, ext, width = digits));
    PathBuf::from(name)
}

/// Where the original document is copied before an in-place save.
pub fn backup_path(doc_path: &Path) -> PathBuf {
    let mut name = doc_base(doc_path).into_os_string();
    name.push(".bak");
    if let Some(ext) = doc_path.extension() {
        name.push(".");
        name.push(ext);
    }
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(name: &str) -> Result<u32, PageNumberError> {
        page_from_file_name(Path::new(name))
    }

    #[test]
    fn test_page_from_file_name() {
        assert_eq!(page("doc p001.png"), Ok(1));
        assert_eq!(page("doc p042.jpg"), Ok(42));
        assert_eq!(page("/scans/my doc p0020.png"), Ok(20));
        assert_eq!(page("report_page7.tiff"), Ok(7));
    }

    #[test]
    fn test_page_token_missing() {
        assert_eq!(
            page("doc.png"),
            Err(PageNumberError::Unresolvable("doc.png".to_string()))
        );
        assert!(matches!(page("doc pXYZ.png"), Err(PageNumberError::Unresolvable(_))));
        assert!(matches!(page("README"), Err(PageNumberError::Unresolvable(_))));
    }

    #[test]
    fn test_page_zero_rejected() {
        assert_eq!(
            page("doc p000.png"),
            Err(PageNumberError::Zero("doc p000.png".to_string()))
        );
    }

    #[test]
    fn test_only_directory_ignored() {
        // Digits in directory names do not count.
        assert!(matches!(
            page("/tmp/p5/doc.png"),
            Err(PageNumberError::Unresolvable(_))
        ));
    }

    #[test]
    fn test_image_file_name() {
        let doc = Path::new("/scans/my doc.pdf");
        assert_eq!(
            image_file_name(doc, 0, ImageExt::Png, 3),
            PathBuf::from("/scans/my doc p001.png")
        );
        assert_eq!(
            image_file_name(doc, 1233, ImageExt::Jpeg, 3),
            PathBuf::from("/scans/my doc p1234.jpg")
        );
        assert_eq!(
            image_file_name(doc, 4, ImageExt::Pam, 4),
            PathBuf::from("/scans/my doc p0005.pam")
        );
    }

    #[test]
    fn test_extracted_name_resolves_back() {
        let doc = Path::new("book.pdf");
        let name = image_file_name(doc, 41, ImageExt::Png, 3);
        assert_eq!(page_from_file_name(&name), Ok(42));
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/scans/book.pdf")),
            PathBuf::from("/scans/book.bak.pdf")
        );
        assert_eq!(backup_path(Path::new("book")), PathBuf::from("book.bak"));
    }
}
