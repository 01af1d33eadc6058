//! Text extraction: newspaper PDF bytes → plain text.
//!
//! Only the embedded text layer is read. A scanned newspaper without one
//! yields an empty (or near-empty) string, which is passed downstream as-is;
//! the classifier then simply finds nothing to brief.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state. Loading and walking the
//! document happens on the blocking pool so the queue's async worker never
//! stalls on a large edition.

use crate::engine;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns a stored document into plain text.
///
/// Implementations must be deterministic: the same bytes always yield the
/// same text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path, bytes: Vec<u8>) -> Result<String, PipelineError>;
}

/// [`TextExtractor`] backed by pdfium's text layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, path: &Path, bytes: Vec<u8>) -> Result<String, PipelineError> {
        check_pdf_magic(path, &bytes)?;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || extract_text_blocking(&path, &bytes))
            .await
            .map_err(|e| PipelineError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(path: &Path, bytes: &[u8]) -> Result<String, PipelineError> {
    let pdfium = engine::bind()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| PipelineError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let mut texts = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| PipelineError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        texts.push(text.all());
    }

    let text = texts.join("\n\n");
    info!(
        "Extracted {} chars from {} pages of {}",
        text.len(),
        texts.len(),
        path.display()
    );
    Ok(text)
}

/// Reject inputs that do not start with the `%PDF` magic bytes.
pub fn check_pdf_magic(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(PipelineError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("missing %PDF header, first bytes: {:?}", magic),
        });
    }
    Ok(())
}

/// Resolve a job's `file_path` to a file inside `uploads_dir`.
///
/// Only the final path component is kept, so `../../etc/passwd` resolves to
/// `<uploads_dir>/passwd`.
pub fn resolve_source(uploads_dir: &Path, file_path: &str) -> Result<PathBuf, PipelineError> {
    let name = Path::new(file_path)
        .file_name()
        .ok_or_else(|| PipelineError::SourceUnreadable {
            path: PathBuf::from(file_path),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "source path has no file name",
            ),
        })?;
    let resolved = uploads_dir.join(name);
    debug!("Resolved source {} → {}", file_path, resolved.display());
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn source_is_resolved_by_file_name() {
        let p = resolve_source(Path::new("/srv/uploads"), "uploads/1712-hindu.pdf").unwrap();
        assert_eq!(p, PathBuf::from("/srv/uploads/1712-hindu.pdf"));

        let p = resolve_source(Path::new("/srv/uploads"), "../../etc/passwd").unwrap();
        assert_eq!(p, PathBuf::from("/srv/uploads/passwd"));
    }

    #[test]
    fn source_without_file_name_is_unreadable() {
        let err = resolve_source(Path::new("/srv/uploads"), "..").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }

    #[test]
    fn magic_bytes_are_checked() {
        let path = Path::new("paper.pdf");
        assert!(check_pdf_magic(path, b"%PDF-1.7\n...").is_ok());

        let err = check_pdf_magic(path, b"PK\x03\x04").unwrap_err();
        assert!(matches!(err, PipelineError::CorruptPdf { .. }));

        let err = check_pdf_magic(path, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }

    #[tokio::test]
    async fn non_pdf_bytes_fail_before_binding_pdfium() {
        let err = PdfTextExtractor
            .extract_text(Path::new("notes.txt"), b"hello world".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::CorruptPdf { .. }));
    }
}
