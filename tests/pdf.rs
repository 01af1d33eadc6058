//! pdfium round trips: render a brief, read it back, write it to disk.
//!
//! These tests need the pdfium shared library. They skip (and pass) when it
//! cannot be bound.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium cargo test --test pdf -- --nocapture

use edgequake_newsbrief::pipeline::persist::artifact_heading;
use edgequake_newsbrief::pipeline::render::artifact_path;
use edgequake_newsbrief::{
    engine, ArtifactRenderer, FileStore, LocalFileStore, PdfArtifactRenderer, PdfTextExtractor,
    PipelineError, TextExtractor,
};
use std::path::Path;

/// Skip this test if pdfium cannot be bound.
macro_rules! skip_unless_pdfium {
    () => {{
        if !engine::is_available() {
            println!("SKIP: pdfium not found; set PDFIUM_LIB_PATH to run pdf tests");
            return;
        }
    }};
}

#[tokio::test]
async fn rendered_brief_reads_back_as_text() {
    skip_unless_pdfium!();

    let heading = artifact_heading("Economy", "2024-03-01");
    let rendered = PdfArtifactRenderer
        .render(&heading, "- RBI holds repo rate\n- CPI eases to 5.1")
        .await
        .unwrap();
    assert!(rendered.bytes.starts_with(b"%PDF"));
    assert_eq!(rendered.page_count, 1);

    let text = PdfTextExtractor
        .extract_text(Path::new("economy.pdf"), rendered.bytes)
        .await
        .unwrap();
    assert!(text.contains("Economy - 2024-03-01"), "got: {text:?}");
    assert!(text.contains("RBI holds repo rate"), "got: {text:?}");
}

#[tokio::test]
async fn long_brief_spans_pages() {
    skip_unless_pdfium!();

    let body = (1..=150)
        .map(|i| format!("- point {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let rendered = PdfArtifactRenderer.render("History - 2024-03-01", &body).await.unwrap();
    assert!(rendered.page_count >= 3);
}

#[tokio::test]
async fn extraction_is_idempotent() {
    skip_unless_pdfium!();

    let rendered = PdfArtifactRenderer
        .render("Geography - 2024-03-01", "- monsoon onset over Kerala")
        .await
        .unwrap();
    let path = Path::new("geo.pdf");
    let first = PdfTextExtractor
        .extract_text(path, rendered.bytes.clone())
        .await
        .unwrap();
    let second = PdfTextExtractor.extract_text(path, rendered.bytes).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn truncated_pdf_is_corrupt() {
    skip_unless_pdfium!();

    let err = PdfTextExtractor
        .extract_text(Path::new("broken.pdf"), b"%PDF-1.7\n%%garbage".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::CorruptPdf { .. }));
}

#[tokio::test]
async fn distinct_subjects_get_distinct_files_and_same_subject_overwrites() {
    skip_unless_pdfium!();

    let dir = tempfile::tempdir().unwrap();
    let store = LocalFileStore;

    let economy = artifact_path(dir.path(), "2024-03-01", "Economy");
    let history = artifact_path(dir.path(), "2024-03-01", "History");
    assert_ne!(economy.absolute, history.absolute);

    for (artifact, subject, body) in [
        (&economy, "Economy", "- first economy brief"),
        (&history, "History", "- history brief"),
        (&economy, "Economy", "- second economy brief"),
    ] {
        let rendered = PdfArtifactRenderer
            .render(&artifact_heading(subject, "2024-03-01"), body)
            .await
            .unwrap();
        store.ensure_dir(artifact.dir()).await.unwrap();
        store.write_file(&artifact.absolute, &rendered.bytes).await.unwrap();
    }

    let bytes = std::fs::read(&economy.absolute).unwrap();
    let text = PdfTextExtractor
        .extract_text(&economy.absolute, bytes)
        .await
        .unwrap();
    assert!(text.contains("second economy brief"));
    assert!(!text.contains("first economy brief"));
    assert!(history.absolute.exists());
}
