//! pdfium binding shared by the extractor and the renderer.
//!
//! Resolution order (first match wins):
//!
//! 1. `PDFIUM_LIB_PATH` pointing at the library file itself.
//! 2. `PDFIUM_LIB_PATH` pointing at a directory containing the platform
//!    library (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`).
//! 3. The system library search path.
//!
//! The first successful (or failed) bind is kept for the process lifetime:
//! pdfium initialises global library state, so every caller shares one
//! instance. With the `thread_safe` feature pdfium-render serialises calls
//! behind its own lock.

use crate::error::PipelineError;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone)]
enum LibraryLocation {
    File(PathBuf),
    System,
}

static PDFIUM: OnceLock<Result<Pdfium, String>> = OnceLock::new();

fn resolve_location() -> LibraryLocation {
    if let Ok(raw) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(raw);
        if path.is_file() {
            return LibraryLocation::File(path);
        }
        if path.is_dir() {
            return LibraryLocation::File(Pdfium::pdfium_platform_library_name_at_path(&path));
        }
    }
    LibraryLocation::System
}

fn bind_once() -> Result<Pdfium, String> {
    let location = resolve_location();
    debug!("Binding pdfium from {:?}", location);

    let bindings = match &location {
        LibraryLocation::File(path) => Pdfium::bind_to_library(path)
            .map_err(|e| format!("'{}': {e}", path.display()))?,
        LibraryLocation::System => {
            Pdfium::bind_to_system_library().map_err(|e| format!("system library: {e}"))?
        }
    };
    Ok(Pdfium::new(bindings))
}

/// The shared pdfium instance, binding on first use.
pub fn bind() -> Result<&'static Pdfium, PipelineError> {
    PDFIUM
        .get_or_init(bind_once)
        .as_ref()
        .map_err(|e| PipelineError::PdfiumUnavailable(e.clone()))
}

/// Returns `true` if pdfium can be bound in this process.
///
/// Used by integration tests to skip when the library is not installed.
pub fn is_available() -> bool {
    bind().is_ok()
}
