//! Pipeline stages for newspaper-to-brief processing.
//!
//! Each submodule implements exactly one transformation step behind a trait,
//! so the queue can be driven end to end with fakes in tests.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ classify ──▶ render ──▶ persist
//! (pdfium)    (LLM JSON)   (pdfium)   (Repository)
//! ```
//!
//! 1. [`extract`]: read the uploaded PDF's text layer; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`classify`]: one LLM call returning `{subject: brief}`; the only
//!    stage with network I/O
//! 3. [`render`]: lay out and paint one A4 PDF per brief
//! 4. [`persist`]: file the brief under a subject as an Article and
//!    refresh the subject's article count
//!
//! Render and persist run back to back for each brief, so a failure part-way
//! leaves the earlier briefs stored.

pub mod classify;
pub mod extract;
pub mod persist;
pub mod render;
