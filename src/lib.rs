//! # certsort
//!
//! Sort PDF certificates into per-company folders using a Vision Language
//! Model (VLM).
//!
//! Certificates from course platforms, vendors and training bodies rarely
//! carry the issuer in their file name. This crate renders the first page
//! of each PDF, asks a VLM who issued it, cleans the answer into a safe
//! folder name and copies the file to `certificates/<Company>/`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     local file, directory or URL → in-memory upload
//!  ├─ 2. Validate  present, ≤ 200 MiB, application/pdf
//!  ├─ 3. Render    page 1 via pdfium at 150 DPI (spawn_blocking)
//!  ├─ 4. Encode    JPEG q85 → base64 ImageData
//!  ├─ 5. Extract   VLM call, up to 3 attempts with a fixed 1 s delay
//!  ├─ 6. Clean     strip article/suffix, replace illegal chars, ≤ 50 chars
//!  └─ 7. Save      certificates/<Company>/<stem>_<timestamp>.pdf
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certsort::{CertificateOrganizer, OrganizerConfig, ProcessingStats};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY for the default provider.
//!     let config = OrganizerConfig::default();
//!     config.check_api_key()?;
//!
//!     let organizer = CertificateOrganizer::from_config(config)?;
//!     let mut stats = ProcessingStats::new();
//!     let batch = organizer
//!         .process_inputs(&["downloads/".to_string()], &mut stats)
//!         .await;
//!
//!     for group in batch.by_company() {
//!         println!("{}: {} file(s)", group.company, group.files.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `certsort` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! certsort = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod library;
pub mod organizer;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod stats;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OrganizerConfig, OrganizerConfigBuilder, DEFAULT_MODEL, DEFAULT_PROVIDER};
pub use error::{CertSortError, FileError};
pub use library::{scan_library, CertificateEntry, CompanyFolder, LibrarySummary};
pub use organizer::CertificateOrganizer;
pub use pipeline::clean::{clean_company_name, UNKNOWN_COMPANY};
pub use pipeline::extract::{ExtractionOutcome, LlmVisionService, ServiceError, VisionService};
pub use pipeline::input::UploadedFile;
pub use pipeline::render::{PdfiumRasterizer, Rasterizer, RenderedPage};
pub use pipeline::validate::validate_file;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{BatchOutcome, BatchReport, FileReport, FileStatus, StageTimings};
pub use stats::{ProcessingStats, Stage};
