//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::OrganizerConfigBuilder::progress_callback`] to follow a
//! batch as it runs: the CLI drives its progress bar from these events.
//!
//! # Example
//!
//! ```rust
//! use certsort::{BatchProgressCallback, FileReport, OrganizerConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_file_complete(&self, _index: usize, _total: usize, _report: &FileReport) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = OrganizerConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::report::FileReport;
use std::sync::Arc;

/// Called by the organizer as it works through a batch.
///
/// All methods default to no-ops. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is validated.
    fn on_file_start(&self, index: usize, total_files: usize, file_name: &str) {
        let _ = (index, total_files, file_name);
    }

    /// Called when a file has a final report, whatever its status.
    fn on_file_complete(&self, index: usize, total_files: usize, report: &FileReport) {
        let _ = (index, total_files, report);
    }

    /// Called once after every file was attempted.
    fn on_batch_complete(&self, total_files: usize, successful: usize) {
        let _ = (total_files, successful);
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::OrganizerConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
