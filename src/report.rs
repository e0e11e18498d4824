//! Per-file and per-batch results.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Company column value for files that never reached extraction.
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Saved into a company folder.
    Success,
    /// Processed, but no company name could be extracted; nothing saved.
    Warning,
    /// Rejected or failed before a decision could be made.
    Error,
}

/// Wall-clock time spent in each stage for one file, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub render_ms: u64,
    pub extraction_ms: u64,
    /// `None` when the file was never saved.
    pub save_ms: Option<u64>,
    pub total_ms: u64,
}

/// Outcome of processing a single certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub file_name: String,
    pub status: FileStatus,
    /// Cleaned company label, the extractor's sentinel/error text, or `N/A`.
    pub company: String,
    pub message: String,
    pub timings: Option<StageTimings>,
    pub saved_path: Option<PathBuf>,
}

impl FileReport {
    /// The validator (or input loader) refused the file.
    pub fn rejected(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Error,
            company: NOT_APPLICABLE.to_string(),
            message: reason.into(),
            timings: None,
            saved_path: None,
        }
    }

    /// A pipeline stage failed with a per-file error.
    pub fn failed(file_name: impl Into<String>, error: &FileError) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Error,
            company: NOT_APPLICABLE.to_string(),
            message: format!("Processing error: {error}"),
            timings: None,
            saved_path: None,
        }
    }

    /// Extraction finished without a usable company name.
    pub fn unidentified(
        file_name: impl Into<String>,
        label: impl Into<String>,
        timings: Option<StageTimings>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Warning,
            company: label.into(),
            message: "Could not extract company name reliably".to_string(),
            timings,
            saved_path: None,
        }
    }

    pub fn saved(
        file_name: impl Into<String>,
        company: impl Into<String>,
        path: PathBuf,
        timings: StageTimings,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            status: FileStatus::Success,
            company: company.into(),
            message: format!("Saved to {}", path.display()),
            timings: Some(timings),
            saved_path: Some(path),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// How a finished batch went overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    AllSucceeded,
    Partial,
    NoneSucceeded,
}

/// Reports sharing one company label, in first-seen order.
#[derive(Debug)]
pub struct CompanyGroup<'a> {
    pub company: &'a str,
    pub files: Vec<&'a FileReport>,
}

/// Every report of one batch, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub reports: Vec<FileReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn successful(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    pub fn outcome(&self) -> BatchOutcome {
        match self.successful() {
            n if n == self.total() && n > 0 => BatchOutcome::AllSucceeded,
            0 => BatchOutcome::NoneSucceeded,
            _ => BatchOutcome::Partial,
        }
    }

    /// Group reports by company label.
    pub fn by_company(&self) -> Vec<CompanyGroup<'_>> {
        let mut groups: Vec<CompanyGroup<'_>> = Vec::new();
        for report in &self.reports {
            match groups.iter().position(|g| g.company == report.company) {
                Some(i) => groups[i].files.push(report),
                None => groups.push(CompanyGroup {
                    company: &report.company,
                    files: vec![report],
                }),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timings() -> StageTimings {
        StageTimings {
            render_ms: 10,
            extraction_ms: 20,
            save_ms: Some(1),
            total_ms: 31,
        }
    }

    #[test]
    fn constructors_set_status_and_message() {
        let ok = FileReport::saved("a.pdf", "Google", PathBuf::from("certificates/Google/a.pdf"), timings());
        assert_eq!(ok.status, FileStatus::Success);
        assert!(ok.message.starts_with("Saved to "));

        let warn = FileReport::unidentified("b.pdf", "Unknown_Company", None);
        assert_eq!(warn.status, FileStatus::Warning);
        assert_eq!(warn.company, "Unknown_Company");

        let err = FileReport::failed("c.pdf", &FileError::NoPages);
        assert_eq!(err.status, FileStatus::Error);
        assert_eq!(err.company, NOT_APPLICABLE);
        assert_eq!(err.message, "Processing error: No pages found in PDF");
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let batch = BatchReport {
            reports: vec![
                FileReport::saved("1.pdf", "Udemy", PathBuf::from("x"), timings()),
                FileReport::rejected("2.txt", "Only PDF files are supported"),
                FileReport::saved("3.pdf", "Udemy", PathBuf::from("y"), timings()),
            ],
        };
        let groups = batch.by_company();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].company, "Udemy");
        assert_eq!(groups[0].files.len(), 2);
        assert_eq!(groups[1].company, NOT_APPLICABLE);
    }

    #[test]
    fn outcome_classification() {
        let mut batch = BatchReport::default();
        assert_eq!(batch.outcome(), BatchOutcome::NoneSucceeded);

        batch.reports.push(FileReport::saved("1.pdf", "edX", PathBuf::from("x"), timings()));
        assert_eq!(batch.outcome(), BatchOutcome::AllSucceeded);

        batch.reports.push(FileReport::rejected("2.pdf", "No file uploaded"));
        assert_eq!(batch.outcome(), BatchOutcome::Partial);
        assert_eq!(batch.failed(), 1);
    }
}
