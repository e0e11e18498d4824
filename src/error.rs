//! Error types for the certsort library.
//!
//! Two error types reflect two failure scopes:
//!
//! * [`CertSortError`]: the operation cannot proceed at all (no API key,
//!   provider not configured, input unreadable, bad configuration).
//!
//! * [`FileError`]: a single certificate failed (rejected upload, render
//!   glitch, disk write error). It ends up in the
//!   [`crate::report::FileReport`] for that file and the batch moves on.
//!
//! Extraction problems are neither: the name extractor degrades them to an
//! `Unknown` or `Failed` outcome (see [`crate::pipeline::extract`]).

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the certsort library.
#[derive(Debug, Error)]
pub enum CertSortError {
    // ── Input errors ──────────────────────────────────────────────────────
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// Turned away before its bytes were read, e.g. over the size ceiling.
    #[error(transparent)]
    Rejected(FileError),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Model provider errors ─────────────────────────────────────────────
    /// The provider's API key variable is unset or empty.
    #[error("API key not found. Set {var} in the environment before sorting certificates.")]
    MissingApiKey { var: String },

    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    #[error(
        "Failed to load the PDFium engine: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    PdfiumBindingFailed(String),

}

/// A non-fatal error for a single certificate.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The upload was rejected by the validator.
    #[error("{reason}")]
    Invalid { reason: String },

    #[error("No pages found in PDF")]
    NoPages,

    #[error("Error processing PDF: {detail}")]
    RenderFailed { detail: String },

    #[error("Image encoding failed: {detail}")]
    EncodeFailed { detail: String },

    #[error("Failed to save certificate to '{path}': {detail}")]
    SaveFailed { path: PathBuf, detail: String },
}

impl FileError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        FileError::Invalid {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_names_variable() {
        let e = CertSortError::MissingApiKey {
            var: "GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn invalid_file_error_is_the_bare_reason() {
        let e = FileError::invalid("Only PDF files are supported");
        assert_eq!(e.to_string(), "Only PDF files are supported");
    }

    #[test]
    fn save_failed_display() {
        let e = FileError::SaveFailed {
            path: PathBuf::from("certificates/Acme"),
            detail: "read-only file system".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("certificates/Acme"), "got: {msg}");
        assert!(msg.contains("read-only"), "got: {msg}");
    }

    #[test]
    fn rejected_shows_the_validator_message() {
        let reason = "File size (300.0MB) exceeds maximum allowed size (200MB)";
        let e = CertSortError::Rejected(FileError::invalid(reason));
        assert_eq!(e.to_string(), reason);
    }

    #[test]
    fn file_error_serialises() {
        let json = serde_json::to_string(&FileError::NoPages).unwrap();
        assert_eq!(json, "\"NoPages\"");
    }
}
