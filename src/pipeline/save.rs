//! File organizer: copy a certificate into its company folder.
//!
//! Names follow `<stem>_<YYYYmmdd_HHMMSS_mmm>.pdf`; on collision a counter is
//! appended (`_1`, `_2`, …). Each candidate is opened with `create_new`, so
//! a name is claimed atomically and an existing file is never overwritten.

use crate::error::FileError;
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Upper bound on collision probing for one timestamp.
const MAX_CANDIDATES: u32 = 10_000;

/// Where a certificate landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCertificate {
    pub path: PathBuf,
    pub duration_ms: u64,
}

/// Write `bytes` into `root/company/` under a fresh name derived from
/// `original_name`.
pub async fn save_certificate(
    root: &Path,
    company: &str,
    original_name: &str,
    bytes: &[u8],
) -> Result<SavedCertificate, FileError> {
    let start = Instant::now();
    let folder = root.join(company);

    let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let result = write_unique(&folder, &file_stem(original_name), &timestamp, bytes).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(path) => {
            info!("Certificate saved: {} (took {}ms)", path.display(), duration_ms);
            Ok(SavedCertificate { path, duration_ms })
        }
        Err(e) => {
            error!("Error saving certificate: {} (took {}ms)", e, duration_ms);
            Err(e)
        }
    }
}

async fn write_unique(
    folder: &Path,
    stem: &str,
    timestamp: &str,
    bytes: &[u8],
) -> Result<PathBuf, FileError> {
    let save_failed = |path: &Path, e: std::io::Error| FileError::SaveFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    tokio::fs::create_dir_all(folder)
        .await
        .map_err(|e| save_failed(folder, e))?;

    for counter in 0..MAX_CANDIDATES {
        let path = folder.join(candidate_name(stem, timestamp, counter));
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;

        let mut file = match opened {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(save_failed(&path, e)),
        };

        file.write_all(bytes).await.map_err(|e| save_failed(&path, e))?;
        file.flush().await.map_err(|e| save_failed(&path, e))?;
        return Ok(path);
    }

    Err(FileError::SaveFailed {
        path: folder.to_path_buf(),
        detail: format!("no free file name for '{stem}' after {MAX_CANDIDATES} attempts"),
    })
}

/// `counter == 0` is the plain timestamped name.
fn candidate_name(stem: &str, timestamp: &str, counter: u32) -> String {
    if counter == 0 {
        format!("{stem}_{timestamp}.pdf")
    } else {
        format!("{stem}_{timestamp}_{counter}.pdf")
    }
}

/// Original name without directories or extension.
fn file_stem(original_name: &str) -> String {
    Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "certificate".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_names() {
        assert_eq!(candidate_name("cert", "20240101_120000_123", 0), "cert_20240101_120000_123.pdf");
        assert_eq!(candidate_name("cert", "20240101_120000_123", 2), "cert_20240101_120000_123_2.pdf");
    }

    #[test]
    fn stem_drops_directories_and_extension() {
        assert_eq!(file_stem("aws-cloud.pdf"), "aws-cloud");
        assert_eq!(file_stem("nested/dir/cert.v2.pdf"), "cert.v2");
        assert_eq!(file_stem(""), "certificate");
    }

    #[tokio::test]
    async fn saves_bytes_verbatim_into_company_folder() {
        let root = tempfile::tempdir().unwrap();
        let saved = save_certificate(root.path(), "Coursera", "ml.pdf", b"%PDF-1.4 body")
            .await
            .unwrap();

        assert_eq!(saved.path.parent().unwrap(), root.path().join("Coursera"));
        let name = saved.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ml_") && name.ends_with(".pdf"), "got: {name}");
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn same_name_twice_gives_two_paths() {
        let root = tempfile::tempdir().unwrap();
        let a = save_certificate(root.path(), "Udemy", "cert.pdf", b"first").await.unwrap();
        let b = save_certificate(root.path(), "Udemy", "cert.pdf", b"second").await.unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(std::fs::read(&a.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(root.path().join("Udemy")).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn skips_past_existing_names() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("edX");
        std::fs::create_dir_all(&folder).unwrap();

        let ts = "20240101_000000_000";
        std::fs::write(folder.join(candidate_name("c", ts, 0)), b"x").unwrap();
        std::fs::write(folder.join(candidate_name("c", ts, 1)), b"x").unwrap();

        let path = write_unique(&folder, "c", ts, b"new").await.unwrap();
        assert_eq!(path, folder.join("c_20240101_000000_000_2.pdf"));
        assert_eq!(std::fs::read(folder.join(candidate_name("c", ts, 0))).unwrap(), b"x");
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn unwritable_root_is_a_save_error() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file-not-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = save_certificate(&blocker, "Acme", "a.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, FileError::SaveFailed { .. }), "got: {err}");
    }
}
