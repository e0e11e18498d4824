//! Library view: what is already sorted under the certificates root.

use crate::error::CertSortError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Local>>,
}

/// One company folder and the certificates inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyFolder {
    pub name: String,
    pub certificates: Vec<CertificateEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibrarySummary {
    pub companies: usize,
    pub certificates: usize,
}

impl LibrarySummary {
    pub fn of(folders: &[CompanyFolder]) -> Self {
        Self {
            companies: folders.len(),
            certificates: folders.iter().map(|f| f.certificates.len()).sum(),
        }
    }
}

/// List company folders under `root`, sorted by name, each with its PDFs
/// sorted by name. A missing root is an empty library.
pub async fn scan_library(root: &Path) -> Result<Vec<CompanyFolder>, CertSortError> {
    let io = |path: &Path, source: std::io::Error| CertSortError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io(root, e)),
    };

    let mut folders = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io(root, e))? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        folders.push(CompanyFolder {
            name: entry.file_name().to_string_lossy().into_owned(),
            certificates: scan_folder(&path).await.map_err(|e| io(&path, e))?,
        });
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

async fn scan_folder(folder: &Path) -> std::io::Result<Vec<CertificateEntry>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut certificates = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        certificates.push(CertificateEntry {
            file_name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Local>::from),
        });
    }

    certificates.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(certificates)
}

/// Byte count as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}
