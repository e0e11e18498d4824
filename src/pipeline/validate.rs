//! Upload validation: presence, size ceiling and MIME type.

use crate::error::FileError;
use crate::pipeline::input::{UploadedFile, PDF_MIME};

const MIB: f64 = 1024.0 * 1024.0;

/// Validate an upload before any work is spent on it.
///
/// A file exactly at `max_bytes` is accepted.
pub fn validate_file(upload: Option<&UploadedFile>, max_bytes: u64) -> Result<(), FileError> {
    let Some(file) = upload else {
        return Err(FileError::invalid("No file uploaded"));
    };

    check_size(file.size, max_bytes)?;

    if file.mime_type != PDF_MIME {
        return Err(FileError::invalid("Only PDF files are supported"));
    }

    Ok(())
}

/// Size ceiling on its own, for callers that know the size before the bytes.
pub fn check_size(size: u64, max_bytes: u64) -> Result<(), FileError> {
    if size > max_bytes {
        return Err(FileError::invalid(format!(
            "File size ({:.1}MB) exceeds maximum allowed size ({:.0}MB)",
            size as f64 / MIB,
            max_bytes as f64 / MIB
        )));
    }
    Ok(())
}
