//! Input resolution: turn a path or URL into an in-memory [`UploadedFile`].
//!
//! Certificates are small and are written back verbatim, so the whole file
//! is held in memory. The bytes sit behind an `Arc<[u8]>` so the rasterizer
//! can move them onto a blocking thread without a copy. The size ceiling is
//! checked before the bytes are read, so an oversized input is never held.

use crate::error::CertSortError;
use crate::pipeline::validate::check_size;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const PDF_MIME: &str = "application/pdf";
const FALLBACK_MIME: &str = "application/octet-stream";

/// An uploaded certificate: raw bytes plus what the uploader told us about them.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name, without directories.
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    /// Wrap bytes received from elsewhere; the size is taken from the bytes.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// MIME type guessed from the leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        PDF_MIME
    } else {
        FALLBACK_MIME
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download a URL.
///
/// Anything larger than `max_bytes` fails with [`CertSortError::Rejected`]
/// before its contents are read.
pub async fn load_input(
    input: &str,
    timeout_secs: u64,
    max_bytes: u64,
) -> Result<UploadedFile, CertSortError> {
    if is_url(input) {
        download_url(input, timeout_secs, max_bytes).await
    } else if input.trim().is_empty() {
        Err(CertSortError::InvalidInput {
            input: input.to_string(),
        })
    } else {
        load_local(Path::new(input), max_bytes).await
    }
}

/// Expand directory arguments into the `.pdf` files they contain.
///
/// Files inside a directory are sorted by name; other arguments keep their
/// position. Non-PDF files inside directories are skipped, but an explicitly
/// named non-PDF file is passed through so the validator can report it.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<String>, CertSortError> {
    let mut out = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = Path::new(input);
        if is_url(input) || !path.is_dir() {
            out.push(input.clone());
            continue;
        }

        let entries = std::fs::read_dir(path).map_err(|e| io_error(path, e))?;
        let mut pdfs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry_path = entry.map_err(|e| io_error(path, e))?.path();
            if entry_path.is_file() && has_pdf_extension(&entry_path) {
                pdfs.push(entry_path);
            }
        }
        pdfs.sort();
        debug!("{} → {} PDF files", path.display(), pdfs.len());
        out.extend(pdfs.into_iter().map(|p| p.to_string_lossy().into_owned()));
    }
    Ok(out)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn io_error(path: &Path, source: std::io::Error) -> CertSortError {
    match source.kind() {
        std::io::ErrorKind::NotFound => CertSortError::InputNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => CertSortError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => CertSortError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

async fn load_local(path: &Path, max_bytes: u64) -> Result<UploadedFile, CertSortError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CertSortError::InvalidInput {
            input: path.display().to_string(),
        })?;

    let meta = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
    check_size(meta.len(), max_bytes).map_err(CertSortError::Rejected)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;

    let mime = sniff_mime(&bytes);
    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime);
    Ok(UploadedFile::new(name, mime, bytes))
}

async fn download_url(
    url: &str,
    timeout_secs: u64,
    max_bytes: u64,
) -> Result<UploadedFile, CertSortError> {
    info!("Downloading certificate from: {}", url);

    let failed = |reason: String| CertSortError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            CertSortError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(media_type);
    let name = filename_from_url(url);

    let declared = response.content_length();
    if let Some(len) = declared {
        check_size(len, max_bytes).map_err(CertSortError::Rejected)?;
    }

    // Content-Length can be absent or wrong; count what actually arrives.
    let mut bytes = Vec::with_capacity(declared.unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        let received = (bytes.len() + chunk.len()) as u64;
        check_size(received, max_bytes).map_err(CertSortError::Rejected)?;
        bytes.extend_from_slice(&chunk);
    }
    let mime = header_mime.unwrap_or_else(|| sniff_mime(&bytes).to_string());

    info!("Downloaded {} ({} bytes, {})", name, bytes.len(), mime);
    Ok(UploadedFile::new(name, mime, bytes))
}

/// `application/pdf; charset=binary` → `application/pdf`.
fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Last non-empty URL path segment, or `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FILE_SIZE_BYTES;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Answer a single HTTP request with `response`, verbatim.
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/certs/cert.pdf")
    }

    const CHUNKED_32: &[u8] = b"HTTP/1.1 200 OK\r\n\
Content-Type: application/pdf\r\n\
Transfer-Encoding: chunked\r\n\
Connection: close\r\n\r\n\
10\r\n%PDF-1.4 0123456\r\n\
10\r\n7890abcdef012345\r\n\
0\r\n\r\n";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cert.pdf"));
        assert!(is_url("http://example.com/cert.pdf"));
        assert!(!is_url("/tmp/cert.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniff_detects_pdf_magic() {
        assert_eq!(sniff_mime(b"%PDF-1.7\n..."), PDF_MIME);
        assert_eq!(sniff_mime(b"PK\x03\x04"), "application/octet-stream");
        assert_eq!(sniff_mime(b""), "application/octet-stream");
    }

    #[test]
    fn media_type_strips_parameters() {
        assert_eq!(media_type("Application/PDF; charset=binary"), "application/pdf");
        assert_eq!(media_type("text/html"), "text/html");
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://x.org/certs/aws.pdf"), "aws.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "downloaded.pdf");
        assert_eq!(filename_from_url("https://x.org/files/12345"), "12345");
    }

    #[test]
    fn uploaded_file_size_matches_bytes() {
        let f = UploadedFile::new("a.pdf", PDF_MIME, b"%PDF-1.4".to_vec());
        assert_eq!(f.size, 8);
    }

    #[tokio::test]
    async fn load_local_reads_and_sniffs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();

        let upload = load_input(path.to_str().unwrap(), 5, DEFAULT_MAX_FILE_SIZE_BYTES)
            .await
            .unwrap();
        assert_eq!(upload.name, "cert.pdf");
        assert_eq!(upload.mime_type, PDF_MIME);
        assert_eq!(&upload.bytes[..], b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn load_missing_file_is_not_found() {
        let err = load_input("/definitely/not/here.pdf", 5, DEFAULT_MAX_FILE_SIZE_BYTES)
            .await
            .unwrap_err();
        assert!(matches!(err, CertSortError::InputNotFound { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn oversized_local_file_is_rejected_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        // Sparse: 300 MiB on paper, nothing on disk.
        std::fs::File::create(&path)
            .unwrap()
            .set_len(300 * 1024 * 1024)
            .unwrap();

        let err = load_input(path.to_str().unwrap(), 5, DEFAULT_MAX_FILE_SIZE_BYTES)
            .await
            .unwrap_err();
        match err {
            CertSortError::Rejected(e) => {
                let msg = e.to_string();
                assert!(msg.contains("File size (300.0MB)"), "got: {msg}");
                assert!(msg.contains("(200MB)"), "got: {msg}");
            }
            other => panic!("expected a size rejection, got: {other}"),
        }
    }

    #[tokio::test]
    async fn local_file_at_the_limit_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let upload = load_input(path.to_str().unwrap(), 5, 8).await.unwrap();
        assert_eq!(upload.size, 8);

        let err = load_input(path.to_str().unwrap(), 5, 7).await.unwrap_err();
        assert!(matches!(err, CertSortError::Rejected(_)), "got: {err}");
    }

    #[tokio::test]
    async fn url_over_declared_length_is_rejected() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\n\
Content-Type: application/pdf\r\n\
Content-Length: 64\r\n\
Connection: close\r\n\r\n\
%PDF-1.4 0123456789012345678901234567890123456789012345678901234",
        )
        .await;

        let err = load_input(&url, 5, 16).await.unwrap_err();
        assert!(matches!(err, CertSortError::Rejected(_)), "got: {err}");
    }

    #[tokio::test]
    async fn chunked_url_body_is_capped_while_reading() {
        let url = serve_once(CHUNKED_32).await;
        let err = load_input(&url, 5, 20).await.unwrap_err();
        assert!(matches!(err, CertSortError::Rejected(_)), "got: {err}");
    }

    #[tokio::test]
    async fn chunked_url_within_limit_downloads() {
        let url = serve_once(CHUNKED_32).await;
        let upload = load_input(&url, 5, 32).await.unwrap();

        assert_eq!(upload.name, "cert.pdf");
        assert_eq!(upload.mime_type, PDF_MIME);
        assert_eq!(&upload.bytes[..], b"%PDF-1.4 01234567890abcdef012345");
    }

    #[test]
    fn expand_inputs_lists_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let single = dir.path().join("notes.txt").to_string_lossy().into_owned();
        let inputs = vec![dir.path().to_string_lossy().into_owned(), single.clone()];

        let expanded = expand_inputs(&inputs).unwrap();
        assert_eq!(expanded.len(), 3);
        assert!(expanded[0].ends_with("a.PDF"));
        assert!(expanded[1].ends_with("b.pdf"));
        assert_eq!(expanded[2], single);
    }
}
