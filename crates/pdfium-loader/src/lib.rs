//! # pdfium-loader
//!
//! Finds a usable PDFium shared library for `pdfium-render`, downloading the
//! platform build from
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! the first time it is needed.
//!
//! Resolution order, first hit wins:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing file.
//! 2. The per-version cache directory (see [`cache_dir`]).
//! 3. Download the release archive and unpack the library into the cache.
//!
//! ```rust,no_run
//! let pdfium = pdfium_loader::bind().expect("PDFium unavailable");
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag (`chromium/<N>`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Cache directory name under the platform cache root.
const CACHE_APP_DIR: &str = "certsort";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("PDFium has no prebuilt binary for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDFium download failed: {0}")]
    Download(String),

    #[error("PDFium archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// One row of the release asset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Asset {
    os: &'static str,
    arch: &'static str,
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

const ASSETS: &[Asset] = &[
    Asset { os: "macos", arch: "aarch64", archive: "pdfium-mac-arm64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" },
    Asset { os: "macos", arch: "x86_64", archive: "pdfium-mac-x64.tgz", member: "lib/libpdfium.dylib", file_name: "libpdfium.dylib" },
    Asset { os: "linux", arch: "x86_64", archive: "pdfium-linux-x64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" },
    Asset { os: "linux", arch: "aarch64", archive: "pdfium-linux-arm64.tgz", member: "lib/libpdfium.so", file_name: "libpdfium.so" },
    Asset { os: "windows", arch: "x86_64", archive: "pdfium-win-x64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
    Asset { os: "windows", arch: "aarch64", archive: "pdfium-win-arm64.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
    Asset { os: "windows", arch: "x86", archive: "pdfium-win-x86.tgz", member: "bin/pdfium.dll", file_name: "pdfium.dll" },
];

fn asset_for(os: &str, arch: &str) -> Result<Asset, LoaderError> {
    ASSETS
        .iter()
        .copied()
        .find(|a| a.os == os && a.arch == arch)
        .ok_or_else(|| LoaderError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_asset() -> Result<Asset, LoaderError> {
    asset_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Per-version directory holding the downloaded library.
///
/// `PDFIUM_CACHE_DIR` replaces the platform cache root
/// (`~/.cache` on Linux, `~/Library/Caches` on macOS, `%LOCALAPPDATA%` on Windows).
pub fn cache_dir() -> PathBuf {
    let root = std::env::var_os("PDFIUM_CACHE_DIR")
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join(CACHE_APP_DIR)))
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache").join(CACHE_APP_DIR)))
        .unwrap_or_else(|| std::env::temp_dir().join(CACHE_APP_DIR));
    root.join(format!("pdfium-{PDFIUM_VERSION}"))
}

fn env_override() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH")
        .map(PathBuf::from)
        .filter(|p| p.exists())
}

/// Path of an already available library, without touching the network.
pub fn find_library() -> Option<PathBuf> {
    env_override().or_else(|| {
        let asset = current_asset().ok()?;
        let path = cache_dir().join(asset.file_name);
        path.exists().then_some(path)
    })
}

static LIBRARY_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Return the library path, downloading it on first use.
///
/// `on_progress` receives `(bytes_so_far, content_length)`.
pub fn ensure_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, LoaderError> {
    if let Some(path) = LIBRARY_PATH.get() {
        return Ok(path.clone());
    }
    let path = match find_library() {
        Some(path) => path,
        None => download_library(on_progress)?,
    };
    let _ = LIBRARY_PATH.set(path.clone());
    Ok(path)
}

/// Bind pdfium, downloading it silently when it is not cached yet.
pub fn bind() -> Result<Pdfium, LoaderError> {
    let path = ensure_library(None)?;
    bind_path(&path)
}

/// Bind a library at an explicit path.
pub fn bind_path(path: &Path) -> Result<Pdfium, LoaderError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| LoaderError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn download_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, LoaderError> {
    let asset = current_asset()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| LoaderError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let url = format!("{RELEASE_URL}/chromium%2F{PDFIUM_VERSION}/{}", asset.archive);
    let archive = fetch(&url, on_progress)?;

    let dest = dir.join(asset.file_name);
    unpack_member(&archive, asset.member, &dest)?;
    Ok(dest)
}

fn fetch(url: &str, on_progress: Option<&dyn Fn(u64, Option<u64>)>) -> Result<Vec<u8>, LoaderError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-loader/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LoaderError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| LoaderError::Download(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(LoaderError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(32 << 20) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(LoaderError::Download(format!("read error: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(cb) = on_progress {
            cb(body.len() as u64, total);
        }
    }
    Ok(body)
}

/// Unpack a single `member` of a `.tgz` archive into `dest`.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), LoaderError> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| LoaderError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| LoaderError::Extract(e.to_string()))?;
        let is_member = entry
            .path()
            .map(|p| p.to_string_lossy().trim_start_matches("./") == member)
            .map_err(|e| LoaderError::Extract(e.to_string()))?;
        if is_member {
            entry
                .unpack(dest)
                .map_err(|e| LoaderError::Extract(format!("unpack {member}: {e}")))?;
            return Ok(());
        }
    }

    Err(LoaderError::Extract(format!("'{member}' not found in archive")))
}
