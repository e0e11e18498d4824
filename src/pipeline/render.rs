//! PDF rasterisation: render the first page of a certificate to a JPEG.
//!
//! The issuer name sits on the first page, so only page 1 is rendered.
//! pdfium is a blocking C++ library; the work (render + JPEG encode) runs in
//! `tokio::task::spawn_blocking` so the async executor never stalls.
//!
//! Rendering sits behind the [`Rasterizer`] trait so the rest of the
//! pipeline can run without a native pdfium library.

use crate::config::OrganizerConfig;
use crate::error::{CertSortError, FileError};
use crate::pipeline::encode::encode_page;
use edgequake_llm::ImageData;
use futures::future::BoxFuture;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// First page of a certificate, ready for the vision model.
#[derive(Clone)]
pub struct RenderedPage {
    pub image: ImageData,
    /// Pages in the whole document.
    pub page_count: usize,
    pub duration_ms: u64,
}

/// Turns raw PDF bytes into a first-page image.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: Arc<[u8]>) -> BoxFuture<'_, Result<RenderedPage, FileError>>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    jpeg_quality: u8,
}

impl PdfiumRasterizer {
    pub fn new(config: &OrganizerConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: Arc<[u8]>) -> BoxFuture<'_, Result<RenderedPage, FileError>> {
        let settings = self.clone();
        Box::pin(async move {
            let start = Instant::now();
            let (image, page_count) = tokio::task::spawn_blocking(move || {
                render_first_page_blocking(&pdf, &settings)
            })
            .await
            .map_err(|e| FileError::RenderFailed {
                detail: format!("render task panicked: {e}"),
            })??;

            let duration_ms = start.elapsed().as_millis() as u64;
            info!("Rendered first of {} pages in {}ms", page_count, duration_ms);
            Ok::<_, FileError>(RenderedPage {
                image,
                page_count,
                duration_ms,
            })
        })
    }
}

/// Make sure a pdfium library is available, downloading it on first run.
///
/// Blocking; call it from `spawn_blocking` inside a runtime.
/// `on_progress` receives `(bytes_so_far, content_length)` while downloading.
pub fn ensure_engine(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, CertSortError> {
    let path = pdfium_loader::ensure_library(on_progress)
        .map_err(|e| CertSortError::PdfiumBindingFailed(e.to_string()))?;
    pdfium_loader::bind_path(&path)
        .map_err(|e| CertSortError::PdfiumBindingFailed(e.to_string()))?;
    debug!("pdfium ready at {}", path.display());
    Ok(path)
}

/// Scale factor that maps PDF points (1/72 inch) to `dpi`.
fn scale_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / 72.0
}

fn render_first_page_blocking(
    pdf: &[u8],
    settings: &PdfiumRasterizer,
) -> Result<(ImageData, usize), FileError> {
    let render_failed = |detail: String| FileError::RenderFailed { detail };

    let pdfium = pdfium_loader::bind().map_err(|e| render_failed(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| render_failed(format!("{:?}", e)))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    if page_count == 0 {
        return Err(FileError::NoPages);
    }

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale_for_dpi(settings.dpi))
        .set_maximum_width(settings.max_pixels as i32)
        .set_maximum_height(settings.max_pixels as i32);

    let page = pages
        .get(0)
        .map_err(|e| render_failed(format!("{:?}", e)))?;
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| render_failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!("Rendered page 1 → {}x{} px", image.width(), image.height());

    let data = encode_page(&image, settings.jpeg_quality).map_err(|e| FileError::EncodeFailed {
        detail: e.to_string(),
    })?;
    Ok((data, page_count))
}
