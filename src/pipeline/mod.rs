//! Pipeline stages for sorting one certificate.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped (the rasterizer and the vision service sit behind traits).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ render ──▶ encode ──▶ extract ──▶ clean ──▶ save
//! (path/URL)  (size,MIME)  (pdfium)  (JPEG,b64)  (VLM)     (label)   (folder)
//! ```
//!
//! 1. [`input`]   : read a local file or download a URL into an `UploadedFile`
//! 2. [`validate`]: reject missing uploads, oversized files, non-PDF types
//! 3. [`render`]  : rasterise page 1 in `spawn_blocking` (pdfium is blocking)
//! 4. [`encode`]  : JPEG-encode and base64-wrap the page image
//! 5. [`extract`] : ask the VLM for the issuer, with fixed-delay retries
//! 6. [`clean`]   : turn the reply into a filesystem-safe folder label
//! 7. [`save`]    : copy the PDF bytes into the company folder under a free name

pub mod clean;
pub mod encode;
pub mod extract;
pub mod input;
pub mod render;
pub mod save;
pub mod validate;
