//! Offline tests of the public organizer API.
//!
//! The vision model and pdfium are replaced by fakes, so these run anywhere.

use certsort::{
    scan_library, BatchOutcome, CertificateOrganizer, FileError, FileStatus, LibrarySummary,
    OrganizerConfig, ProcessingStats, Rasterizer, RenderedPage, ServiceError, Stage,
    UploadedFile, VisionService,
};
use edgequake_llm::ImageData;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// "Renders" the PDF by passing its body through as the image payload, so
/// the fake model can answer per file.
struct PassThrough;

impl Rasterizer for PassThrough {
    fn rasterize(&self, pdf: Arc<[u8]>) -> BoxFuture<'_, Result<RenderedPage, FileError>> {
        Box::pin(async move {
            let body = String::from_utf8_lossy(&pdf).into_owned();
            if body.contains("corrupt") {
                return Err(FileError::RenderFailed {
                    detail: "invalid cross-reference table".into(),
                });
            }
            Ok(RenderedPage {
                image: ImageData::new(body, "image/jpeg"),
                page_count: 1,
                duration_ms: 2,
            })
        })
    }
}

/// Answers by looking up the "image" text; unknown bodies are a service error.
struct Lookup {
    answers: HashMap<&'static str, &'static str>,
    calls: AtomicU32,
}

impl Lookup {
    fn new(pairs: &[(&'static str, &'static str)]) -> Self {
        Self {
            answers: pairs.iter().copied().collect(),
            calls: AtomicU32::new(0),
        }
    }
}

impl VisionService for Lookup {
    fn describe<'a>(
        &'a self,
        _prompt: &'a str,
        image: &'a ImageData,
    ) -> BoxFuture<'a, Result<String, ServiceError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .answers
            .get(image.data.as_str())
            .map(|a| a.to_string())
            .ok_or_else(|| ServiceError("503 Service Unavailable".into()));
        Box::pin(async move { answer })
    }
}

fn config(root: &std::path::Path) -> OrganizerConfig {
    OrganizerConfig::builder()
        .certificates_dir(root)
        .retry_delay_ms(0)
        .build()
        .unwrap()
}

fn pdf(name: &str, body: &str) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", body.as_bytes())
}

#[tokio::test]
async fn mixed_batch_is_sorted_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let service = Lookup::new(&[
        ("%PDF aws", "Amazon Web Services"),
        ("%PDF gcp", "Google LLC"),
        ("%PDF gcp2", "\"Google LLC\""),
        ("%PDF blank", ""),
    ]);
    let organizer = CertificateOrganizer::new(config(dir.path()), service, PassThrough);

    let uploads = vec![
        pdf("aws.pdf", "%PDF aws"),
        pdf("gcp.pdf", "%PDF gcp"),
        pdf("broken.pdf", "%PDF corrupt"),
        pdf("blank.pdf", "%PDF blank"),
        UploadedFile::new("photo.png", "image/png", &b"\x89PNG"[..]),
        pdf("gcp.pdf", "%PDF gcp2"),
        pdf("down.pdf", "%PDF unknown"),
    ];

    let mut stats = ProcessingStats::new();
    let batch = organizer.process_uploads(uploads, &mut stats).await;

    let statuses: Vec<FileStatus> = batch.reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            FileStatus::Success,
            FileStatus::Success,
            FileStatus::Error,
            FileStatus::Warning,
            FileStatus::Error,
            FileStatus::Success,
            FileStatus::Warning,
        ]
    );
    assert_eq!(batch.outcome(), BatchOutcome::Partial);
    assert_eq!(stats.total, 7);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 4);

    // Two certificates with the same name land side by side.
    let library = scan_library(dir.path()).await.unwrap();
    let names: Vec<&str> = library.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Amazon_Web_Services", "Google"]);
    assert_eq!(library[1].certificates.len(), 2);
    assert_eq!(
        LibrarySummary::of(&library),
        LibrarySummary {
            companies: 2,
            certificates: 3
        }
    );

    let groups = batch.by_company();
    assert_eq!(groups[0].company, "Amazon_Web_Services");
    assert_eq!(groups[1].company, "Google");
    assert_eq!(groups[1].files.len(), 2);
}

#[tokio::test]
async fn service_outage_retries_then_warns() {
    let dir = tempfile::tempdir().unwrap();
    let service = Lookup::new(&[]);
    let organizer = CertificateOrganizer::new(config(dir.path()), service, PassThrough);

    let report = organizer.process_file(Some(&pdf("x.pdf", "%PDF x"))).await;

    assert_eq!(report.status, FileStatus::Warning);
    assert_eq!(report.message, "Could not extract company name reliably");
    assert!(report.company.contains("503 Service Unavailable"));
}

#[tokio::test]
async fn oversized_file_never_reaches_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = OrganizerConfig::builder()
        .certificates_dir(dir.path())
        .max_file_size_bytes(8)
        .retry_delay_ms(0)
        .build()
        .unwrap();
    let service = Lookup::new(&[("%PDF a long body", "Acme")]);
    let organizer = CertificateOrganizer::new(cfg, service, PassThrough);

    let report = organizer
        .process_file(Some(&pdf("big.pdf", "%PDF a long body")))
        .await;

    assert_eq!(report.status, FileStatus::Error);
    assert!(report.message.starts_with("File size"), "got: {}", report.message);
}

#[tokio::test]
async fn stats_history_survives_batches() {
    let dir = tempfile::tempdir().unwrap();
    let service = Lookup::new(&[("%PDF a", "Acme"), ("%PDF b", "Globex")]);
    let organizer = CertificateOrganizer::new(config(dir.path()), service, PassThrough);
    let mut stats = ProcessingStats::new();

    organizer
        .process_uploads(vec![pdf("a.pdf", "%PDF a")], &mut stats)
        .await;
    organizer
        .process_uploads(vec![pdf("b.pdf", "%PDF b"), pdf("c.pdf", "%PDF corrupt")], &mut stats)
        .await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.timings.len(), 2);
    assert_eq!(stats.average_ms(Stage::Render), Some(2.0));
    assert!(stats.slowest_stage().is_some());
}

#[tokio::test]
async fn oversized_path_is_rejected_while_loading() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = tempfile::tempdir().unwrap();
    let huge = inbox.path().join("huge.pdf");
    std::fs::File::create(&huge)
        .unwrap()
        .set_len(300 * 1024 * 1024)
        .unwrap();

    let service = Lookup::new(&[]);
    let organizer = CertificateOrganizer::new(config(dir.path()), service, PassThrough);
    let mut stats = ProcessingStats::new();
    let batch = organizer
        .process_inputs(&[huge.to_string_lossy().into_owned()], &mut stats)
        .await;

    let report = &batch.reports[0];
    assert_eq!(report.file_name, "huge.pdf");
    assert_eq!(report.status, FileStatus::Error);
    assert_eq!(
        report.message,
        "File size (300.0MB) exceeds maximum allowed size (200MB)"
    );
    assert_eq!(stats.failed, 1);
}
