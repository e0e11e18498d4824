//! Batch entry points: validate, render, extract and file each certificate.
//!
//! Files are processed one at a time. Nothing a single file does can abort
//! the batch: every failure becomes a [`FileReport`] and the loop moves on.

use crate::config::OrganizerConfig;
use crate::error::CertSortError;
use crate::pipeline::extract::{extract_company_name, LlmVisionService, VisionService};
use crate::pipeline::input::{expand_inputs, load_input, UploadedFile};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::save::save_certificate;
use crate::pipeline::validate::validate_file;
use crate::report::{BatchReport, FileReport, StageTimings};
use crate::stats::ProcessingStats;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// File name shown when no upload was given at all.
const NO_UPLOAD_NAME: &str = "(no file)";

/// Sorts certificates into company folders.
///
/// Generic over the vision service and the rasterizer; [`Self::from_config`]
/// wires up the real ones.
pub struct CertificateOrganizer<V, R> {
    config: OrganizerConfig,
    service: V,
    rasterizer: R,
}

/// One batch entry before it is processed.
enum Pending {
    /// Path or URL still to be read.
    Load(String),
    Ready(UploadedFile),
    /// Could not even be listed.
    Rejected { name: String, reason: String },
}

impl Pending {
    fn display_name(&self) -> String {
        match self {
            Pending::Load(input) => display_name(input),
            Pending::Ready(upload) => upload.name.clone(),
            Pending::Rejected { name, .. } => name.clone(),
        }
    }
}

impl CertificateOrganizer<LlmVisionService, PdfiumRasterizer> {
    /// Build an organizer backed by an `edgequake-llm` provider and pdfium.
    ///
    /// # Errors
    /// [`CertSortError::ProviderNotConfigured`] when the provider cannot be
    /// created (unknown name, missing key).
    pub fn from_config(config: OrganizerConfig) -> Result<Self, CertSortError> {
        let provider = resolve_provider(&config)?;
        let service = LlmVisionService::new(provider, &config);
        let rasterizer = PdfiumRasterizer::new(&config);
        Ok(Self::new(config, service, rasterizer))
    }
}

impl<V, R> CertificateOrganizer<V, R>
where
    V: VisionService,
    R: Rasterizer,
{
    pub fn new(config: OrganizerConfig, service: V, rasterizer: R) -> Self {
        Self {
            config,
            service,
            rasterizer,
        }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Run one upload through the whole pipeline.
    ///
    /// Never fails: rejections, render errors, unidentified issuers and
    /// write errors all come back as a report.
    pub async fn process_file(&self, upload: Option<&UploadedFile>) -> FileReport {
        let name = upload.map_or(NO_UPLOAD_NAME, |u| u.name.as_str());

        let upload = match (validate_file(upload, self.config.max_file_size_bytes), upload) {
            (Ok(()), Some(upload)) => upload,
            (Err(e), _) => {
                warn!("Rejected {}: {}", name, e);
                return FileReport::rejected(name, e.to_string());
            }
            (Ok(()), None) => return FileReport::rejected(name, "No file uploaded"),
        };

        let start = Instant::now();
        info!("Processing {} ({} bytes)", name, upload.size);

        let page = match self.rasterizer.rasterize(Arc::clone(&upload.bytes)).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to render {}: {}", name, e);
                return FileReport::failed(name, &e);
            }
        };

        let extraction = extract_company_name(&self.service, &page.image, name, &self.config).await;
        let mut timings = StageTimings {
            render_ms: page.duration_ms,
            extraction_ms: extraction.duration_ms,
            save_ms: None,
            total_ms: 0,
        };

        let Some(company) = extraction.company() else {
            timings.total_ms = start.elapsed().as_millis() as u64;
            warn!("No company name for {}: {}", name, extraction.label());
            return FileReport::unidentified(name, extraction.label(), Some(timings));
        };

        match save_certificate(&self.config.certificates_dir, company, name, &upload.bytes).await {
            Ok(saved) => {
                timings.save_ms = Some(saved.duration_ms);
                timings.total_ms = start.elapsed().as_millis() as u64;
                debug!("{} timings: {:?}", name, timings);
                FileReport::saved(name, company, saved.path, timings)
            }
            Err(e) => FileReport::failed(name, &e),
        }
    }

    /// Sort files already held in memory.
    pub async fn process_uploads(
        &self,
        uploads: Vec<UploadedFile>,
        stats: &mut ProcessingStats,
    ) -> BatchReport {
        let pending = uploads.into_iter().map(Pending::Ready).collect();
        self.run_batch(pending, stats).await
    }

    /// Sort paths, directories and URLs.
    ///
    /// Directories expand to the PDFs inside them. An input that cannot be
    /// listed or read becomes an error report; the rest still run.
    pub async fn process_inputs(
        &self,
        inputs: &[String],
        stats: &mut ProcessingStats,
    ) -> BatchReport {
        let mut pending = Vec::with_capacity(inputs.len());
        for input in inputs {
            match expand_inputs(std::slice::from_ref(input)) {
                Ok(expanded) => pending.extend(expanded.into_iter().map(Pending::Load)),
                Err(e) => pending.push(Pending::Rejected {
                    name: display_name(input),
                    reason: e.to_string(),
                }),
            }
        }
        self.run_batch(pending, stats).await
    }

    async fn run_batch(&self, pending: Vec<Pending>, stats: &mut ProcessingStats) -> BatchReport {
        let total = pending.len();
        let callback = self.config.progress_callback.as_ref();
        stats.begin_batch(total);
        if let Some(cb) = callback {
            cb.on_batch_start(total);
        }
        info!("Starting batch of {} files", total);

        let mut batch = BatchReport::default();
        for (i, item) in pending.into_iter().enumerate() {
            let index = i + 1;
            let name = item.display_name();
            if let Some(cb) = callback {
                cb.on_file_start(index, total, &name);
            }

            let report = match item {
                Pending::Ready(upload) => self.process_file(Some(&upload)).await,
                Pending::Load(input) => {
                    let loaded = load_input(
                        &input,
                        self.config.download_timeout_secs,
                        self.config.max_file_size_bytes,
                    )
                    .await;
                    match loaded {
                        Ok(upload) => self.process_file(Some(&upload)).await,
                        Err(e) => {
                            warn!("Could not load {}: {}", input, e);
                            FileReport::rejected(name, e.to_string())
                        }
                    }
                }
                Pending::Rejected { name, reason } => FileReport::rejected(name, reason),
            };

            info!(
                "[{}/{}] {} → {:?} ({})",
                index, total, report.file_name, report.status, report.company
            );
            stats.record(&report);
            if let Some(cb) = callback {
                cb.on_file_complete(index, total, &report);
            }
            batch.reports.push(report);
        }

        if let Some(cb) = callback {
            cb.on_batch_complete(total, batch.successful());
        }
        info!(
            "Batch complete: {}/{} certificates sorted",
            batch.successful(),
            total
        );
        batch
    }
}

/// File name part of a path or URL, for reports.
fn display_name(input: &str) -> String {
    let trimmed = input.trim_end_matches('/');
    trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(input)
        .to_string()
}

/// Resolve the model provider, from most to least specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`, default `gemini`) with
///    the configured model or the provider's default, via
///    [`ProviderFactory::create_llm_provider`], which reads the API key from
///    the environment.
fn resolve_provider(config: &OrganizerConfig) -> Result<Arc<dyn LLMProvider>, CertSortError> {
    if let Some(ref provider) = config.provider {
        debug!("Using pre-built provider");
        return Ok(Arc::clone(provider));
    }

    let name = config.effective_provider();
    let model = config.effective_model();
    info!("Using provider '{}' with model '{}'", name, model);
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        CertSortError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}
