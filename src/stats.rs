//! Processing statistics across batches.
//!
//! [`ProcessingStats`] is owned by the caller and passed `&mut` into each
//! batch. Counters reset when a batch begins; the timing history of saved
//! certificates accumulates until [`ProcessingStats::reset`].

use crate::report::{FileReport, StageTimings};
use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Extraction averages above this produce a hint.
const SLOW_EXTRACTION_MS: f64 = 3000.0;
/// Render averages above this produce a hint.
const SLOW_RENDER_MS: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Render,
    Extraction,
    Save,
    Total,
}

impl Stage {
    /// Stages that do work; `Total` is their sum.
    pub const WORK: [Stage; 3] = [Stage::Render, Stage::Extraction, Stage::Save];

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Render => "PDF Processing",
            Stage::Extraction => "AI Extraction",
            Stage::Save => "File Saving",
            Stage::Total => "Total",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Timing record for one saved certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTiming {
    pub file_name: String,
    pub company: String,
    pub render_ms: u64,
    pub extraction_ms: u64,
    pub save_ms: u64,
    pub total_ms: u64,
    /// Local wall-clock time, `HH:MM:SS`.
    pub recorded_at: String,
}

impl FileTiming {
    fn new(report: &FileReport, timings: &StageTimings) -> Self {
        Self {
            file_name: report.file_name.clone(),
            company: report.company.clone(),
            render_ms: timings.render_ms,
            extraction_ms: timings.extraction_ms,
            save_ms: timings.save_ms.unwrap_or(0),
            total_ms: timings.total_ms,
            recorded_at: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    fn stage_ms(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Render => self.render_ms,
            Stage::Extraction => self.extraction_ms,
            Stage::Save => self.save_ms,
            Stage::Total => self.total_ms,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip)]
    started_at: Option<Instant>,
    pub timings: Vec<FileTiming>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting a batch of `total` files. Timing history is kept.
    pub fn begin_batch(&mut self, total: usize) {
        self.total = total;
        self.successful = 0;
        self.failed = 0;
        self.started_at = Some(Instant::now());
    }

    pub fn record(&mut self, report: &FileReport) {
        match (report.is_success(), &report.timings) {
            (true, Some(timings)) => {
                self.successful += 1;
                self.timings.push(FileTiming::new(report, timings));
            }
            (true, None) => self.successful += 1,
            (false, _) => self.failed += 1,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Percentage of the current batch that was saved.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64 * 100.0
        }
    }

    /// Time since the current batch began.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    pub fn average_ms(&self, stage: Stage) -> Option<f64> {
        if self.timings.is_empty() {
            return None;
        }
        let sum: u64 = self.timings.iter().map(|t| t.stage_ms(stage)).sum();
        Some(sum as f64 / self.timings.len() as f64)
    }

    pub fn slowest_stage(&self) -> Option<(Stage, f64)> {
        self.work_averages()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn fastest_stage(&self) -> Option<(Stage, f64)> {
        self.work_averages()
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    fn work_averages(&self) -> impl Iterator<Item = (Stage, f64)> + '_ {
        Stage::WORK
            .into_iter()
            .filter_map(|stage| self.average_ms(stage).map(|avg| (stage, avg)))
    }

    /// Advisory lines for slow stages.
    pub fn hints(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if self.average_ms(Stage::Extraction).is_some_and(|ms| ms > SLOW_EXTRACTION_MS) {
            hints.push(
                "AI extraction is slow; consider a faster model or check your network".to_string(),
            );
        }
        if self.average_ms(Stage::Render).is_some_and(|ms| ms > SLOW_RENDER_MS) {
            hints.push(
                "PDF rendering is slow; consider a lower --dpi for large documents".to_string(),
            );
        }
        hints
    }
}
