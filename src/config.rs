//! Configuration for the certificate sorting pipeline.
//!
//! Every knob lives in [`OrganizerConfig`], built via
//! [`OrganizerConfigBuilder`]. Setters clamp out-of-range values; `build()`
//! rejects combinations that cannot work.

use crate::error::CertSortError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Upload size ceiling: 200 MiB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 200 * 1024 * 1024;

/// Root folder for company folders.
pub const DEFAULT_CERTIFICATES_DIR: &str = "certificates";

/// Configuration for [`crate::organizer::CertificateOrganizer`].
///
/// # Example
/// ```rust
/// use certsort::OrganizerConfig;
///
/// let config = OrganizerConfig::builder()
///     .certificates_dir("sorted")
///     .max_attempts(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 5);
/// ```
#[derive(Clone)]
pub struct OrganizerConfig {
    /// Root directory that receives one folder per company. Default: `certificates`.
    pub certificates_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 200 MiB.
    pub max_file_size_bytes: u64,

    /// Rendering DPI for the first page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI keeps issuer logos and headings legible while the JPEG stays
    /// a few hundred kilobytes.
    pub dpi: u32,

    /// Cap on either rendered dimension in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    /// JPEG quality for the page image. Range: 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Model identifier. If None, [`default_model_for`] the provider.
    pub model: Option<String>,

    /// Provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens in the model reply. Default: 256.
    ///
    /// A company name is a handful of tokens; the cap only guards against a
    /// model that starts explaining itself.
    pub max_tokens: usize,

    /// Total extraction attempts per certificate. Minimum 1. Default: 3.
    pub max_attempts: u32,

    /// Fixed delay after a failed service call, in milliseconds. Default: 1000.
    pub retry_delay_ms: u64,

    /// Custom extraction prompt. If None, uses [`crate::prompts::COMPANY_NAME_PROMPT`].
    pub prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-file progress events during a batch.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            certificates_dir: PathBuf::from(DEFAULT_CERTIFICATES_DIR),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            dpi: 150,
            max_rendered_pixels: 2000,
            jpeg_quality: 85,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 256,
            max_attempts: 3,
            retry_delay_ms: 1000,
            prompt: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OrganizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizerConfig")
            .field("certificates_dir", &self.certificates_dir)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("custom_prompt", &self.prompt.is_some())
            .finish()
    }
}

impl OrganizerConfig {
    pub fn builder() -> OrganizerConfigBuilder {
        OrganizerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Provider name after defaulting.
    pub fn effective_provider(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Model name after defaulting for the effective provider.
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| default_model_for(self.effective_provider()))
    }

    /// Environment variable that must hold the API key for the configured
    /// provider, if it needs one.
    ///
    /// Returns `None` for a pre-built provider and for local providers.
    pub fn required_api_key_var(&self) -> Option<&'static str> {
        if self.provider.is_some() {
            return None;
        }
        api_key_var(self.effective_provider())
    }

    /// Fail fast when the provider's API key variable is unset or empty.
    pub fn check_api_key(&self) -> Result<(), CertSortError> {
        match self.required_api_key_var() {
            Some(var) => match std::env::var(var) {
                Ok(v) if !v.trim().is_empty() => Ok(()),
                _ => Err(CertSortError::MissingApiKey {
                    var: var.to_string(),
                }),
            },
            None => Ok(()),
        }
    }
}

/// Vision-capable model used for `provider` when none is configured.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => "gpt-4.1-nano",
        "anthropic" | "claude" => "claude-sonnet-4-20250514",
        "mistral" => "pixtral-12b-2409",
        "ollama" | "lmstudio" => "llava",
        _ => DEFAULT_MODEL,
    }
}

/// API key variable read by each `edgequake-llm` provider.
pub fn api_key_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        _ => None,
    }
}

/// Builder for [`OrganizerConfig`].
#[derive(Debug)]
pub struct OrganizerConfigBuilder {
    config: OrganizerConfig,
}

impl OrganizerConfigBuilder {
    pub fn certificates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.certificates_dir = dir.into();
        self
    }

    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_delay_ms = ms;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OrganizerConfig, CertSortError> {
        let c = &self.config;
        if c.certificates_dir.as_os_str().is_empty() {
            return Err(CertSortError::InvalidConfig(
                "certificates directory must not be empty".into(),
            ));
        }
        if c.max_file_size_bytes == 0 {
            return Err(CertSortError::InvalidConfig(
                "maximum file size must be greater than zero".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(CertSortError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(ref p) = c.prompt {
            if p.trim().is_empty() {
                return Err(CertSortError::InvalidConfig(
                    "custom prompt is empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_behaviour() {
        let c = OrganizerConfig::default();
        assert_eq!(c.max_file_size_bytes, 200 * 1024 * 1024);
        assert_eq!(c.dpi, 150);
        assert_eq!(c.jpeg_quality, 85);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.retry_delay_ms, 1000);
        assert_eq!(c.certificates_dir, PathBuf::from("certificates"));
        assert_eq!(c.effective_provider(), "gemini");
        assert_eq!(c.effective_model(), "gemini-2.0-flash");
    }

    #[test]
    fn model_defaults_per_provider() {
        let c = OrganizerConfig::builder().provider_name("openai").build().unwrap();
        assert_eq!(c.effective_model(), "gpt-4.1-nano");

        let c = OrganizerConfig::builder()
            .provider_name("ollama")
            .model("llava:13b")
            .build()
            .unwrap();
        assert_eq!(c.effective_model(), "llava:13b");
    }

    #[test]
    fn setters_clamp() {
        let c = OrganizerConfig::builder()
            .dpi(10)
            .jpeg_quality(0)
            .max_attempts(0)
            .temperature(5.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.max_attempts, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn max_file_size_mb_converts() {
        let c = OrganizerConfig::builder().max_file_size_mb(5).build().unwrap();
        assert_eq!(c.max_file_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn build_rejects_empty_dir_and_prompt() {
        assert!(OrganizerConfig::builder().certificates_dir("").build().is_err());
        assert!(OrganizerConfig::builder().prompt("   ").build().is_err());
        assert!(OrganizerConfig::builder().max_file_size_bytes(0).build().is_err());
    }

    #[test]
    fn api_key_var_per_provider() {
        assert_eq!(api_key_var("gemini"), Some("GEMINI_API_KEY"));
        assert_eq!(api_key_var("OpenAI"), Some("OPENAI_API_KEY"));
        assert_eq!(api_key_var("ollama"), None);
    }

    #[test]
    fn local_provider_needs_no_key() {
        let c = OrganizerConfig::builder()
            .provider_name("ollama")
            .build()
            .unwrap();
        assert!(c.check_api_key().is_ok());
    }
}
