//! Configuration module
//!
//! The sink configuration is an explicit value passed to the engine at
//! construction time, never module-level state, so the engine stays
//! testable and reentrant across concurrent uploads.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::context::UploadContext;
use crate::validation::DEFAULT_ALLOWED_CONTENT_TYPES;
use crate::variant::VariantTaskSpec;

const DEFAULT_MAX_SOURCE_SIZE_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_SPILL_THRESHOLD_BYTES: usize = 8 * 1024 * 1024;

/// Overridable resolution step: a pure mapping from the upload context to a
/// directory or filename string, failing through the error channel.
pub type PathStrategy = Arc<dyn Fn(&UploadContext) -> Result<String> + Send + Sync>;

/// Sink configuration.
///
/// `tasks` is the default variant profile used by `transcode`; callers may
/// also supply a profile per invocation. Sources larger than
/// `spill_threshold_bytes` are materialized to a temporary file instead of
/// memory; sources larger than `max_source_size_bytes` are rejected.
#[derive(Clone)]
pub struct SinkConfig {
    pub root_directory: PathBuf,
    pub tasks: Vec<VariantTaskSpec>,
    pub max_source_size_bytes: usize,
    pub spill_threshold_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub destination_strategy: Option<PathStrategy>,
    pub filename_strategy: Option<PathStrategy>,
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("root_directory", &self.root_directory)
            .field("tasks", &self.tasks)
            .field("max_source_size_bytes", &self.max_source_size_bytes)
            .field("spill_threshold_bytes", &self.spill_threshold_bytes)
            .field("allowed_content_types", &self.allowed_content_types)
            .field(
                "destination_strategy",
                &self.destination_strategy.as_ref().map(|_| "<strategy>"),
            )
            .field(
                "filename_strategy",
                &self.filename_strategy.as_ref().map(|_| "<strategy>"),
            )
            .finish()
    }
}

impl SinkConfig {
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            tasks: Vec::new(),
            max_source_size_bytes: DEFAULT_MAX_SOURCE_SIZE_BYTES,
            spill_threshold_bytes: DEFAULT_SPILL_THRESHOLD_BYTES,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|ct| ct.to_string())
                .collect(),
            destination_strategy: None,
            filename_strategy: None,
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<VariantTaskSpec>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_max_source_size(mut self, bytes: usize) -> Self {
        self.max_source_size_bytes = bytes;
        self
    }

    pub fn with_spill_threshold(mut self, bytes: usize) -> Self {
        self.spill_threshold_bytes = bytes;
        self
    }

    pub fn with_allowed_content_types(mut self, content_types: Vec<String>) -> Self {
        self.allowed_content_types = content_types;
        self
    }

    pub fn with_destination_strategy(
        mut self,
        strategy: impl Fn(&UploadContext) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.destination_strategy = Some(Arc::new(strategy));
        self
    }

    pub fn with_filename_strategy(
        mut self,
        strategy: impl Fn(&UploadContext) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.filename_strategy = Some(Arc::new(strategy));
        self
    }

    /// Load configuration from environment variables:
    /// `IMGSINK_ROOT_DIR` (required), `IMGSINK_TASKS` (comma-separated
    /// `WxH:format[:suffix]` entries), `IMGSINK_MAX_SOURCE_SIZE_BYTES`,
    /// `IMGSINK_SPILL_THRESHOLD_BYTES`, `IMGSINK_ALLOWED_CONTENT_TYPES`.
    pub fn from_env() -> Result<Self> {
        let root_directory =
            env::var("IMGSINK_ROOT_DIR").map_err(|_| anyhow!("IMGSINK_ROOT_DIR not configured"))?;
        let tasks = parse_task_list(&env::var("IMGSINK_TASKS").unwrap_or_default())?;
        let max_source_size_bytes = env_parse(
            "IMGSINK_MAX_SOURCE_SIZE_BYTES",
            DEFAULT_MAX_SOURCE_SIZE_BYTES,
        )?;
        let spill_threshold_bytes = env_parse(
            "IMGSINK_SPILL_THRESHOLD_BYTES",
            DEFAULT_SPILL_THRESHOLD_BYTES,
        )?;
        let allowed_content_types =
            env_list("IMGSINK_ALLOWED_CONTENT_TYPES", &DEFAULT_ALLOWED_CONTENT_TYPES);

        let config = SinkConfig::new(root_directory)
            .with_tasks(tasks)
            .with_max_source_size(max_source_size_bytes)
            .with_spill_threshold(spill_threshold_bytes)
            .with_allowed_content_types(allowed_content_types);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_directory.as_os_str().is_empty() {
            return Err(anyhow!("Root directory must not be empty"));
        }
        if self.max_source_size_bytes == 0 {
            return Err(anyhow!("Maximum source size must be greater than zero"));
        }
        if self.spill_threshold_bytes > self.max_source_size_bytes {
            return Err(anyhow!(
                "Spill threshold ({} bytes) must not exceed maximum source size ({} bytes)",
                self.spill_threshold_bytes,
                self.max_source_size_bytes
            ));
        }
        if self.allowed_content_types.is_empty() {
            return Err(anyhow!("Allowed content types must not be empty"));
        }
        for task in &self.tasks {
            task.validate()?;
        }
        Ok(())
    }
}

/// Parse a comma-separated list of compact variant specs; empty input is an
/// empty profile.
pub fn parse_task_list(raw: &str) -> Result<Vec<VariantTaskSpec>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(VariantTaskSpec::parse)
        .collect()
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect(),
        Err(_) => default.iter().map(|entry| entry.to_string()).collect(),
    }
}
