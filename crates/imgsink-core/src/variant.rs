//! Variant task specifications and results.
//!
//! A variant is one derived, re-encoded copy of an uploaded asset at a
//! specific size and format. Callers describe the variants they want as a
//! list of [`VariantTaskSpec`]; the engine answers with a
//! [`StoredFileDescriptor`] whose results are indexed identically to that
//! list.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for stored variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantFormat {
    Jpeg,
    Png,
    WebP,
}

impl VariantFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(VariantFormat::Jpeg),
            "png" => Ok(VariantFormat::Png),
            "webp" => Ok(VariantFormat::WebP),
            _ => Err(anyhow!("Invalid format: {}", s)),
        }
    }

    /// File extension used when deriving variant paths
    pub fn extension(self) -> &'static str {
        match self {
            VariantFormat::Jpeg => "jpeg",
            VariantFormat::Png => "png",
            VariantFormat::WebP => "webp",
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            VariantFormat::Jpeg => "image/jpeg",
            VariantFormat::Png => "image/png",
            VariantFormat::WebP => "image/webp",
        }
    }

    /// Whether the encoded form can carry an alpha channel
    pub fn supports_alpha(self) -> bool {
        !matches!(self, VariantFormat::Jpeg)
    }
}

/// One variant to produce per upload: target box, output format, and an
/// optional filename suffix.
///
/// The target box is a non-cropping fit: the produced image preserves the
/// source aspect ratio and may be smaller than `width × height` in one
/// dimension. Authoritative dimensions always come from the written
/// artifact, never from this spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTaskSpec {
    pub width: u32,
    pub height: u32,
    pub format: VariantFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl VariantTaskSpec {
    pub fn new(width: u32, height: u32, format: VariantFormat) -> Self {
        Self {
            width,
            height,
            format,
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Parse the compact `WxH:format[:suffix]` form, e.g. `800x600:jpeg`
    /// or `150x150:jpeg:icon`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let dims = parts.next().unwrap_or_default();
        let format = parts
            .next()
            .ok_or_else(|| anyhow!("Missing format in variant spec: {}", s))?;
        let suffix = parts.next();

        let (w, h) = dims
            .split_once('x')
            .ok_or_else(|| anyhow!("Invalid dimensions in variant spec: {}", s))?;
        let width: u32 = w
            .parse()
            .map_err(|_| anyhow!("Invalid width in variant spec: {}", s))?;
        let height: u32 = h
            .parse()
            .map_err(|_| anyhow!("Invalid height in variant spec: {}", s))?;

        let spec = Self {
            width,
            height,
            format: VariantFormat::parse(format)?,
            suffix: suffix.map(|sfx| sfx.to_string()),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(anyhow!("Variant width must be greater than zero"));
        }
        if self.height == 0 {
            return Err(anyhow!("Variant height must be greater than zero"));
        }
        if let Some(suffix) = &self.suffix {
            if suffix.is_empty() {
                return Err(anyhow!("Variant suffix must not be empty"));
            }
            if suffix.contains(['/', '\\']) || suffix.contains("..") {
                return Err(anyhow!("Variant suffix must not contain path separators"));
            }
        }
        Ok(())
    }

    /// Derive the variant's file name from a base filename:
    /// `base[_suffix].extension`.
    pub fn file_name(&self, base: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}_{}.{}", base, suffix, self.format.extension()),
            None => format!("{}.{}", base, self.format.extension()),
        }
    }
}

/// One stored variant: resolved path plus the dimensions read back from the
/// written artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResult {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Aggregate result of a successful store: one [`VariantResult`] per
/// supplied [`VariantTaskSpec`], in the same index positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileDescriptor {
    pub results: Vec<VariantResult>,
}

impl StoredFileDescriptor {
    /// The first variant's result, by convention the primary artifact a
    /// caller records for later cleanup.
    pub fn primary(&self) -> Option<&VariantResult> {
        self.results.first()
    }
}
