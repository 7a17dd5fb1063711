//! Source validation.
//!
//! Content-type checks run before any destination or source I/O so that an
//! unsupported upload fails without touching the filesystem.

use std::path::Path;

/// Content types the sink accepts by default.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedContentType {
        content_type: String,
        allowed: Vec<String>,
    },
}

/// Validates the declared content type of an upload against a configured
/// allow-list.
pub struct SourceValidator {
    allowed_content_types: Vec<String>,
}

impl SourceValidator {
    pub fn new(allowed_content_types: Vec<String>) -> Self {
        Self {
            allowed_content_types,
        }
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::UnsupportedContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }
}

/// Map a filename's extension to the content type it implies, for callers
/// that read files off disk and have no declared type to forward.
pub fn content_type_for_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => {
            tracing::debug!(
                extension = %extension,
                "Unknown extension, no content type inferred"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> SourceValidator {
        SourceValidator::new(vec!["image/jpeg".to_string(), "image/png".to_string()])
    }

    #[test]
    fn test_validate_content_type_ok() {
        let validator = test_validator();
        assert!(validator.validate_content_type("image/jpeg").is_ok());
        assert!(validator.validate_content_type("IMAGE/PNG").is_ok()); // case insensitive
    }

    #[test]
    fn test_validate_content_type_rejected() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_content_type("text/plain"),
            Err(ValidationError::UnsupportedContentType { .. })
        ));
        assert!(validator.validate_content_type("image/webp").is_err());
    }

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("photo.jpg"), Some("image/jpeg"));
        assert_eq!(content_type_for_extension("photo.JPEG"), Some("image/jpeg"));
        assert_eq!(content_type_for_extension("icon.png"), Some("image/png"));
        assert_eq!(content_type_for_extension("anim.gif"), Some("image/gif"));
        assert_eq!(content_type_for_extension("doc.pdf"), None);
        assert_eq!(content_type_for_extension("noextension"), None);
    }
}
