use crate::domain::model::ImportContext;
use crate::utils::fs::move_into_subdir;
use std::path::{Path, PathBuf};

/// What the failure boundary did with the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuarantineOutcome {
    Moved { from: PathBuf, to: PathBuf },
    /// Neither a payload name nor a descriptor name was known.
    NoCandidate,
    SourceMissing(PathBuf),
    MoveFailed(PathBuf),
}

/// Moves the payload of a failed import into `<intake>/error/`. Never fails;
/// running it again after a successful move finds nothing to do.
#[derive(Debug, Clone)]
pub struct QuarantineHandler {
    error_dir: String,
    default_extension: String,
}

impl QuarantineHandler {
    pub fn new(error_dir: impl Into<String>, default_extension: impl Into<String>) -> Self {
        Self {
            error_dir: error_dir.into(),
            default_extension: default_extension.into(),
        }
    }

    /// The extracted payload name, or `<descriptor stem>.<default extension>`
    /// when the import failed before the descriptor was read.
    pub fn candidate_name(&self, context: &ImportContext) -> Option<String> {
        if let Some(name) = &context.payload_file_name {
            return Some(name.clone());
        }

        tracing::info!("No payload name provided. Using the descriptor base name.");
        let stem = Path::new(context.descriptor_file_name()?).file_stem()?.to_str()?;
        Some(format!("{}.{}", stem, self.default_extension))
    }

    pub async fn quarantine(&self, context: &ImportContext) -> QuarantineOutcome {
        let Some(file_name) = self.candidate_name(context) else {
            tracing::info!("No descriptor name provided, nothing to quarantine");
            return QuarantineOutcome::NoCandidate;
        };

        let source = context.intake_dir().join(&file_name);
        tracing::info!("Computed payload source = {}", source.display());

        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            tracing::warn!("No payload file found: {}", source.display());
            return QuarantineOutcome::SourceMissing(source);
        }

        match move_into_subdir(&source, &self.error_dir).await {
            Ok(destination) => {
                tracing::info!("🚧 Payload quarantined to {}", destination.display());
                QuarantineOutcome::Moved {
                    from: source,
                    to: destination,
                }
            }
            Err(e) => {
                tracing::error!("❌ Error moving payload {}: {}", source.display(), e);
                QuarantineOutcome::MoveFailed(source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn handler() -> QuarantineHandler {
        QuarantineHandler::new("error", "pdf")
    }

    #[test]
    fn test_candidate_prefers_extracted_name() {
        let mut context = ImportContext::new("/in/01234567890D123456T12345678.xml");
        context.payload_file_name = Some("doc1.pdf".to_string());
        assert_eq!(handler().candidate_name(&context).as_deref(), Some("doc1.pdf"));
    }

    #[test]
    fn test_candidate_falls_back_to_descriptor_stem() {
        let context = ImportContext::new("/in/01234567890D123456T12345678.xml");
        assert_eq!(
            handler().candidate_name(&context).as_deref(),
            Some("01234567890D123456T12345678.pdf")
        );

        let tiff = QuarantineHandler::new("error", "tiff");
        assert_eq!(
            tiff.candidate_name(&context).as_deref(),
            Some("01234567890D123456T12345678.tiff")
        );
    }

    #[tokio::test]
    async fn test_no_descriptor_name_is_no_candidate() {
        let context = ImportContext::new("");
        assert_eq!(handler().quarantine(&context).await, QuarantineOutcome::NoCandidate);
    }

    #[tokio::test]
    async fn test_quarantine_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let payload = temp_dir.path().join("doc1.pdf");
        tokio::fs::write(&payload, b"%PDF").await.unwrap();

        let mut context = ImportContext::new(temp_dir.path().join("01234567890D123456T12345678.xml"));
        context.payload_file_name = Some("doc1.pdf".to_string());

        let first = handler().quarantine(&context).await;
        assert_eq!(
            first,
            QuarantineOutcome::Moved {
                from: payload.clone(),
                to: temp_dir.path().join("error").join("doc1.pdf"),
            }
        );

        let second = handler().quarantine(&context).await;
        assert_eq!(second, QuarantineOutcome::SourceMissing(payload));
        assert!(temp_dir.path().join("error").join("doc1.pdf").exists());
    }
}
