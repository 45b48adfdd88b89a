use crate::domain::model::ImportContext;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Accepts or rejects descriptor content against the descriptor schema.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, content: &str) -> Result<()>;
}

/// Runs one descriptor through the import. Implemented by the pipeline and
/// driven by the intake watcher.
#[async_trait]
pub trait DescriptorHandler: Send + Sync {
    async fn handle(&self, descriptor: &Path) -> Result<ImportContext>;
}
