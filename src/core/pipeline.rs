use crate::adapters::http::WorkflowClient;
use crate::config::toml_config::ImportConfig;
use crate::core::descriptor::{self, DocumentSchemaValidator, FieldExtractor};
use crate::core::quarantine::QuarantineHandler;
use crate::core::upload::{PayloadCorrelator, UploadAssembler};
use crate::core::workflow::{WorkflowDetailFetcher, WorkflowLocator, WorkflowTypeMapper};
use crate::domain::model::ImportContext;
use crate::domain::ports::{DescriptorHandler, SchemaValidator};
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;

/// One descriptor in, one upload out. Stages run strictly in order; any
/// failure is caught once in `process`, logged, and the payload quarantined.
pub struct ImportPipeline<V: SchemaValidator = DocumentSchemaValidator> {
    schema: V,
    mapper: WorkflowTypeMapper,
    locator: WorkflowLocator,
    details: WorkflowDetailFetcher,
    correlator: PayloadCorrelator,
    uploader: UploadAssembler,
    quarantine: QuarantineHandler,
}

impl ImportPipeline<DocumentSchemaValidator> {
    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Self::with_validator(config, DocumentSchemaValidator::new())
    }
}

impl<V: SchemaValidator> ImportPipeline<V> {
    pub fn with_validator(config: &ImportConfig, schema: V) -> Result<Self> {
        let client = WorkflowClient::new(
            config.authorization().map(str::to_string),
            config.request_timeout(),
        )?;
        let rewrite = config.scheme_rewrite();
        if !rewrite.is_identity() {
            tracing::info!("🔁 Rewriting link schemes: {:?}", rewrite);
        }

        Ok(Self {
            schema,
            mapper: WorkflowTypeMapper::new(config.task_mapping()),
            locator: WorkflowLocator::new(
                client.clone(),
                config.search_url(),
                config.identity_param(),
                rewrite.clone(),
            ),
            details: WorkflowDetailFetcher::new(client.clone(), rewrite, config.upload_timeout()),
            correlator: PayloadCorrelator::new(
                config.payload_wait_timeout(),
                config.payload_poll_interval(),
                config.payload_min_age(),
            ),
            uploader: UploadAssembler::new(client, config.upload_comment(), config.upload_timeout()),
            quarantine: QuarantineHandler::new(config.error_dir(), config.default_payload_extension()),
        })
    }

    /// Runs the import for `descriptor`. On error the payload has already
    /// been quarantined when this returns.
    pub async fn process(&self, descriptor: &Path) -> Result<ImportContext> {
        let mut context = ImportContext::new(descriptor);
        let file_name = context
            .descriptor_file_name()
            .unwrap_or_default()
            .to_string();
        let started = Instant::now();

        tracing::info!("📥 Processing file {}", file_name);

        match self.run_stages(&mut context).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Imported {} in {:?}",
                    file_name,
                    started.elapsed()
                );
                Ok(context)
            }
            Err(e) => {
                tracing::error!(
                    file = %file_name,
                    category = ?e.category(),
                    "❌ Import failed while processing file {}: {}",
                    file_name,
                    e
                );
                let outcome = self.quarantine.quarantine(&context).await;
                tracing::debug!("Quarantine outcome for {}: {:?}", file_name, outcome);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, context: &mut ImportContext) -> Result<()> {
        descriptor::validate_file_name(&context.source_path)?;

        let bytes = tokio::fs::read(&context.source_path).await?;
        let content = String::from_utf8(bytes).map_err(|e| ImportError::SchemaInvalid {
            reason: format!("Descriptor is not UTF-8 encoded: {}", e),
        })?;
        self.schema.validate(&content)?;

        let fields = FieldExtractor::extract(&content)?;
        context.record_fields(&fields);
        tracing::debug!(
            "Descriptor fields: payload={}, task={}, mime={}",
            fields.payload_file_name,
            fields.task_code,
            fields.mime_type
        );

        let workflow_type = self.mapper.workflow_type(&fields.task_code)?.to_string();
        context.workflow_type = Some(workflow_type.clone());

        let workflow_href = self.locator.locate(&fields.identity, &workflow_type).await?;
        context.workflow_href = Some(workflow_href.clone());

        let upload_href = self.details.upload_href(&workflow_href).await?;
        context.upload_href = Some(upload_href.clone());

        let payload_path = context.intake_dir().join(&fields.payload_file_name);
        let payload = self.correlator.await_payload(&payload_path).await?;

        let request = self
            .uploader
            .assemble(&fields.payload_file_name, &fields.mime_type, payload);
        self.uploader.submit(&upload_href, request).await
    }
}

#[async_trait]
impl<V: SchemaValidator> DescriptorHandler for ImportPipeline<V> {
    async fn handle(&self, descriptor: &Path) -> Result<ImportContext> {
        self.process(descriptor).await
    }
}
