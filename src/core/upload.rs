use crate::adapters::http::WorkflowClient;
use crate::domain::model::UploadRequest;
use crate::utils::error::{ImportError, Result};
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

pub const UPLOAD_TYPE: &str = "NewDoc";
pub const COMMENT_FIELD: &str = "comment";
pub const UPLOAD_TYPE_FIELD: &str = "uploadType";
pub const DOCUMENT_FIELD: &str = "uploadedDocument";

/// Waits, bounded, for the payload named by a descriptor to land next to it.
#[derive(Debug, Clone)]
pub struct PayloadCorrelator {
    wait_timeout: Duration,
    poll_interval: Duration,
    min_age: Duration,
}

impl PayloadCorrelator {
    /// `min_age` is how long the payload must go unmodified before it is read.
    pub fn new(wait_timeout: Duration, poll_interval: Duration, min_age: Duration) -> Self {
        Self {
            wait_timeout,
            // tokio's interval panics on a zero period
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            min_age,
        }
    }

    /// Reads the payload once it has settled. Times out with `PayloadMissing`.
    /// The wait and the read share one deadline; a timed-out read is dropped
    /// together with its file handle.
    pub async fn await_payload(&self, path: &Path) -> Result<Vec<u8>> {
        tracing::debug!("⏳ Waiting up to {:?} for {}", self.wait_timeout, path.display());

        let wait = async {
            self.wait_until_settled(path).await?;
            Ok::<_, ImportError>(tokio::fs::read(path).await?)
        };

        match timeout(self.wait_timeout, wait).await {
            Ok(content) => content,
            Err(_) => {
                tracing::error!("❌ Payload file is not presented for {}", path.display());
                Err(ImportError::PayloadMissing {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    /// A file counts as settled once two consecutive polls see the same size
    /// and it has not been modified for at least `min_age`.
    async fn wait_until_settled(&self, path: &Path) -> Result<()> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_len: Option<u64> = None;

        loop {
            ticker.tick().await;
            match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_file() => {
                    let len = metadata.len();
                    let modified: DateTime<Utc> = metadata.modified()?.into();
                    let age = Utc::now()
                        .signed_duration_since(modified)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    if last_len == Some(len) && age >= self.min_age {
                        return Ok(());
                    }
                    last_len = Some(len);
                }
                Ok(_) => last_len = None,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => last_len = None,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Builds and sends the multipart upload to the workflow's upload transition.
#[derive(Debug, Clone)]
pub struct UploadAssembler {
    client: WorkflowClient,
    comment: String,
    timeout: Duration,
}

impl UploadAssembler {
    pub fn new(client: WorkflowClient, comment: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            comment: comment.into(),
            timeout,
        }
    }

    pub fn assemble(&self, file_name: &str, mime_type: &str, content: Vec<u8>) -> UploadRequest {
        UploadRequest {
            comment: self.comment.clone(),
            upload_type: UPLOAD_TYPE.to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            content,
        }
    }

    /// Sends `request`. Anything but `200 OK` is `UploadRejected`; no retry.
    pub async fn submit(&self, upload_href: &str, request: UploadRequest) -> Result<()> {
        let size = request.content.len();
        let file_name = request.file_name.clone();
        let form = build_form(request)?;

        let status = self.client.post_multipart(upload_href, form, self.timeout).await?;
        if status != StatusCode::OK {
            tracing::error!("❌ Upload of {} rejected with status {}", file_name, status);
            return Err(ImportError::UploadRejected {
                status: status.as_u16(),
            });
        }

        tracing::info!("✅ Uploaded {} ({} bytes)", file_name, size);
        Ok(())
    }
}

/// `comment` + `uploadType` text parts and the binary `uploadedDocument` part.
pub fn build_form(request: UploadRequest) -> Result<Form> {
    let document = Part::bytes(request.content)
        .file_name(request.file_name)
        .mime_str(&request.mime_type)
        .map_err(|_| ImportError::MalformedDescriptor {
            field: "MimeType".to_string(),
        })?;

    Ok(Form::new()
        .text(COMMENT_FIELD, request.comment)
        .text(UPLOAD_TYPE_FIELD, request.upload_type)
        .part(DOCUMENT_FIELD, document))
}
