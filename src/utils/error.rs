use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid file found in input. Filename was: {file_name}. Expected file format is: {pattern}")]
    InvalidFileName { file_name: String, pattern: String },

    #[error("Descriptor failed schema validation: {reason}")]
    SchemaInvalid { reason: String },

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Descriptor is missing required field '{field}'")]
    MalformedDescriptor { field: String },

    #[error("No workflow type mapped for import task '{task_code}'")]
    UnknownTask { task_code: String },

    #[error("Failed to connect to workflow API: {0}")]
    ConnectionFailure(#[from] reqwest::Error),

    #[error("No workflow found for identity {identity} and workflow type {workflow_type}")]
    WorkflowNotFound {
        identity: String,
        workflow_type: String,
    },

    #[error("No uploadDocumentWithoutTranslation transition on workflow {workflow_href}")]
    NoUploadTransition { workflow_href: String },

    #[error("Payload file is not presented: {}", path.display())]
    PayloadMissing { path: PathBuf },

    #[error("Upload rejected with HTTP status {status}")]
    UploadRejected { status: u16 },

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unexpected failure: {message}")]
    Unexpected { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

/// Failure classes an import can end in. Every `ImportError` falls in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidFileName,
    SchemaInvalid,
    MalformedDescriptor,
    UnknownTask,
    ConnectionFailure,
    WorkflowNotFound,
    NoUploadTransition,
    PayloadMissing,
    UploadRejected,
    UnexpectedFailure,
    Configuration,
}

impl ImportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::InvalidFileName { .. } => ErrorCategory::InvalidFileName,
            ImportError::SchemaInvalid { .. } | ImportError::XmlError(_) => {
                ErrorCategory::SchemaInvalid
            }
            ImportError::MalformedDescriptor { .. } => ErrorCategory::MalformedDescriptor,
            ImportError::UnknownTask { .. } => ErrorCategory::UnknownTask,
            ImportError::ConnectionFailure(_) => ErrorCategory::ConnectionFailure,
            ImportError::WorkflowNotFound { .. } => ErrorCategory::WorkflowNotFound,
            ImportError::NoUploadTransition { .. } => ErrorCategory::NoUploadTransition,
            ImportError::PayloadMissing { .. } => ErrorCategory::PayloadMissing,
            ImportError::UploadRejected { .. } => ErrorCategory::UploadRejected,
            ImportError::UnexpectedStatus { .. }
            | ImportError::IoError(_)
            | ImportError::SerializationError(_)
            | ImportError::Unexpected { .. } => ErrorCategory::UnexpectedFailure,
            ImportError::ConfigError { .. }
            | ImportError::InvalidConfigValueError { .. }
            | ImportError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 給操作人員的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::InvalidFileName => {
                "Rename the descriptor to <11 digits>D<6 digits>T<8 digits>.xml and drop it again"
            }
            ErrorCategory::SchemaInvalid | ErrorCategory::MalformedDescriptor => {
                "Fix the descriptor content and re-deliver it with the payload from the error folder"
            }
            ErrorCategory::UnknownTask => "Add the import task to [task_mapping] or correct the descriptor",
            ErrorCategory::ConnectionFailure => {
                "Check that the workflow API is reachable and [workflow_api] host/port are correct"
            }
            ErrorCategory::WorkflowNotFound => {
                "Create the workflow for this identity, then re-deliver the descriptor and payload"
            }
            ErrorCategory::NoUploadTransition => {
                "The workflow is not in a state that accepts documents; advance it and retry manually"
            }
            ErrorCategory::PayloadMissing => {
                "Deliver the payload file together with its descriptor within the wait timeout"
            }
            ErrorCategory::UploadRejected => "Inspect the workflow API logs for the rejected upload",
            ErrorCategory::UnexpectedFailure => "Check the logs for details",
            ErrorCategory::Configuration => "Check the configuration file and environment variables",
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_and_serialization_errors_are_unexpected_failures() {
        let io = ImportError::from(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(io.category(), ErrorCategory::UnexpectedFailure);

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            ImportError::from(json).category(),
            ErrorCategory::UnexpectedFailure
        );
    }

    #[test]
    fn test_taxonomy_categories() {
        let err = ImportError::UploadRejected { status: 500 };
        assert_eq!(err.category(), ErrorCategory::UploadRejected);
        assert_eq!(err.to_string(), "Upload rejected with HTTP status 500");

        let err = ImportError::PayloadMissing {
            path: PathBuf::from("/in/doc1.pdf"),
        };
        assert_eq!(err.category(), ErrorCategory::PayloadMissing);
        assert!(err.to_string().contains("/in/doc1.pdf"));
    }
}
