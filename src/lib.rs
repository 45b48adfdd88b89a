pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliArgs;

pub use crate::adapters::intake::{DirectoryIntake, IntakeSummary};
pub use crate::config::toml_config::ImportConfig;
pub use crate::core::pipeline::ImportPipeline;
pub use crate::core::quarantine::{QuarantineHandler, QuarantineOutcome};
pub use crate::domain::model::ImportContext;
pub use crate::utils::error::{ErrorCategory, ImportError, Result};
