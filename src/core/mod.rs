pub mod descriptor;
pub mod pipeline;
pub mod quarantine;
pub mod upload;
pub mod workflow;

pub use crate::domain::model::{DescriptorFields, ImportContext};
pub use crate::domain::ports::{DescriptorHandler, SchemaValidator};
pub use crate::utils::error::Result;
