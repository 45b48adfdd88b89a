pub mod error;
pub mod fs;
pub mod logger;
pub mod url;
pub mod validation;
