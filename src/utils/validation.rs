use crate::utils::error::{ImportError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ImportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// A bare directory name, used for the `error`/`success` subdirectories.
pub fn validate_dir_name(field_name: &str, name: &str) -> Result<()> {
    validate_path(field_name, name)?;
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Must be a single directory name".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ImportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}
