use crate::utils::error::{ImportError, Result};
use crate::utils::url::SchemeRewrite;
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const REFERENCE_TASK: &str = "PUBLIC_RETIREMENT_ESTIMATION";
pub const REFERENCE_WORKFLOW_TYPE: &str = "Estimation";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub intake: IntakeConfig,
    pub workflow_api: WorkflowApiConfig,
    pub payload: Option<PayloadConfig>,
    pub upload: Option<UploadConfig>,
    pub quarantine: Option<QuarantineConfig>,
    pub task_mapping: Option<HashMap<String, String>>,
    pub scheme_rewrite: Option<HashMap<String, String>>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub directory: String,
    pub poll_interval_ms: Option<u64>,
    pub min_file_age_ms: Option<u64>,
    pub max_concurrent_imports: Option<usize>,
    pub success_dir: Option<String>,
    pub failed_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowApiConfig {
    pub scheme: Option<String>,
    pub host: String,
    pub port: u16,
    pub search_path: String,
    pub authorization: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub identity_param: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadConfig {
    pub wait_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub min_age_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    pub timeout_ms: Option<u64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarantineConfig {
    pub error_dir: Option<String>,
    pub default_payload_extension: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: Option<String>,
}

impl ImportConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WORKFLOW_API_AUTHORIZATION})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ImportError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 搜尋端點 URL
    pub fn search_url(&self) -> String {
        let api = &self.workflow_api;
        format!(
            "{}://{}:{}/{}",
            api.scheme.as_deref().unwrap_or("http"),
            api.host,
            api.port,
            api.search_path.trim_start_matches('/')
        )
    }

    pub fn authorization(&self) -> Option<&str> {
        self.workflow_api.authorization.as_deref()
    }

    pub fn identity_param(&self) -> &str {
        self.workflow_api.identity_param.as_deref().unwrap_or("identity")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.workflow_api.request_timeout_ms.unwrap_or(30_000))
    }

    pub fn intake_dir(&self) -> PathBuf {
        PathBuf::from(&self.intake.directory)
    }

    pub fn intake_poll_interval(&self) -> Duration {
        Duration::from_millis(self.intake.poll_interval_ms.unwrap_or(5_000))
    }

    /// 檔案需靜置的最短時間，避免讀到仍在寫入的檔案
    pub fn min_file_age(&self) -> Duration {
        Duration::from_millis(self.intake.min_file_age_ms.unwrap_or(6_000))
    }

    pub fn max_concurrent_imports(&self) -> usize {
        self.intake.max_concurrent_imports.unwrap_or(4)
    }

    pub fn success_dir(&self) -> &str {
        self.intake.success_dir.as_deref().unwrap_or("success")
    }

    pub fn failed_dir(&self) -> &str {
        self.intake.failed_dir.as_deref().unwrap_or("error")
    }

    pub fn payload_wait_timeout(&self) -> Duration {
        let ms = self.payload.as_ref().and_then(|p| p.wait_timeout_ms);
        Duration::from_millis(ms.unwrap_or(30_000))
    }

    pub fn payload_poll_interval(&self) -> Duration {
        let ms = self.payload.as_ref().and_then(|p| p.poll_interval_ms);
        Duration::from_millis(ms.unwrap_or(250))
    }

    /// 負載檔案最後修改後需靜置的時間，避免上傳寫入中的檔案
    pub fn payload_min_age(&self) -> Duration {
        let ms = self.payload.as_ref().and_then(|p| p.min_age_ms);
        Duration::from_millis(ms.unwrap_or(3_000))
    }

    pub fn upload_timeout(&self) -> Duration {
        let ms = self.upload.as_ref().and_then(|u| u.timeout_ms);
        Duration::from_millis(ms.unwrap_or(60_000))
    }

    pub fn upload_comment(&self) -> &str {
        self.upload
            .as_ref()
            .and_then(|u| u.comment.as_deref())
            .unwrap_or("Imported document")
    }

    pub fn error_dir(&self) -> &str {
        self.quarantine
            .as_ref()
            .and_then(|q| q.error_dir.as_deref())
            .unwrap_or("error")
    }

    pub fn default_payload_extension(&self) -> &str {
        self.quarantine
            .as_ref()
            .and_then(|q| q.default_payload_extension.as_deref())
            .unwrap_or("pdf")
    }

    /// 匯入任務 -> 工作流程類型對照表；未設定時使用預設對照
    pub fn task_mapping(&self) -> HashMap<String, String> {
        self.task_mapping.clone().unwrap_or_else(|| {
            HashMap::from([(
                REFERENCE_TASK.to_string(),
                REFERENCE_WORKFLOW_TYPE.to_string(),
            )])
        })
    }

    pub fn scheme_rewrite(&self) -> SchemeRewrite {
        SchemeRewrite::new(self.scheme_rewrite.clone().unwrap_or_default())
    }

    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("intake.directory", &self.intake.directory)?;
        validation::validate_url("workflow_api", &self.search_url())?;
        validation::validate_non_empty_string("workflow_api.host", &self.workflow_api.host)?;
        validation::validate_non_empty_string(
            "workflow_api.identity_param",
            self.identity_param(),
        )?;

        if let Some(authorization) = self.authorization() {
            validation::validate_non_empty_string("workflow_api.authorization", authorization)?;
        }

        validation::validate_positive_number(
            "intake.max_concurrent_imports",
            self.max_concurrent_imports() as u64,
            1,
        )?;
        for (field, value) in [
            ("intake.poll_interval_ms", self.intake_poll_interval()),
            ("workflow_api.request_timeout_ms", self.request_timeout()),
            ("payload.wait_timeout_ms", self.payload_wait_timeout()),
            ("payload.poll_interval_ms", self.payload_poll_interval()),
            ("payload.min_age_ms", self.payload_min_age()),
            ("upload.timeout_ms", self.upload_timeout()),
        ] {
            validation::validate_positive_number(field, value.as_millis() as u64, 1)?;
        }

        if self.payload_min_age() >= self.payload_wait_timeout() {
            return Err(ImportError::InvalidConfigValueError {
                field: "payload.min_age_ms".to_string(),
                value: self.payload_min_age().as_millis().to_string(),
                reason: "Must be shorter than payload.wait_timeout_ms".to_string(),
            });
        }

        validation::validate_dir_name("intake.success_dir", self.success_dir())?;
        validation::validate_dir_name("intake.failed_dir", self.failed_dir())?;
        validation::validate_dir_name("quarantine.error_dir", self.error_dir())?;
        validation::validate_non_empty_string(
            "quarantine.default_payload_extension",
            self.default_payload_extension(),
        )?;

        let mapping = self.task_mapping();
        if mapping.is_empty() {
            return Err(ImportError::MissingConfigError {
                field: "task_mapping".to_string(),
            });
        }
        for (task, workflow_type) in &mapping {
            validation::validate_non_empty_string(&format!("task_mapping.{}", task), workflow_type)?;
        }

        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_deref()) {
            if !matches!(format.to_ascii_lowercase().as_str(), "compact" | "json") {
                return Err(ImportError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.to_string(),
                    reason: "Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for ImportConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[intake]
directory = "/data/inbox"

[workflow_api]
host = "workflow.local"
port = 8080
search_path = "/api/workflows"
authorization = "Basic dXNlcjpwYXNz"
"#;

    #[test]
    fn test_parse_minimal_config_with_defaults() {
        let config = ImportConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.search_url(), "http://workflow.local:8080/api/workflows");
        assert_eq!(config.identity_param(), "identity");
        assert_eq!(config.payload_wait_timeout(), Duration::from_secs(30));
        assert_eq!(config.payload_min_age(), Duration::from_secs(3));
        assert_eq!(config.upload_timeout(), Duration::from_secs(60));
        assert_eq!(config.min_file_age(), Duration::from_secs(6));
        assert_eq!(config.error_dir(), "error");
        assert_eq!(config.success_dir(), "success");
        assert_eq!(config.default_payload_extension(), "pdf");
        assert_eq!(
            config.task_mapping().get(REFERENCE_TASK).map(String::as_str),
            Some(REFERENCE_WORKFLOW_TYPE)
        );
        assert!(config.scheme_rewrite().is_identity());
        assert!(!config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[intake]
directory = "/data/inbox"
poll_interval_ms = 1000
min_file_age_ms = 3000
max_concurrent_imports = 2
success_dir = "done"
failed_dir = "failed"

[workflow_api]
scheme = "https"
host = "workflow.local"
port = 8443
search_path = "api/workflows"
request_timeout_ms = 5000
identity_param = "niss"

[payload]
wait_timeout_ms = 10000
poll_interval_ms = 100
min_age_ms = 1500

[upload]
timeout_ms = 45000
comment = "Imported from scanner"

[quarantine]
error_dir = "quarantine"
default_payload_extension = "tiff"

[task_mapping]
PUBLIC_RETIREMENT_ESTIMATION = "Estimation"
PRIVATE_PENSION_REVIEW = "Review"

[scheme_rewrite]
http = "http4"

[logging]
format = "json"
"#;
        let config = ImportConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.search_url(), "https://workflow.local:8443/api/workflows");
        assert_eq!(config.identity_param(), "niss");
        assert_eq!(config.authorization(), None);
        assert_eq!(config.max_concurrent_imports(), 2);
        assert_eq!(config.payload_min_age(), Duration::from_millis(1500));
        assert_eq!(config.failed_dir(), "failed");
        assert_eq!(config.upload_comment(), "Imported from scanner");
        assert_eq!(config.error_dir(), "quarantine");
        assert_eq!(config.task_mapping().len(), 2);
        assert_eq!(config.scheme_rewrite().apply("http://a/b"), "http4://a/b");
        assert!(config.json_logging());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DOC_IMPORT_TEST_AUTH", "Bearer secret-token");

        let toml_content = MINIMAL.replace("Basic dXNlcjpwYXNz", "${DOC_IMPORT_TEST_AUTH}");
        let config = ImportConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.authorization(), Some("Bearer secret-token"));

        std::env::remove_var("DOC_IMPORT_TEST_AUTH");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            MINIMAL.replace("directory = \"/data/inbox\"", "directory = \"\""),
            MINIMAL.replace("host = \"workflow.local\"", "host = \"\""),
            format!("{}\n[task_mapping]\n", MINIMAL),
            format!("{}\n[quarantine]\nerror_dir = \"../up\"\n", MINIMAL),
            format!("{}\n[payload]\nwait_timeout_ms = 0\n", MINIMAL),
            format!("{}\n[payload]\nmin_age_ms = 0\n", MINIMAL),
            format!("{}\n[payload]\nwait_timeout_ms = 2000\nmin_age_ms = 3000\n", MINIMAL),
            format!("{}\n[logging]\nformat = \"xml\"\n", MINIMAL),
        ];
        for case in cases {
            let config = ImportConfig::from_toml_str(&case).unwrap();
            assert!(config.validate().is_err(), "expected rejection for:\n{}", case);
        }
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ImportConfig::from_toml_str("[intake\n").unwrap_err();
        assert!(matches!(err, ImportError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = ImportConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.intake_dir(), PathBuf::from("/data/inbox"));
    }
}
