use crate::config::{
    parse_output_formats, validate_output_formats, AUDIT_MODES, DEFAULT_BUNDLE_NAME,
    DEFAULT_SOURCE_HEADER_COLUMN, DEFAULT_TEMPLATE_HEADER_COLUMN,
};
use crate::core::ConfigProvider;
use crate::domain::model::{AlignOptions, AuditMode};
use crate::utils::error::{AlignError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_one_of, validate_path,
    validate_required_input, Validate, SPREADSHEET_EXTENSIONS,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub reference: ReferenceConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub mapping_file: Option<String>,
    pub template_file: Option<String>,
    pub template_header_column: Option<String>,
    pub source_header_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub enrich_names: Option<bool>,
    pub strict_headers: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    #[serde(default)]
    pub output_formats: Vec<String>,
    pub audit_mode: Option<String>,
    pub highlight_blank: Option<bool>,
    pub compression: Option<CompressionConfig>,
    pub filenames: Option<FilenameConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameConfig {
    /// 不含副檔名
    pub aligned: Option<String>,
    pub audit: Option<String>,
    pub report: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AlignError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AlignError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMPS_DIR})；未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AlignError::ConfigError {
            message: format!("Invalid environment variable pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("job.name", &self.job.name)?;

        let mapping = validate_required_input("mapping table (reference.mapping_file)", &self.reference.mapping_file)?;
        validate_file_extension("reference.mapping_file", mapping, SPREADSHEET_EXTENSIONS)?;

        if let Some(template) = &self.reference.template_file {
            validate_file_extension("reference.template_file", template, SPREADSHEET_EXTENSIONS)?;
        }

        let source = validate_required_input("source export (source.path)", &self.source.path)?;
        validate_file_extension("source.path", source, SPREADSHEET_EXTENSIONS)?;

        validate_path("load.output_path", &self.load.output_path)?;
        validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(mode) = &self.load.audit_mode {
            validate_one_of("load.audit_mode", &mode.to_ascii_lowercase(), AUDIT_MODES)?;
        }

        if let Some(filenames) = &self.load.filenames {
            for (field, value) in [
                ("load.filenames.aligned", &filenames.aligned),
                ("load.filenames.audit", &filenames.audit),
                ("load.filenames.report", &filenames.report),
            ] {
                if let Some(value) = value {
                    validate_non_empty_string(field, value)?;
                }
            }
        }

        Ok(())
    }

    /// 啟用壓縮時的 zip 檔名
    pub fn bundle_name(&self) -> Option<String> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.clone().unwrap_or_else(|| DEFAULT_BUNDLE_NAME.to_string()))
    }
}

impl ConfigProvider for TomlConfig {
    fn source_file(&self) -> Option<&str> {
        self.source.path.as_deref()
    }

    fn mapping_file(&self) -> Option<&str> {
        self.reference.mapping_file.as_deref()
    }

    fn template_file(&self) -> Option<&str> {
        self.reference.template_file.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn template_header_column(&self) -> &str {
        self.reference
            .template_header_column
            .as_deref()
            .unwrap_or(DEFAULT_TEMPLATE_HEADER_COLUMN)
    }

    fn source_header_column(&self) -> &str {
        self.reference
            .source_header_column
            .as_deref()
            .unwrap_or(DEFAULT_SOURCE_HEADER_COLUMN)
    }

    fn options(&self) -> AlignOptions {
        let defaults = AlignOptions::default();
        let filenames = self.load.filenames.as_ref();

        AlignOptions {
            enrich_names: self.transform.enrich_names.unwrap_or(defaults.enrich_names),
            strict_headers: self.transform.strict_headers.unwrap_or(defaults.strict_headers),
            audit_mode: self
                .load
                .audit_mode
                .as_deref()
                .and_then(AuditMode::parse)
                .unwrap_or(defaults.audit_mode),
            highlight_blank: self.load.highlight_blank.unwrap_or(defaults.highlight_blank),
            output_formats: parse_output_formats(&self.load.output_formats),
            bundle_zip: self.bundle_name(),
            aligned_name: filenames
                .and_then(|f| f.aligned.clone())
                .unwrap_or(defaults.aligned_name),
            audit_name: filenames
                .and_then(|f| f.audit.clone())
                .unwrap_or(defaults.audit_name),
            report_name: filenames
                .and_then(|f| f.report.clone())
                .unwrap_or(defaults.report_name),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
