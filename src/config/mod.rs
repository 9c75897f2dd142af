pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{AlignOptions, AuditMode, OutputFormat};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_file_extension, validate_one_of, validate_path, validate_required_input, Validate,
    SPREADSHEET_EXTENSIONS,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPLATE_HEADER_COLUMN: &str = "Template Header";
pub const DEFAULT_SOURCE_HEADER_COLUMN: &str = "CoStar data header";
pub const DEFAULT_BUNDLE_NAME: &str = "comps_output.zip";

pub const OUTPUT_FORMATS: &[&str] = &["xlsx", "csv"];
pub const AUDIT_MODES: &[&str] = &["status", "echo"];
pub const LOG_FORMATS: &[&str] = &["compact", "json"];

/// 將格式字串轉為 OutputFormat，無法辨識的略過、重複的去除
pub fn parse_output_formats(formats: &[String]) -> Vec<OutputFormat> {
    let mut parsed = Vec::new();
    for format in formats.iter().filter_map(|f| OutputFormat::parse(f)) {
        if !parsed.contains(&format) {
            parsed.push(format);
        }
    }
    if parsed.is_empty() {
        parsed.push(OutputFormat::Xlsx);
    }
    parsed
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    for format in formats {
        validate_one_of(field_name, &format.trim().to_ascii_lowercase(), OUTPUT_FORMATS)?;
    }
    Ok(())
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "comps-align")]
#[command(about = "Align a CoStar sale comps export to the RealNex import template")]
pub struct CliConfig {
    /// CoStar export (.xlsx or .csv)
    #[arg(long)]
    pub source: Option<String>,

    /// Mapping table with template and CoStar header columns
    #[arg(long)]
    pub mapping: Option<String>,

    /// Destination template; only the header row is used
    #[arg(long)]
    pub template: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_TEMPLATE_HEADER_COLUMN)]
    pub template_header_column: String,

    #[arg(long, default_value = DEFAULT_SOURCE_HEADER_COLUMN)]
    pub source_header_column: String,

    #[arg(long, help = "Derive first/last/full name and agent name columns")]
    pub enrich: bool,

    #[arg(long, help = "Fail on duplicate template headers")]
    pub strict: bool,

    #[arg(long, default_value = "status")]
    pub audit_mode: String,

    #[arg(long, help = "Do not highlight unmatched rules in the audit workbook")]
    pub no_highlight: bool,

    #[arg(long, value_delimiter = ',', default_value = "xlsx")]
    pub format: Vec<String>,

    #[arg(long, help = "Also bundle every output into comps_output.zip")]
    pub zip: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, default_value = "compact")]
    pub log_format: String,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source_file(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn mapping_file(&self) -> Option<&str> {
        self.mapping.as_deref()
    }

    fn template_file(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn template_header_column(&self) -> &str {
        &self.template_header_column
    }

    fn source_header_column(&self) -> &str {
        &self.source_header_column
    }

    fn options(&self) -> AlignOptions {
        AlignOptions {
            enrich_names: self.enrich,
            strict_headers: self.strict,
            audit_mode: AuditMode::parse(&self.audit_mode).unwrap_or_default(),
            highlight_blank: !self.no_highlight,
            output_formats: parse_output_formats(&self.format),
            bundle_zip: self.zip.then(|| DEFAULT_BUNDLE_NAME.to_string()),
            ..AlignOptions::default()
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let source = validate_required_input("source export (--source)", &self.source)?;
        validate_file_extension("source", source, SPREADSHEET_EXTENSIONS)?;

        let mapping = validate_required_input("mapping table (--mapping)", &self.mapping)?;
        validate_file_extension("mapping", mapping, SPREADSHEET_EXTENSIONS)?;

        if let Some(template) = &self.template {
            validate_file_extension("template", template, SPREADSHEET_EXTENSIONS)?;
        }

        validate_path("output_path", &self.output_path)?;
        validate_output_formats("format", &self.format)?;
        validate_one_of("audit_mode", &self.audit_mode.to_ascii_lowercase(), AUDIT_MODES)?;
        validate_one_of("log_format", &self.log_format, LOG_FORMATS)?;

        Ok(())
    }
}
