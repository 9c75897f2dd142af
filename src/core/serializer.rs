//! 產出三個彼此獨立的檔案：對齊後資料、對照稽核表、執行報告。
//! 任一檔案失敗只記錄下來，其餘照常產生。

use crate::core::report::RunReport;
use crate::domain::model::{
    AlignOptions, AlignResult, Artifact, ArtifactKind, AuditMode, CellValue, MappingTable,
    OutputFormat, RunArtifacts, Table, BLANK_NO_MATCH,
};
use crate::spreadsheet::{highlight_rows, write_table};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const STATUS_COLUMN: &str = "status";

#[derive(Debug, Clone)]
pub struct OutputSerializer {
    options: AlignOptions,
    template_header_column: String,
    source_header_column: String,
}

impl OutputSerializer {
    pub fn new(options: AlignOptions, template_header_column: &str, source_header_column: &str) -> Self {
        Self {
            options,
            template_header_column: template_header_column.to_string(),
            source_header_column: source_header_column.to_string(),
        }
    }

    pub fn serialize(&self, result: &AlignResult, mapping: &MappingTable, report: &RunReport) -> RunArtifacts {
        let mut artifacts = RunArtifacts::default();

        for &format in &self.options.output_formats {
            match self.aligned(result, format) {
                Ok(artifact) => artifacts.aligned.push(artifact),
                Err(e) => {
                    tracing::error!("Failed to write aligned {} output: {}", format.extension(), e);
                    artifacts.failures.push((ArtifactKind::Aligned, e.to_string()));
                }
            }

            match self.audit(result, mapping, format) {
                Ok(artifact) => artifacts.audit.push(artifact),
                Err(e) => {
                    tracing::error!("Failed to write mapping audit {} output: {}", format.extension(), e);
                    artifacts.failures.push((ArtifactKind::Audit, e.to_string()));
                }
            }
        }

        artifacts.report = Some(Artifact {
            file_name: self.options.report_name.clone(),
            bytes: report.render().into_bytes(),
        });

        artifacts
    }

    fn aligned(&self, result: &AlignResult, format: OutputFormat) -> Result<Artifact> {
        let bytes = write_table(&result.destination, format, &HashSet::new())?;
        Ok(Artifact {
            file_name: format!("{}.{}", self.options.aligned_name, format.extension()),
            bytes,
        })
    }

    fn audit(&self, result: &AlignResult, mapping: &MappingTable, format: OutputFormat) -> Result<Artifact> {
        let file_name = format!("{}.{}", self.options.audit_name, format.extension());
        let table = match self.options.audit_mode {
            AuditMode::Status => self.status_table(result),
            AuditMode::Echo => self.echo_table(mapping),
        };

        let mut bytes = write_table(&table, format, &HashSet::new())?;
        if format == OutputFormat::Xlsx
            && self.options.audit_mode == AuditMode::Status
            && self.options.highlight_blank
        {
            bytes = highlight_rows(&file_name, &bytes, STATUS_COLUMN, BLANK_NO_MATCH)?;
        }

        Ok(Artifact { file_name, bytes })
    }

    /// 每條規則一列：目的標題、原始運算式、解析狀態
    pub fn status_table(&self, result: &AlignResult) -> Table {
        let rows = result
            .outcomes
            .iter()
            .map(|outcome| {
                vec![
                    CellValue::text(outcome.rule.destination_header.clone()),
                    CellValue::from(outcome.rule.source_expression.clone()),
                    CellValue::text(outcome.status.to_string()),
                ]
            })
            .collect();

        Table::from_rows(
            vec![
                self.template_header_column.clone(),
                self.source_header_column.clone(),
                STATUS_COLUMN.to_string(),
            ],
            rows,
        )
    }

    pub fn echo_table(&self, mapping: &MappingTable) -> Table {
        let rows = mapping
            .rules
            .iter()
            .map(|rule| {
                vec![
                    CellValue::text(rule.destination_header.clone()),
                    CellValue::from(rule.source_expression.clone()),
                ]
            })
            .collect();

        Table::from_rows(
            vec![
                self.template_header_column.clone(),
                self.source_header_column.clone(),
            ],
            rows,
        )
    }
}

/// 將所有產出打包成單一 zip
pub fn bundle(artifacts: &RunArtifacts) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for artifact in artifacts.all() {
        zip.start_file(artifact.file_name.as_str(), options)?;
        zip.write_all(&artifact.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
