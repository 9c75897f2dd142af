use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 試算表中的單一儲存格值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(number) => {
                if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
                    write!(f, "{}", *number as i64)
                } else {
                    write!(f, "{}", number)
                }
            }
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// 以欄為主的表格；所有欄長度皆等於 row_count
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            row_count,
        }
    }

    /// 由標題列與資料列建立表格，短列以 Empty 補齊
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let row_count = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column {
                name,
                values: Vec::with_capacity(row_count),
            })
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(cells.next().unwrap_or_default());
            }
        }

        Self { columns, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn values(&self, name: &str) -> Option<&[CellValue]> {
        self.column(name).map(|c| c.values.as_slice())
    }

    /// 寫入欄位；同名欄位就地覆寫並保留原位置。回傳是否覆寫了既有欄位
    pub fn set_column(&mut self, name: &str, mut values: Vec<CellValue>) -> bool {
        values.resize(self.row_count, CellValue::Empty);
        match self.column_mut(name) {
            Some(column) => {
                column.values = values;
                true
            }
            None => {
                self.columns.push(Column {
                    name: name.to_string(),
                    values,
                });
                false
            }
        }
    }

    pub fn blank_column(&self) -> Vec<CellValue> {
        vec![CellValue::text(""); self.row_count]
    }

    pub fn row(&self, index: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }
}

/// 對照表中的一列：目的欄位 <- 來源運算式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    pub destination_header: String,
    pub source_expression: Option<String>,
}

impl MappingRule {
    pub fn new(destination_header: &str, source_expression: Option<&str>) -> Self {
        Self {
            destination_header: destination_header.to_string(),
            source_expression: source_expression.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MappingTable {
    pub rules: Vec<MappingRule>,
}

impl MappingTable {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    Matched,
    Combined { used: usize, requested: usize },
    NoMatch,
    Unmapped,
    EmptyHeader,
}

impl RuleStatus {
    pub fn is_blank(&self) -> bool {
        matches!(self, RuleStatus::NoMatch | RuleStatus::Unmapped)
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleStatus::Matched => f.write_str("MATCHED"),
            RuleStatus::Combined { used, requested } => {
                write!(f, "COMBINED ({} of {})", used, requested)
            }
            RuleStatus::NoMatch => f.write_str(BLANK_NO_MATCH),
            RuleStatus::Unmapped => f.write_str("BLANK (unmapped)"),
            RuleStatus::EmptyHeader => f.write_str("SKIPPED (empty header)"),
        }
    }
}

/// 稽核表中需要人工檢查的狀態字串
pub const BLANK_NO_MATCH: &str = "BLANK (no match)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: MappingRule,
    pub destination: String,
    pub status: RuleStatus,
}

#[derive(Debug, Clone)]
pub struct AlignResult {
    pub source_name: String,
    pub destination: Table,
    pub outcomes: Vec<RuleOutcome>,
    pub duplicate_headers: Vec<String>,
    pub enriched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xlsx" => Some(OutputFormat::Xlsx),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// 每條規則一列，附解析狀態
    #[default]
    Status,
    /// 原樣輸出對照表
    Echo,
}

impl AuditMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Some(AuditMode::Status),
            "echo" => Some(AuditMode::Echo),
            _ => None,
        }
    }
}

/// 單次執行的行為選項
#[derive(Debug, Clone, PartialEq)]
pub struct AlignOptions {
    pub enrich_names: bool,
    pub strict_headers: bool,
    pub audit_mode: AuditMode,
    pub highlight_blank: bool,
    pub output_formats: Vec<OutputFormat>,
    pub bundle_zip: Option<String>,
    pub aligned_name: String,
    pub audit_name: String,
    pub report_name: String,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            enrich_names: false,
            strict_headers: false,
            audit_mode: AuditMode::Status,
            highlight_blank: true,
            output_formats: vec![OutputFormat::Xlsx],
            bundle_zip: None,
            aligned_name: "aligned".to_string(),
            audit_name: "mapping_audit".to_string(),
            report_name: "run_report.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Aligned,
    Audit,
    Report,
}

/// 一次執行的產出；由呼叫端保存以供下載
#[derive(Debug, Clone, Default)]
pub struct RunArtifacts {
    pub aligned: Vec<Artifact>,
    pub audit: Vec<Artifact>,
    pub report: Option<Artifact>,
    pub failures: Vec<(ArtifactKind, String)>,
    pub written: Vec<String>,
}

impl RunArtifacts {
    pub fn all(&self) -> impl Iterator<Item = &Artifact> {
        self.aligned
            .iter()
            .chain(self.audit.iter())
            .chain(self.report.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
