//! 啟動時載入一次的參考資料：對照表與（選用的）目的範本標題列。

use crate::domain::model::{CellValue, MappingRule, MappingTable, Table};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::spreadsheet::{read_grid, table_from_grid};
use crate::utils::error::{AlignError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceData {
    pub mapping: MappingTable,
    pub template_headers: Option<Vec<String>>,
}

impl ReferenceData {
    pub fn new(mapping: MappingTable, template_headers: Option<Vec<String>>) -> Self {
        Self {
            mapping,
            template_headers,
        }
    }

    pub async fn load<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<Self> {
        let mapping_path = config
            .mapping_file()
            .ok_or_else(|| AlignError::MissingInputError {
                what: "mapping table (no mapping file configured)".to_string(),
            })?;

        let bytes = read_input(storage, "mapping table", mapping_path).await?;
        let table = table_from_grid(read_grid(mapping_path, &bytes)?, true);
        let mapping = parse_mapping(
            &table,
            config.template_header_column(),
            config.source_header_column(),
        )?;
        tracing::info!("Loaded {} mapping rules from {}", mapping.len(), mapping_path);

        let template_headers = match config.template_file() {
            Some(template_path) => {
                let bytes = read_input(storage, "destination template", template_path).await?;
                let headers = template_headers(&read_grid(template_path, &bytes)?);
                tracing::info!("Loaded {} template columns from {}", headers.len(), template_path);
                Some(headers)
            }
            None => None,
        };

        Ok(Self::new(mapping, template_headers))
    }
}

/// 讀取必要輸入檔；檔案不存在時回報為缺少輸入
pub async fn read_input<S: Storage>(storage: &S, what: &str, path: &str) -> Result<Vec<u8>> {
    storage.read_file(path).await.map_err(|error| match error {
        AlignError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            AlignError::MissingInputError {
                what: format!("{} (file '{}' not found)", what, path),
            }
        }
        other => other,
    })
}

/// 從已修剪標題的表格取出規則；兩欄皆空白的列略過
pub fn parse_mapping(table: &Table, header_column: &str, expression_column: &str) -> Result<MappingTable> {
    let headers = required_column(table, header_column)?;
    let expressions = required_column(table, expression_column)?;

    let rules = headers
        .iter()
        .zip(expressions)
        .filter(|(header, expression)| !(header.is_empty() && expression.is_empty()))
        .map(|(header, expression)| MappingRule {
            destination_header: header.to_string(),
            source_expression: if expression.is_empty() {
                None
            } else {
                Some(expression.to_string())
            },
        })
        .collect();

    Ok(MappingTable::new(rules))
}

fn required_column<'a>(table: &'a Table, name: &str) -> Result<&'a [CellValue]> {
    table.values(name).ok_or_else(|| AlignError::MappingTableError {
        message: format!(
            "missing column '{}'; found: {}",
            name,
            table.column_names().join(", ")
        ),
    })
}

fn template_headers(grid: &[Vec<CellValue>]) -> Vec<String> {
    grid.first()
        .map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .filter(|header| !header.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_source() -> Table {
        Table::from_rows(
            vec!["Template Header".to_string(), "CoStar data header".to_string()],
            vec![
                vec!["Buyer Name".into(), "Buyer.Name".into()],
                vec!["Notes".into(), CellValue::Empty],
                vec![CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, "Orphan".into()],
            ],
        )
    }

    #[test]
    fn test_parse_mapping_keeps_rule_order() {
        let mapping = parse_mapping(&mapping_source(), "Template Header", "CoStar data header").unwrap();

        assert_eq!(
            mapping.rules,
            vec![
                MappingRule::new("Buyer Name", Some("Buyer.Name")),
                MappingRule::new("Notes", None),
                MappingRule::new("", Some("Orphan")),
            ]
        );
    }

    #[test]
    fn test_missing_column_lists_found_headers() {
        let error = parse_mapping(&mapping_source(), "Template Header", "Source").unwrap_err();

        match error {
            AlignError::MappingTableError { message } => {
                assert!(message.contains("'Source'"));
                assert!(message.contains("Template Header, CoStar data header"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_template_headers_use_first_row_only() {
        let grid = vec![
            vec![" Buyer Name ".into(), CellValue::Empty, "Price".into()],
            vec!["x".into(), "y".into(), "z".into()],
        ];

        assert_eq!(template_headers(&grid), vec!["Buyer Name", "Price"]);
        assert!(template_headers(&[]).is_empty());
    }
}
