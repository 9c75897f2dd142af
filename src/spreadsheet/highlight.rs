//! 稽核檔後處理：標出需要人工檢查的列

use crate::spreadsheet::{read_table, writer::write_xlsx};
use crate::utils::error::Result;
use std::collections::HashSet;

/// 重新輸出已序列化的活頁簿，`column` 欄等於 `value` 的列加上黃底。
/// 找不到該欄時原樣回傳。
pub fn highlight_rows(file_name: &str, bytes: &[u8], column: &str, value: &str) -> Result<Vec<u8>> {
    let table = read_table(file_name, bytes)?;
    let Some(values) = table.values(column) else {
        tracing::debug!("No '{}' column in {}, nothing to highlight", column, file_name);
        return Ok(bytes.to_vec());
    };

    let rows: HashSet<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.to_string() == value)
        .map(|(index, _)| index)
        .collect();
    tracing::debug!("Highlighting {} row(s) of {} where {} = {}", rows.len(), file_name, column, value);

    write_xlsx(&table, "Sheet1", &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CellValue, Table, BLANK_NO_MATCH};
    use std::io::{Cursor, Read};

    #[test]
    fn test_only_matching_rows_are_filled() {
        let table = Table::from_rows(
            vec!["Template Header".to_string(), "status".to_string()],
            vec![
                vec!["Price".into(), "MATCHED".into()],
                vec!["Zoning".into(), BLANK_NO_MATCH.into()],
                vec!["Notes".into(), "BLANK (unmapped)".into()],
            ],
        );
        let bytes = write_xlsx(&table, "Sheet1", &HashSet::new()).unwrap();

        let highlighted = highlight_rows("mapping_audit.xlsx", &bytes, "status", BLANK_NO_MATCH).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(highlighted.as_slice())).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();
        assert!(sheet.contains(r#"<c r="A3" t="inlineStr" s="2">"#));
        assert!(sheet.contains(r#"<c r="B3" t="inlineStr" s="2">"#));
        assert!(!sheet.contains(r#"<c r="A2" t="inlineStr" s="2">"#));
        assert!(!sheet.contains(r#"<c r="A4" t="inlineStr" s="2">"#));

        let reread = read_table("mapping_audit.xlsx", &highlighted).unwrap();
        assert_eq!(reread.values("Template Header").unwrap()[1], CellValue::text("Zoning"));
    }

    #[test]
    fn test_missing_column_returns_input_unchanged() {
        let table = Table::from_rows(vec!["Template Header".to_string()], vec![vec!["Price".into()]]);
        let bytes = write_xlsx(&table, "Sheet1", &HashSet::new()).unwrap();

        let output = highlight_rows("mapping_audit.xlsx", &bytes, "status", BLANK_NO_MATCH).unwrap();
        assert_eq!(output, bytes);
    }
}
