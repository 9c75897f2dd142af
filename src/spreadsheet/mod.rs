//! Spreadsheet input and output: `.xlsx` (first sheet) and `.csv`.

mod csv_file;
pub mod highlight;
mod reference;
mod writer;
mod xlsx;
mod xml;

use crate::domain::model::{CellValue, OutputFormat, Table};
use crate::utils::error::{AlignError, Result};
use std::collections::HashSet;
use std::path::Path;

pub use highlight::highlight_rows;
pub use writer::write_xlsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Xlsx,
    Csv,
}

impl SpreadsheetKind {
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(SpreadsheetKind::Xlsx),
            Some("csv") => Ok(SpreadsheetKind::Csv),
            _ => Err(AlignError::spreadsheet(
                file_name,
                "unsupported file type, expected .xlsx or .csv",
            )),
        }
    }
}

/// 讀取原始儲存格（第一列為標題列）
pub fn read_grid(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    match SpreadsheetKind::from_file_name(file_name)? {
        SpreadsheetKind::Xlsx => xlsx::read_xlsx(file_name, bytes),
        SpreadsheetKind::Csv => csv_file::read_csv(bytes),
    }
}

pub fn read_table(file_name: &str, bytes: &[u8]) -> Result<Table> {
    Ok(table_from_grid(read_grid(file_name, bytes)?, false))
}

/// 第一列當標題：空白標題命名為 `Unnamed: <i>`，重複標題加上 `.1`、`.2` 後綴。
/// 結尾的全空白列會被捨棄。
pub fn table_from_grid(mut grid: Vec<Vec<CellValue>>, trim_headers: bool) -> Table {
    if grid.is_empty() {
        return Table::new(0);
    }

    let header_row = grid.remove(0);
    while grid
        .last()
        .map(|row| row.iter().all(CellValue::is_empty))
        .unwrap_or(false)
    {
        grid.pop();
    }

    let width = grid
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header_row.len()))
        .max()
        .unwrap_or(0);

    let mut seen = HashSet::new();
    let headers = (0..width)
        .map(|index| {
            let raw = header_row.get(index).map(|cell| cell.to_string()).unwrap_or_default();
            let name = if trim_headers { raw.trim().to_string() } else { raw };
            let name = if name.is_empty() {
                format!("Unnamed: {}", index)
            } else {
                name
            };
            unique_name(name, &mut seen)
        })
        .collect();

    Table::from_rows(headers, grid)
}

fn unique_name(name: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(name.clone()) {
        return name;
    }
    let mut suffix = 1;
    loop {
        let candidate = format!("{}.{}", name, suffix);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

pub fn write_table(table: &Table, format: OutputFormat, highlighted_rows: &HashSet<usize>) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Xlsx => write_xlsx(table, "Sheet1", highlighted_rows),
        OutputFormat::Csv => csv_file::write_csv(table),
    }
}
