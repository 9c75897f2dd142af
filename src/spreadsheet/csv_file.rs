use crate::domain::model::{CellValue, Table};
use crate::utils::error::{AlignError, Result};

/// CSV 沒有型別，只有轉成數字後寫回仍是原字串的欄位才視為 Number。
/// "02134"、"1e3" 之類維持原文字。
fn infer_cell(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }

    match field.parse::<f64>() {
        Ok(number) if number.is_finite() && CellValue::Number(number).to_string() == field => {
            CellValue::Number(number)
        }
        _ => CellValue::Text(field.to_string()),
    }
}

pub(crate) fn read_csv(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(infer_cell).collect());
    }
    Ok(rows)
}

pub(crate) fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns().iter().map(|c| c.name.as_str()))?;
    for index in 0..table.row_count() {
        writer.write_record(table.row(index).iter().map(|v| v.to_string()))?;
    }
    writer.into_inner().map_err(|e| AlignError::ProcessingError {
        message: format!("Failed to flush CSV output: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_infers_numbers() {
        let rows = read_csv(b"Buyer Name,Sale Price,Zip\nJane,500000,-\nAcme,,inf\n").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], CellValue::Number(500000.0));
        assert_eq!(rows[1][2], CellValue::text("-"));
        assert_eq!(rows[2][1], CellValue::Empty);
        assert_eq!(rows[2][2], CellValue::text("inf"));
    }

    #[test]
    fn test_read_csv_keeps_identifier_text() {
        let rows = read_csv(b"Zip,Parcel,Price,Rate
02134,1e3,-12.5,+5
").unwrap();

        assert_eq!(rows[1][0], CellValue::text("02134"));
        assert_eq!(rows[1][1], CellValue::text("1e3"));
        assert_eq!(rows[1][2], CellValue::Number(-12.5));
        assert_eq!(rows[1][3], CellValue::text("+5"));
    }

    #[test]
    fn test_write_csv_uses_string_forms() {
        let table = Table::from_rows(
            vec!["Buyer.Name".to_string(), "Price".to_string()],
            vec![vec!["Smith, Jane".into(), 500000.0.into()], vec![CellValue::Empty, 1.5.into()]],
        );

        let output = String::from_utf8(write_csv(&table).unwrap()).unwrap();
        assert_eq!(output, "Buyer.Name,Price\n\"Smith, Jane\",500000\n,1.5\n");
    }
}
