//! Office Open XML (.xlsx) reader. Only the first worksheet is read.

use crate::domain::model::CellValue;
use crate::spreadsheet::reference::{reference_to_index, MAX_COLUMNS, MAX_ROWS};
use crate::spreadsheet::xml::{match_xml_events, push_bytes_ref, XmlNodeHelper, XmlReader};
use crate::utils::error::{AlignError, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHEET: QName = QName(b"sheet");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// 儲存格在工作表 XML 中宣告的型別 (`t` 屬性)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    Error,
    IsoDate,
}

impl CellKind {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") | Some("str") => CellKind::InlineString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            Some("d") => CellKind::IsoDate,
            _ => CellKind::Number,
        }
    }
}

struct PendingCell {
    row: usize,
    col: usize,
    kind: CellKind,
    style: Option<usize>,
}

/// 讀取第一張工作表，回傳逐列的儲存格
pub(crate) fn read_xlsx(file_name: &str, bytes: &[u8]) -> Result<Vec<Vec<CellValue>>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AlignError::spreadsheet(file_name, format!("not a valid .xlsx archive ({})", e)))?;

    let (sheet_path, is_1904) = load_first_sheet(&mut zip, file_name)?;
    let shared_strings = load_shared_strings(&mut zip)?;
    let date_styles = load_date_styles(&mut zip)?;

    let sheet = read_part(&mut zip, &sheet_path)?
        .ok_or_else(|| AlignError::spreadsheet(file_name, format!("missing worksheet part {}", sheet_path)))?;
    tracing::debug!("Reading worksheet {} from {} ({} bytes)", sheet_path, file_name, sheet.len());

    let context = SheetContext {
        file_name,
        shared_strings: &shared_strings,
        date_styles: &date_styles,
        is_1904,
    };
    context.parse(&sheet)
}

/// 依名稱讀出壓縮檔內的檔案；大小寫與路徑分隔符不敏感
fn read_part<R: Read + Seek>(zip: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    let pattern = name.replace('\\', "/");
    let path = zip
        .file_names()
        .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
        .map(str::to_owned);
    let Some(path) = path else {
        return Ok(None);
    };

    let mut file = zip.by_name(&path)?;
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    Ok(Some(data))
}

fn to_zip_path(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else if target.starts_with("xl/") {
        target.to_string()
    } else {
        format!("xl/{}", target)
    }
}

fn load_relationships<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<HashMap<String, String>> {
    let mut relationships = HashMap::new();
    let Some(data) = read_part(zip, "xl/_rels/workbook.xml.rels")? else {
        return Ok(relationships);
    };

    let mut reader = XmlReader::new(data.as_slice());
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// 回傳第一張工作表的路徑以及是否採用 1904 日期系統
fn load_first_sheet<R: Read + Seek>(zip: &mut ZipArchive<R>, file_name: &str) -> Result<(String, bool)> {
    let relationships = load_relationships(zip)?;
    let data = read_part(zip, "xl/workbook.xml")?
        .ok_or_else(|| AlignError::spreadsheet(file_name, "missing xl/workbook.xml"))?;

    let mut first_sheet = None::<String>;
    let mut is_1904 = false;
    let mut reader = XmlReader::new(data.as_slice());
    match_xml_events!(reader => {
        Event::Start(event) if first_sheet.is_none() && event.name() == TAG_SHEET => {
            for attribute in event.attributes() {
                let attribute = attribute?;
                if attribute.key.local_name().as_ref() == b"id" {
                    let id = attribute.unescape_value()?;
                    first_sheet = relationships.get(&*id).cloned();
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });

    let path = first_sheet.unwrap_or_else(|| "xl/worksheets/sheet1.xml".to_string());
    Ok((path, is_1904))
}

fn load_shared_strings<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let Some(data) = read_part(zip, "xl/sharedStrings.xml")? else {
        return Ok(strings);
    };

    let mut current = String::new();
    let mut is_phonetic = false;
    let mut is_text = false;
    let mut reader = XmlReader::new(data.as_slice());
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => current.clear(),
        Event::End(event) if event.name() == TAG_SHARED_STRING_ITEM => strings.push(std::mem::take(&mut current)),
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic = false,
        Event::Start(event) if !is_phonetic && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => current.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => current.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => push_bytes_ref(&mut current, &event)?,
    });
    Ok(strings)
}

/// 內建的日期/時間格式代碼
fn is_builtin_date_format(id: &str) -> bool {
    matches!(
        id,
        "14" | "15" | "16" | "17" | "18" | "19" | "20" | "21" | "22" | "45" | "46" | "47"
    )
}

/// 自訂格式中出現 y/d/h/s（引號與中括號以外）即視為日期時間
fn is_custom_date_format(format: &str) -> bool {
    let mut is_escaped = false;
    let mut is_literal = false;
    let mut is_bracket = false;
    for character in format.chars() {
        match character {
            _ if is_escaped => is_escaped = false,
            '_' | '\\' => is_escaped = true,
            '"' => is_literal = !is_literal,
            _ if is_literal => (),
            '[' => is_bracket = true,
            ']' => is_bracket = false,
            _ if is_bracket => (),
            'Y' | 'y' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => return true,
            _ => (),
        }
    }
    false
}

/// 以樣式索引查詢該格是否為日期格式
fn load_date_styles<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Vec<bool>> {
    let mut date_styles = Vec::new();
    let Some(data) = read_part(zip, "xl/styles.xml")? else {
        return Ok(date_styles);
    };

    let mut custom_formats = HashMap::<String, bool>::new();
    let mut in_custom_formats = false;
    let mut in_format_indexes = false;
    let mut reader = XmlReader::new(data.as_slice());
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => in_custom_formats = false,
        Event::Start(event) if in_custom_formats && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let code = event.get_attribute_value("formatCode")?;
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id.to_string(), is_custom_date_format(&code));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => in_format_indexes = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => in_format_indexes = false,
        Event::Start(event) if in_format_indexes && event.name() == TAG_FORMAT_INDEX => {
            let is_date = event
                .get_attribute_value("numFmtId")?
                .map(|id| {
                    custom_formats
                        .get(&*id)
                        .copied()
                        .unwrap_or_else(|| is_builtin_date_format(&id))
                })
                .unwrap_or(false);
            date_styles.push(is_date);
        }
    });
    Ok(date_styles)
}

/// Excel 序列日期轉換；1900 系統以 1899-12-30 為基準
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    let base = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let seconds = (serial * 86_400.0).round();
    if !seconds.is_finite() {
        return None;
    }
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_seconds(seconds as i64)?)
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

struct SheetContext<'a> {
    file_name: &'a str,
    shared_strings: &'a [String],
    date_styles: &'a [bool],
    is_1904: bool,
}

impl SheetContext<'_> {
    fn parse(&self, data: &[u8]) -> Result<Vec<Vec<CellValue>>> {
        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        let mut next_row = 0usize;
        let mut current_row = 0usize;
        let mut next_col = 0usize;
        let mut pending = None::<PendingCell>;
        let mut in_inline = false;
        let mut capture = false;
        let mut value = String::new();

        let mut reader = XmlReader::new(data);
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                current_row = match event.get_attribute_value("r")? {
                    Some(r) => r
                        .parse::<usize>()
                        .ok()
                        .filter(|r| (1..=MAX_ROWS).contains(r))
                        .map(|r| r - 1)
                        .ok_or_else(|| {
                            AlignError::spreadsheet(self.file_name, format!("invalid row number '{}'", r))
                        })?,
                    None => next_row,
                };
                next_row = current_row + 1;
                next_col = 0;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                let (row, col) = match event.get_attribute_value("r")? {
                    Some(reference) => reference_to_index(&reference).ok_or_else(|| {
                        AlignError::spreadsheet(
                            self.file_name,
                            format!("invalid cell reference '{}'", reference),
                        )
                    })?,
                    None => (current_row, next_col),
                };
                // 沒有 r 屬性時依位置推算，也不能超出工作表範圍
                if row >= MAX_ROWS || col >= MAX_COLUMNS {
                    return Err(AlignError::spreadsheet(
                        self.file_name,
                        format!("cell at row {} column {} is outside the sheet limits", row + 1, col + 1),
                    ));
                }
                next_col = col + 1;
                let kind = CellKind::parse(event.get_attribute_value("t")?.as_deref());
                let style = event
                    .get_attribute_value("s")?
                    .and_then(|s| s.parse::<usize>().ok());
                pending = Some(PendingCell { row, col, kind, style });
                value.clear();
            }
            Event::Start(event) if event.name() == TAG_VALUE => capture = true,
            Event::End(event) if event.name() == TAG_VALUE => capture = false,
            Event::Start(event) if event.name() == TAG_INLINE_STRING => in_inline = true,
            Event::End(event) if event.name() == TAG_INLINE_STRING => in_inline = false,
            Event::Start(event) if in_inline && event.name() == TAG_TEXT => capture = true,
            Event::End(event) if in_inline && event.name() == TAG_TEXT => capture = false,
            Event::Text(event) if capture => value.push_str(&event.xml_content()?),
            Event::CData(event) if capture => value.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if capture => push_bytes_ref(&mut value, &event)?,
            Event::End(event) if event.name() == TAG_CELL => {
                if let Some(cell) = pending.take() {
                    let cell_value = self.convert(&cell, &value)?;
                    if !matches!(cell_value, CellValue::Empty) {
                        if rows.len() <= cell.row {
                            rows.resize_with(cell.row + 1, Vec::new);
                        }
                        let row = &mut rows[cell.row];
                        if row.len() <= cell.col {
                            row.resize(cell.col + 1, CellValue::Empty);
                        }
                        row[cell.col] = cell_value;
                    }
                }
                value.clear();
                capture = false;
            }
        });
        Ok(rows)
    }

    fn convert(&self, cell: &PendingCell, value: &str) -> Result<CellValue> {
        if value.is_empty() && cell.kind != CellKind::InlineString {
            return Ok(CellValue::Empty);
        }

        let converted = match cell.kind {
            CellKind::SharedString => {
                let index = value.trim().parse::<usize>().ok();
                match index.and_then(|i| self.shared_strings.get(i)) {
                    Some(text) => CellValue::Text(text.clone()),
                    None => {
                        return Err(AlignError::spreadsheet(
                            self.file_name,
                            format!("invalid shared string index '{}'", value),
                        ))
                    }
                }
            }
            CellKind::InlineString | CellKind::Error => CellValue::Text(value.to_string()),
            CellKind::Boolean => CellValue::Bool(value.trim() == "1"),
            CellKind::IsoDate => parse_iso_datetime(value.trim())
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(value.to_string())),
            CellKind::Number => match value.trim().parse::<f64>() {
                Ok(number) => {
                    let is_date = cell
                        .style
                        .and_then(|style| self.date_styles.get(style))
                        .copied()
                        .unwrap_or(false);
                    match is_date.then(|| serial_to_datetime(number, self.is_1904)).flatten() {
                        Some(datetime) => CellValue::DateTime(datetime),
                        None => CellValue::Number(number),
                    }
                }
                Err(_) => CellValue::Text(value.to_string()),
            },
        };
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_xlsx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Comps" sheetId="1" r:id="rId1"/><sheet name="Other" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>Buyer Name</t></si>
<si><r><t>Sale </t></r><r><t>Date</t></r></si>
<si><t>Smith &amp; Co</t><rPh sb="0" eb="1"><t>ignored</t></rPh></si>
</sst>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="[$-409]mmm d, yyyy"/></numFmts>
<cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs>
<cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="4"/></cellXfs>
</styleSheet>"#;

    const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="D1" t="inlineStr"><is><t>Price</t></is></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2" s="1"><v>45352</v></c><c r="C2" t="b"><v>1</v></c><c r="D2" s="2"><v>500000</v></c></row>
<row r="4"><c r="A4" t="str"><f>A2</f><v>x &lt; y</v></c><c r="D4" t="e"><v>#N/A</v></c></row>
</sheetData>
</worksheet>"#;

    #[test]
    fn test_reads_first_sheet_with_types() {
        let bytes = build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/sharedStrings.xml", SHARED),
            ("xl/styles.xml", STYLES),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>"),
        ]);

        let rows = read_xlsx("comps.xlsx", &bytes).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            vec![
                CellValue::text("Buyer Name"),
                CellValue::text("Sale Date"),
                CellValue::Empty,
                CellValue::text("Price"),
            ]
        );
        assert_eq!(rows[1][0], CellValue::text("Smith & Co"));
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(rows[1][1], CellValue::DateTime(expected));
        assert_eq!(rows[1][2], CellValue::Bool(true));
        assert_eq!(rows[1][3], CellValue::Number(500000.0));
        assert!(rows[2].is_empty());
        assert_eq!(rows[3][0], CellValue::text("x < y"));
        assert_eq!(rows[3][3], CellValue::text("#N/A"));
    }

    fn sheet_with_rows(rows: &str) -> Vec<u8> {
        let sheet = format!(
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            rows
        );
        build_xlsx(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/worksheets/sheet1.xml", &sheet),
        ])
    }

    #[test]
    fn test_rejects_references_beyond_sheet_limits() {
        for rows in [
            r#"<row r="1"><c r="AAAAAAAAAAAAAAAA1" t="inlineStr"><is><t>x</t></is></c></row>"#,
            r#"<row r="1"><c r="A4000000000"><v>1</v></c></row>"#,
            r#"<row r="4000000000"><c><v>1</v></c></row>"#,
        ] {
            let err = read_xlsx("comps.xlsx", &sheet_with_rows(rows)).unwrap_err();
            match err {
                AlignError::SpreadsheetError { file, .. } => assert_eq!(file, "comps.xlsx"),
                other => panic!("unexpected error: {}", other),
            }
        }

        let rows = read_xlsx(
            "comps.xlsx",
            &sheet_with_rows(r#"<row r="2"><c r="C2"><v>7</v></c></row>"#),
        )
        .unwrap();
        assert_eq!(rows[1], vec![CellValue::Empty, CellValue::Empty, CellValue::Number(7.0)]);
    }

    #[test]
    fn test_rejects_non_zip_input() {
        let err = read_xlsx("comps.xlsx", b"Buyer Name,Price\n").unwrap_err();
        assert!(matches!(err, AlignError::SpreadsheetError { .. }));
    }

    #[test]
    fn test_custom_date_format_detection() {
        assert!(is_custom_date_format("yyyy-mm-dd"));
        assert!(is_custom_date_format("[$-409]h:mm AM/PM"));
        assert!(!is_custom_date_format("#,##0.00"));
        assert!(!is_custom_date_format("\"Days\" 0"));
        assert!(!is_custom_date_format("[Red]0.00"));
    }

    #[test]
    fn test_serial_dates() {
        let date = serial_to_datetime(45352.5, false).unwrap();
        assert_eq!(date.to_string(), "2024-03-01 12:00:00");
        let date = serial_to_datetime(0.0, true).unwrap();
        assert_eq!(date.to_string(), "1904-01-01 00:00:00");
    }
}
