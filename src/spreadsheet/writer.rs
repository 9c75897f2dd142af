//! 輸出最小可用的 .xlsx 活頁簿（單一工作表、行內字串）

use crate::domain::model::{CellValue, Table};
use crate::spreadsheet::reference::index_to_reference;
use crate::utils::error::Result;
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// cellXfs: 0 預設, 1 日期時間, 2 黃底, 3 黃底日期時間
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/><xf numFmtId="22" fontId="0" fillId="2" borderId="0" xfId="0" applyNumberFormat="1" applyFill="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const STYLE_DATETIME: usize = 1;
const STYLE_HIGHLIGHT: usize = 2;

fn datetime_to_serial(value: &chrono::NaiveDateTime) -> Option<f64> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (*value - base).num_seconds();
    Some(seconds as f64 / 86_400.0)
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        quick_xml::escape::escape(sheet_name)
    )
}

struct SheetWriter {
    writer: Writer<Vec<u8>>,
}

impl SheetWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    fn start(&mut self, tag: BytesStart<'_>) -> Result<()> {
        self.writer.write_event(Event::Start(tag))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn cell(&mut self, row: usize, col: usize, value: &CellValue, highlighted: bool) -> Result<()> {
        let reference = index_to_reference(row, col);
        let base_style = if highlighted { STYLE_HIGHLIGHT } else { 0 };
        let mut tag = BytesStart::new("c");
        tag.push_attribute(("r", reference.as_str()));

        match value {
            CellValue::Empty => {
                if highlighted {
                    tag.push_attribute(("s", base_style.to_string().as_str()));
                    self.writer.write_event(Event::Empty(tag))?;
                }
                return Ok(());
            }
            CellValue::Text(text) if text.is_empty() => {
                if highlighted {
                    tag.push_attribute(("s", base_style.to_string().as_str()));
                    self.writer.write_event(Event::Empty(tag))?;
                }
                return Ok(());
            }
            CellValue::Number(number) if number.is_finite() => {
                if highlighted {
                    tag.push_attribute(("s", base_style.to_string().as_str()));
                }
                self.start(tag)?;
                self.start(BytesStart::new("v"))?;
                self.text(&number.to_string())?;
                self.end("v")?;
            }
            CellValue::Bool(flag) => {
                tag.push_attribute(("t", "b"));
                if highlighted {
                    tag.push_attribute(("s", base_style.to_string().as_str()));
                }
                self.start(tag)?;
                self.start(BytesStart::new("v"))?;
                self.text(if *flag { "1" } else { "0" })?;
                self.end("v")?;
            }
            CellValue::DateTime(datetime) if datetime_to_serial(datetime).is_some() => {
                let serial = datetime_to_serial(datetime).unwrap_or_default();
                tag.push_attribute(("s", (base_style + STYLE_DATETIME).to_string().as_str()));
                self.start(tag)?;
                self.start(BytesStart::new("v"))?;
                self.text(&serial.to_string())?;
                self.end("v")?;
            }
            other => {
                tag.push_attribute(("t", "inlineStr"));
                if highlighted {
                    tag.push_attribute(("s", base_style.to_string().as_str()));
                }
                self.start(tag)?;
                self.start(BytesStart::new("is"))?;
                self.start(BytesStart::new("t").with_attributes([("xml:space", "preserve")]))?;
                self.text(&other.to_string())?;
                self.end("t")?;
                self.end("is")?;
            }
        }
        self.end("c")
    }

    fn row(&mut self, row: usize, values: &[&CellValue], highlighted: bool) -> Result<()> {
        let row_number = (row + 1).to_string();
        self.start(BytesStart::new("row").with_attributes([("r", row_number.as_str())]))?;
        for (col, value) in values.iter().enumerate() {
            self.cell(row, col, value, highlighted)?;
        }
        self.end("row")
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn sheet_xml(table: &Table, highlighted_rows: &HashSet<usize>) -> Result<Vec<u8>> {
    let mut sheet = SheetWriter::new();
    sheet
        .writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    sheet.start(BytesStart::new("worksheet").with_attributes([(
        "xmlns",
        "http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    )]))?;
    sheet.start(BytesStart::new("sheetData"))?;

    let headers: Vec<CellValue> = table
        .columns()
        .iter()
        .map(|c| CellValue::Text(c.name.clone()))
        .collect();
    let header_refs: Vec<&CellValue> = headers.iter().collect();
    sheet.row(0, &header_refs, false)?;

    for index in 0..table.row_count() {
        sheet.row(index + 1, &table.row(index), highlighted_rows.contains(&index))?;
    }

    sheet.end("sheetData")?;
    sheet.end("worksheet")?;
    Ok(sheet.finish())
}

/// 將表格寫成 .xlsx；`highlighted_rows` 為資料列索引（不含標題列）
pub fn write_xlsx(table: &Table, sheet_name: &str, highlighted_rows: &HashSet<usize>) -> Result<Vec<u8>> {
    let sheet = sheet_xml(table, highlighted_rows)?;
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(ROOT_RELS.as_bytes())?;
    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook_xml(sheet_name).as_bytes())?;
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(WORKBOOK_RELS.as_bytes())?;
    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES.as_bytes())?;
    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(&sheet)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
