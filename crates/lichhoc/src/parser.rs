use anyhow::{Context, Result};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::reader::Reader as XmlReader;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::types::{RawCell, RawRow};

/// Parse a timetable workbook into untyped rows.
///
/// Supports SpreadsheetML XML exports (.xls files with XML content) and
/// modern Excel formats (.xlsx, .xls, .xlsb, .ods). Only the first sheet is
/// read; its first row must be the column headers.
pub fn parse_workbook(path: &Path) -> Result<Vec<RawRow>> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    if looks_like_spreadsheet_ml(&bytes) {
        let content = String::from_utf8(bytes).context("SpreadsheetML file is not valid UTF-8")?;
        return parse_spreadsheet_ml(&content);
    }

    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    rows_from_sheets(&mut workbook)
}

/// Parse a workbook received as an in-memory byte buffer (file upload path).
pub fn parse_workbook_bytes(bytes: Vec<u8>) -> Result<Vec<RawRow>> {
    if looks_like_spreadsheet_ml(&bytes) {
        let content = String::from_utf8(bytes).context("SpreadsheetML file is not valid UTF-8")?;
        return parse_spreadsheet_ml(&content);
    }

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .context("Failed to open uploaded workbook")?;
    rows_from_sheets(&mut workbook)
}

/// SpreadsheetML exports are plain XML; real .xlsx files are zip archives.
fn looks_like_spreadsheet_ml(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(head) = std::str::from_utf8(head) else {
        return false;
    };
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<?xml") || head.contains("<Workbook")
}

/// Read the first sheet of an opened calamine workbook into raw rows.
fn rows_from_sheets<RS>(workbook: &mut calamine::Sheets<RS>) -> Result<Vec<RawRow>>
where
    RS: std::io::Read + std::io::Seek,
{
    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .context("Workbook has no sheets")?
        .clone();

    let range = workbook
        .worksheet_range(&sheet_name)
        .context("Failed to read worksheet")?;

    let cells: Vec<Vec<RawCell>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_raw).collect())
        .collect();

    build_rows(cells)
}

/// Convert a calamine cell into a loosely typed [`RawCell`].
///
/// Date/time cells stay numeric so the normalizer owns serial decoding.
fn cell_to_raw(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::text(s.trim()),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Float(f) => RawCell::Number(*f),
        Data::Bool(b) => RawCell::text(b.to_string()),
        Data::DateTime(dt) => RawCell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => RawCell::text(s.trim()),
        Data::DurationIso(s) => RawCell::text(s.trim()),
        Data::Error(_) => RawCell::Empty,
    }
}

/// Parse SpreadsheetML XML (used by older Excel exports) into raw rows,
/// preserving the `ss:Type="Number"` distinction on data cells.
fn parse_spreadsheet_ml(content: &str) -> Result<Vec<RawRow>> {
    let mut reader = XmlReader::from_str(content);
    // Trim at cell level instead, to preserve spaces around entities
    reader.config_mut().trim_text(false);

    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    let mut current_row: Vec<RawCell> = Vec::new();
    let mut in_row = false;
    let mut in_cell = false;
    let mut in_data = false;
    let mut data_is_number = false;
    let mut current_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Row" => {
                    in_row = true;
                    current_row = Vec::new();
                }
                b"Cell" => {
                    if in_row {
                        in_cell = true;
                    }
                }
                b"Data" => {
                    if in_cell {
                        in_data = true;
                        current_text.clear();
                        data_is_number = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.local_name().as_ref() == b"Type")
                            .and_then(|a| a.unescape_value().ok())
                            .map(|v| v == "Number" || v == "DateTime")
                            .unwrap_or(false);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"Row" => {
                    if in_row && !current_row.is_empty() {
                        rows.push(std::mem::take(&mut current_row));
                    }
                    in_row = false;
                }
                b"Cell" => {
                    if in_cell && !in_data {
                        // Empty cell
                        current_row.push(RawCell::Empty);
                    }
                    in_cell = false;
                }
                b"Data" => {
                    if in_data {
                        current_row.push(finish_data_cell(&current_text, data_is_number));
                        current_text.clear();
                    }
                    in_data = false;
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_data {
                    if let Ok(decoded) = e.decode() {
                        if let Ok(text) = unescape(&decoded) {
                            current_text.push_str(&text);
                        }
                    }
                }
            }
            Ok(Event::GeneralRef(e)) => {
                // Entity references like &amp;
                if in_data {
                    if let Ok(decoded) = e.decode() {
                        let resolved = match decoded.as_ref() {
                            "amp" => "&",
                            "lt" => "<",
                            "gt" => ">",
                            "quot" => "\"",
                            "apos" => "'",
                            _ => "",
                        };
                        current_text.push_str(resolved);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("XML parse error: {}", e),
            _ => {}
        }
    }

    build_rows(rows)
}

fn finish_data_cell(text: &str, is_number: bool) -> RawCell {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return RawCell::Empty;
    }
    if is_number {
        if let Ok(n) = trimmed.parse::<f64>() {
            return RawCell::Number(n);
        }
    }
    RawCell::text(trimmed)
}

/// Map header names to column indices.
///
/// Matching is case-insensitive and keyed on the Vietnamese export headers,
/// with accent-free and English fallbacks. First match wins per column.
fn map_columns(headers: &[String]) -> HashMap<&'static str, usize> {
    let mut indices = HashMap::new();

    for (i, header) in headers.iter().enumerate() {
        let lower = header.to_lowercase();

        if contains_any(&lower, &["tên học phần", "ten hoc phan", "course name"]) {
            indices.entry("course_name").or_insert(i);
        }

        if contains_any(&lower, &["mã hp", "ma hp", "mã học phần", "course code"]) {
            indices.entry("course_code").or_insert(i);
        }

        if contains_any(&lower, &["tiết học", "tiet hoc", "session"]) {
            indices.entry("session_label").or_insert(i);
        }

        if contains_any(&lower, &["ngày bắt đầu", "ngay bat dau", "start date"]) {
            indices.entry("start_date").or_insert(i);
        }

        if contains_any(&lower, &["ngày kết thúc", "ngay ket thuc", "end date"]) {
            indices.entry("end_date").or_insert(i);
        }

        // "thứ" is a substring of longer headers, so match it exactly
        if lower == "thứ" || lower == "thu" || lower == "weekday" {
            indices.entry("weekday").or_insert(i);
        }

        if contains_any(&lower, &["giờ bắt đầu", "gio bat dau", "start time"]) {
            indices.entry("start_time").or_insert(i);
        }

        if contains_any(&lower, &["giờ kết thúc", "gio ket thuc", "end time"]) {
            indices.entry("end_time").or_insert(i);
        }

        if contains_any(&lower, &["phòng học", "phong hoc", "room"]) {
            indices.entry("room").or_insert(i);
        }
    }

    indices
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Split header row from data rows and assemble [`RawRow`] records.
fn build_rows(cells: Vec<Vec<RawCell>>) -> Result<Vec<RawRow>> {
    if cells.is_empty() {
        anyhow::bail!("No data rows found in file");
    }

    let headers: Vec<String> = cells[0]
        .iter()
        .map(|c| match c {
            RawCell::Text(s) => s.clone(),
            RawCell::Number(n) => n.to_string(),
            RawCell::Empty => String::new(),
        })
        .collect();

    let indices = map_columns(&headers);

    let get = |row: &[RawCell], key: &str| -> RawCell {
        indices
            .get(key)
            .and_then(|&i| row.get(i))
            .cloned()
            .unwrap_or(RawCell::Empty)
    };

    let rows = cells
        .iter()
        .skip(1)
        .map(|row| RawRow {
            course_name: get(row, "course_name"),
            course_code: get(row, "course_code"),
            session_label: get(row, "session_label"),
            start_date: get(row, "start_date"),
            end_date: get(row, "end_date"),
            weekday: get(row, "weekday"),
            start_time: get(row, "start_time"),
            end_time: get(row, "end_time"),
            room: get(row, "room"),
        })
        .collect();

    Ok(rows)
}
