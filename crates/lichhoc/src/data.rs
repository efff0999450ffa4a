use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::normalize;
use crate::parser;
use crate::store;
use crate::types::TimetableEntry;

/// Workbook file extensions accepted for import.
const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsb", "ods"];

/// Import failure taxonomy. Every variant leaves the caller's previous
/// state untouched; none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    Parse(String),
    #[error("no valid rows in workbook")]
    NoValidRows,
    #[error("no workbook file in data directory")]
    NoWorkbook,
    #[error("failed to persist timetable: {0}")]
    Store(String),
}

/// Parse and normalize one workbook file into a fresh batch.
///
/// An upload that yields zero valid entries is an error, never an empty
/// replacement of existing data.
pub fn import_workbook(path: &Path) -> Result<Vec<TimetableEntry>, ImportError> {
    let rows = parser::parse_workbook(path).map_err(|e| ImportError::Parse(format!("{:#}", e)))?;
    finish_import(rows.len(), normalize::normalize(&rows))
}

/// [`import_workbook`] for an in-memory upload body.
pub fn import_bytes(bytes: Vec<u8>) -> Result<Vec<TimetableEntry>, ImportError> {
    let rows =
        parser::parse_workbook_bytes(bytes).map_err(|e| ImportError::Parse(format!("{:#}", e)))?;
    finish_import(rows.len(), normalize::normalize(&rows))
}

fn finish_import(
    raw_count: usize,
    entries: Vec<TimetableEntry>,
) -> Result<Vec<TimetableEntry>, ImportError> {
    if entries.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    info!(
        total = entries.len(),
        dropped = raw_count - entries.len(),
        "Workbook imported"
    );
    Ok(entries)
}

/// Startup path: the stored batch if present, otherwise the newest workbook
/// in the data directory. An empty data directory is an empty timetable.
pub fn load_or_import(data_dir: &Path) -> anyhow::Result<Vec<TimetableEntry>> {
    let stored = store::load(data_dir)?;
    if !stored.is_empty() {
        return Ok(stored);
    }

    match find_latest_workbook(data_dir) {
        Some(path) => {
            debug!(file = %path.display(), "No stored timetable, importing workbook");
            match import_workbook(&path) {
                Ok(entries) => {
                    store::save(data_dir, &entries)?;
                    Ok(entries)
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to import workbook");
                    Ok(Vec::new())
                }
            }
        }
        None => Ok(Vec::new()),
    }
}

/// Re-import from the newest workbook in the data directory and persist
/// the result.
pub fn refresh_from_dir(data_dir: &Path) -> Result<Vec<TimetableEntry>, ImportError> {
    let path = find_latest_workbook(data_dir).ok_or(ImportError::NoWorkbook)?;
    let entries = import_workbook(&path)?;
    store::save(data_dir, &entries).map_err(|e| ImportError::Store(format!("{:#}", e)))?;
    Ok(entries)
}

/// Whether a filename looks like a workbook we can import.
pub fn is_workbook_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    WORKBOOK_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// Newest workbook in the data directory, by filename order.
fn find_latest_workbook(data_dir: &Path) -> Option<PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(data_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .map(is_workbook_file)
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();

    files.sort();
    files.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workbook_xml(rows: &[(&str, &str, &str, &str, &str, &str)]) -> String {
        let header = r#"<Row>
<Cell><Data ss:Type="String">Tên Học Phần</Data></Cell>
<Cell><Data ss:Type="String">Mã HP</Data></Cell>
<Cell><Data ss:Type="String">Ngày Bắt Đầu</Data></Cell>
<Cell><Data ss:Type="String">Ngày Kết Thúc</Data></Cell>
<Cell><Data ss:Type="String">Thứ</Data></Cell>
<Cell><Data ss:Type="String">Giờ Bắt Đầu</Data></Cell>
</Row>"#;

        let mut body = String::from(header);
        for (name, code, start, end, thu, time) in rows {
            body.push_str(&format!(
                r#"<Row>
<Cell><Data ss:Type="String">{name}</Data></Cell>
<Cell><Data ss:Type="String">{code}</Data></Cell>
<Cell><Data ss:Type="String">{start}</Data></Cell>
<Cell><Data ss:Type="String">{end}</Data></Cell>
<Cell><Data ss:Type="String">{thu}</Data></Cell>
<Cell><Data ss:Type="String">{time}</Data></Cell>
</Row>"#
            ));
        }

        format!(
            r#"<?xml version="1.0"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet">
<Worksheet ss:Name="Sheet1"><Table>{body}</Table></Worksheet>
</Workbook>"#
        )
    }

    fn sample_xml() -> String {
        workbook_xml(&[
            (
                "Giải tích 1",
                "MI1111",
                "01/09/2024",
                "01/12/2024",
                "2",
                "07:30",
            ),
            (
                "Vật lý đại cương",
                "PH1110",
                "01/09/2024",
                "01/12/2024",
                "4",
                "13:00",
            ),
        ])
    }

    #[test]
    fn test_import_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tkb.xls");
        std::fs::write(&path, sample_xml()).unwrap();

        let entries = import_workbook(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].course_code, "MI1111");
        assert_eq!(entries[1].weekday, 3);
    }

    #[test]
    fn test_import_bytes() {
        let entries = import_bytes(sample_xml().into_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_import_drops_blank_rows() {
        let xml = workbook_xml(&[
            (
                "Giải tích 1",
                "MI1111",
                "01/09/2024",
                "01/12/2024",
                "2",
                "07:30",
            ),
            ("", "", "", "", "", ""),
        ]);

        let entries = import_bytes(xml.into_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_import_all_invalid_is_error() {
        let xml = workbook_xml(&[("", "", "", "", "", ""), ("", "", "", "", "", "")]);
        let result = import_bytes(xml.into_bytes());
        assert!(matches!(result, Err(ImportError::NoValidRows)));
    }

    #[test]
    fn test_import_unreadable_file_is_parse_error() {
        let result = import_workbook(Path::new("/nonexistent/tkb.xls"));
        assert!(matches!(result, Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_is_workbook_file() {
        assert!(is_workbook_file("tkb.xlsx"));
        assert!(is_workbook_file("TKB_HK1.XLS"));
        assert!(is_workbook_file("export.ods"));
        assert!(!is_workbook_file("timetable.json"));
        assert!(!is_workbook_file("timetable.json.tmp"));
        assert!(!is_workbook_file("notes.txt"));
    }

    #[test]
    fn test_find_latest_workbook_picks_last_by_name() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tkb_20240901.xls"), "x").unwrap();
        std::fs::write(dir.path().join("tkb_20241001.xls"), "x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "x").unwrap();

        let latest = find_latest_workbook(dir.path()).unwrap();
        assert!(latest.to_string_lossy().contains("tkb_20241001"));
    }

    #[test]
    fn test_find_latest_workbook_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(find_latest_workbook(dir.path()).is_none());
    }

    #[test]
    fn test_refresh_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tkb.xls"), sample_xml()).unwrap();

        let entries = refresh_from_dir(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        // Result is persisted
        assert_eq!(store::load(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_refresh_from_dir_no_workbook() {
        let dir = TempDir::new().unwrap();
        let result = refresh_from_dir(dir.path());
        assert!(matches!(result, Err(ImportError::NoWorkbook)));
    }

    #[test]
    fn test_load_or_import_prefers_store() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tkb.xls"), sample_xml()).unwrap();

        // Import once, then corrupt the workbook; the store should win
        let first = load_or_import(dir.path()).unwrap();
        assert_eq!(first.len(), 2);

        std::fs::write(dir.path().join("tkb.xls"), "garbage").unwrap();
        let second = load_or_import(dir.path()).unwrap();
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_load_or_import_empty_dir_is_empty_timetable() {
        let dir = TempDir::new().unwrap();
        assert!(load_or_import(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_or_import_bad_workbook_is_empty_not_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tkb.xls"), "garbage").unwrap();
        assert!(load_or_import(dir.path()).unwrap().is_empty());
    }
}
