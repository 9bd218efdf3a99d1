//! Raw checksum report parsing and table rendering.

use std::fs;
use std::path::Path;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::ReportError;

/// One `<checksum> <file>` line from a raw report.
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ChecksumRecord {
    #[tabled(rename = "SHA256:")]
    pub checksum: String,
    #[tabled(rename = "File:")]
    pub file: String,
}

/// Parses raw `sha256sum --binary` output.
///
/// Each line must carry exactly two whitespace-separated tokens; anything
/// else (including an empty line) aborts the whole parse. The binary-mode
/// `*` marker is stripped from the file name.
pub fn parse_report(text: &str) -> Result<Vec<ChecksumRecord>, ReportError> {
    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(checksum), Some(file), None) => records.push(ChecksumRecord {
                checksum: checksum.to_string(),
                file: file.replace('*', ""),
            }),
            _ => {
                return Err(ReportError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
        }
    }
    Ok(records)
}

/// Renders the records as an aligned borderless table under the fixed
/// `SHA256:` / `File:` header.
pub fn render_table(records: &[ChecksumRecord]) -> String {
    Table::new(records).with(Style::blank()).to_string()
}

/// Reads `source`, formats it, and writes the table to `destination`.
///
/// The whole report is parsed before the destination is opened, so a
/// malformed line never leaves a partial table behind.
pub fn write_table_report(source: &Path, destination: &Path) -> Result<String, ReportError> {
    let raw = fs::read_to_string(source).map_err(|e| ReportError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let records = parse_report(&raw)?;
    let table = render_table(&records);
    fs::write(destination, &table).map_err(|e| ReportError::Write {
        path: destination.to_path_buf(),
        source: e,
    })?;
    Ok(format!(
        "SHA256 table report from {} was written to {}",
        source.display(),
        destination.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_marker_is_stripped() {
        let records = parse_report("deadbeefcafebabe *reports/file1.bin\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].checksum, "deadbeefcafebabe");
        assert_eq!(records[0].file, "reports/file1.bin");
    }

    #[test]
    fn every_asterisk_is_stripped() {
        let records = parse_report("abc123 *odd*name*\n").unwrap();
        assert_eq!(records[0].file, "oddname");
    }

    #[test]
    fn records_keep_input_order() {
        let records = parse_report("aaa one\nbbb two\nccc three\n").unwrap();
        let files: Vec<&str> = records.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, ["one", "two", "three"]);
    }

    #[test]
    fn one_token_line_is_malformed() {
        let err = parse_report("aaa one\njusthash\n").unwrap_err();
        assert!(matches!(err, ReportError::Malformed { line: 2, .. }));
    }

    #[test]
    fn three_token_line_is_malformed() {
        let err = parse_report("aaa file with space\n").unwrap_err();
        assert!(matches!(err, ReportError::Malformed { line: 1, .. }));
    }

    #[test]
    fn empty_line_is_malformed() {
        let err = parse_report("aaa one\n\nbbb two\n").unwrap_err();
        assert!(matches!(err, ReportError::Malformed { line: 2, .. }));
    }

    #[test]
    fn empty_input_parses_to_no_records() {
        assert!(parse_report("").unwrap().is_empty());
    }

    #[test]
    fn table_has_header_plus_one_line_per_record() {
        let records = parse_report("aaa one\nbbb two\n").unwrap();
        let table = render_table(&records);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("SHA256:"));
        assert!(lines[0].contains("File:"));
    }

    #[test]
    fn rows_carry_checksum_then_file() {
        let records = parse_report("deadbeef *x.bin\n").unwrap();
        let table = render_table(&records);
        let row: Vec<&str> = table.lines().nth(1).unwrap().split_whitespace().collect();
        assert_eq!(row, ["deadbeef", "x.bin"]);
    }
}
