use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::{IngestError, Result};

/// Open an input file, reporting a missing file separately from other I/O errors.
pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Open a tab-separated file with literal quotes and a header line.
pub(crate) fn open(path: &Path) -> Result<Reader<File>> {
    Ok(from_reader(open_file(path)?))
}

pub(crate) fn from_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .flexible(true)
        .from_reader(input)
}

pub(crate) fn headers<R: Read>(reader: &mut Reader<R>, path: &Path) -> Result<Vec<String>> {
    let record = reader
        .headers()
        .map_err(|error| IngestError::parse(path, &error))?;
    let headers: Vec<String> = record.iter().map(normalize_header).collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::EmptyFile {
            path: path.to_path_buf(),
        });
    }
    Ok(headers)
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').trim_matches('"').to_string()
}

pub(crate) fn header_index(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

pub(crate) fn require_column(headers: &[String], name: &str, path: &Path) -> Result<usize> {
    header_index(headers, name).ok_or_else(|| IngestError::MissingColumn {
        column: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Cell value with line terminators removed; absent trailing cells are empty.
pub(crate) fn cell(record: &StringRecord, index: usize) -> &str {
    record
        .get(index)
        .map(|value| value.trim_end_matches(['\r', '\n']))
        .unwrap_or("")
}

/// 1-based line number of a record, for error messages.
pub(crate) fn record_number(record: &StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}
