//! File writers for every pipeline output.
//!
//! Each file is written to `<name>.partial` next to its destination and
//! renamed into place once complete, so a failed run never leaves a file
//! that looks finished.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::debug;

use cohort_encode::VocabularySet;
use cohort_ingest::{JoinedDiagnosis, write_joined};
use cohort_model::{FeatureMatrix, FieldId, MISSING_MARKER, ValueType};

use crate::frame::EID_COLUMN;

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, OsString::from);
    name.push(".partial");
    path.with_file_name(name)
}

/// Write through `write`, then move the finished file to `path`.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = partial_path(path);
    let file =
        File::create(&partial).with_context(|| format!("create {}", partial.display()))?;
    let mut writer = BufWriter::new(file);
    let outcome = write(&mut writer).and_then(|()| {
        writer
            .flush()
            .with_context(|| format!("flush {}", partial.display()))
    });
    if let Err(error) = outcome {
        drop(writer);
        let _ = fs::remove_file(&partial);
        return Err(error);
    }
    drop(writer);
    fs::rename(&partial, path)
        .with_context(|| format!("rename {} to {}", partial.display(), path.display()))?;
    debug!(path = %path.display(), "output written");
    Ok(())
}

/// Write `<name>.csv`: `eid` then the matrix columns.
pub fn write_matrix(output_dir: &Path, matrix: &FeatureMatrix) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.csv", matrix.name()));
    write_atomic(&path, |file| {
        let mut out = csv::Writer::from_writer(file);
        let mut header = Vec::with_capacity(matrix.width() + 1);
        header.push(EID_COLUMN);
        header.extend(matrix.columns().iter().map(String::as_str));
        out.write_record(&header)?;
        for (row, eid) in matrix.eids().iter().enumerate() {
            let eid = eid.to_string();
            let mut record = Vec::with_capacity(matrix.width() + 1);
            record.push(eid.as_str());
            record.extend(matrix.row_values(row));
            out.write_record(&record)?;
        }
        out.flush()?;
        Ok(())
    })
    .with_context(|| format!("write {}", matrix.name()))?;
    Ok(path)
}

/// Write an assembled frame as CSV; nulls are written as the missing marker.
pub fn write_frame(path: &Path, frame: &DataFrame) -> Result<()> {
    let mut frame = frame.clone();
    write_atomic(path, |file| {
        CsvWriter::new(file)
            .include_header(true)
            .with_null_value(MISSING_MARKER.to_string())
            .finish(&mut frame)
            .context("serialize frame")
    })
}

/// Write `<Type>.datafields`: the selected field ids, one per line.
pub fn write_datafields(
    output_dir: &Path,
    value_type: ValueType,
    fields: &[FieldId],
) -> Result<PathBuf> {
    let path = output_dir.join(format!("{value_type}.datafields"));
    write_atomic(&path, |file| {
        for field in fields {
            writeln!(file, "{field}")?;
        }
        Ok(())
    })?;
    Ok(path)
}

/// Write `<Type>.possiblecategories.txt`.
pub fn write_possible_categories(output_dir: &Path, set: &VocabularySet) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}.possiblecategories.txt", set.value_type()));
    write_atomic(&path, |file| {
        set.write_possible_categories(file)
            .context("write possible categories")
    })?;
    Ok(path)
}

/// Write `hesin_merged_hesin_diag.tsv`.
pub fn write_joined_diagnoses(
    output_dir: &Path,
    joined: &[JoinedDiagnosis],
    code_column: &str,
    date_column: &str,
) -> Result<PathBuf> {
    let path = output_dir.join("hesin_merged_hesin_diag.tsv");
    write_atomic(&path, |file| {
        write_joined(file, joined, code_column, date_column).context("write joined diagnoses")
    })?;
    Ok(path)
}
