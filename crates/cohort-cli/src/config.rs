//! Pipeline options from an optional TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use cohort_model::PipelineOptions;

/// Defaults when `path` is `None`, otherwise the file's values over the defaults.
pub fn load_options(path: Option<&Path>) -> Result<PipelineOptions> {
    let Some(path) = path else {
        return Ok(PipelineOptions::default());
    };
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    parse_options(&contents).with_context(|| format!("parse config {}", path.display()))
}

pub fn parse_options(contents: &str) -> Result<PipelineOptions> {
    let options: PipelineOptions = toml::from_str(contents)?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_model::UnmappedCodePolicy;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(load_options(None).unwrap(), PipelineOptions::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohort.toml");
        fs::write(
            &path,
            "exclusion_threshold = 10\n\
             unmapped_codes = \"report\"\n\
             diagnosis_code_column = \"diag_icd10_nb\"\n",
        )
        .unwrap();
        let options = load_options(Some(&path)).unwrap();
        assert_eq!(options.exclusion_threshold, 10);
        assert_eq!(options.unmapped_codes, UnmappedCodePolicy::Report);
        assert_eq!(options.diagnosis_code_column, "diag_icd10_nb");
        assert_eq!(options.admission_date_column, "admidate");
    }

    #[test]
    fn unknown_keys_are_reported_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohort.toml");
        fs::write(&path, "threshold = 10\n").unwrap();
        let error = load_options(Some(&path)).unwrap_err();
        assert!(format!("{error:#}").contains("cohort.toml"));
    }
}
