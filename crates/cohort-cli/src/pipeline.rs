//! Feature extraction pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Load**: read the field catalog and the cohort table, digest inputs
//! 2. **Categorical**: classify, build vocabularies, one-hot encode
//! 3. **Numeric**: split integer and continuous fields
//! 4. **Diagnoses**: join episodes, build the hierarchy, encode
//! 5. **Assemble**: merge every partial matrix positionally
//! 6. **Output**: write matrices, audit listings, and the run summary
//!
//! Each stage consumes the complete output of the previous one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, warn};

use cohort_encode::{
    CategoricalEncoding, DiagnosisEncoding, DiagnosisOptions, EncoderOptions, NumericSplit,
    VocabularySet, baseline_dates, build_hierarchy, build_vocabularies, classify_columns,
    encode_categorical, encode_diagnoses, split_numeric,
};
use cohort_ingest::{
    JoinedDiagnosis, SourceTable, join_episodes, read_coding_entries, read_diagnoses,
    read_episodes, read_field_catalog, read_source_table, sha256_file,
};
use cohort_model::{DiagnosisFilter, FeatureMatrix, FieldCatalog, PipelineOptions, ValueType};
use cohort_report::{
    InputDigest, MERGE_ORDER, MatrixShape, RunSummary, assemble_matrices, write_datafields,
    write_frame, write_joined_diagnoses, write_matrix, write_possible_categories,
    write_run_summary,
};

use crate::types::{PipelineInputs, PipelineOutcome};

const MERGED_NAME: &str = "features_merged";

// ============================================================================
// Stage 1: Load
// ============================================================================

#[derive(Debug)]
pub struct LoadResult {
    pub catalog: FieldCatalog,
    pub table: SourceTable,
    pub digests: Vec<InputDigest>,
}

pub fn load(inputs: &PipelineInputs) -> Result<LoadResult> {
    let catalog = read_field_catalog(&inputs.catalog).context("load field catalog")?;
    info!(
        field_count = catalog.len(),
        path = %inputs.catalog.display(),
        "field catalog loaded"
    );
    let table = read_source_table(&inputs.source).context("load cohort table")?;

    let mut digests = Vec::new();
    for (role, path) in [
        ("catalog", &inputs.catalog),
        ("source", &inputs.source),
        ("hesin", &inputs.hesin),
        ("hesin_diag", &inputs.hesin_diag),
        ("coding", &inputs.coding),
    ] {
        let sha256 = sha256_file(path).with_context(|| format!("digest {role} input"))?;
        digests.push(InputDigest {
            role: role.to_string(),
            path: path.clone(),
            sha256,
        });
    }
    Ok(LoadResult {
        catalog,
        table,
        digests,
    })
}

// ============================================================================
// Stage 2: Categorical
// ============================================================================

#[derive(Debug)]
pub struct CategoricalStage {
    pub value_type: ValueType,
    pub vocabularies: VocabularySet,
    pub encoding: CategoricalEncoding,
    pub has_columns: bool,
}

pub fn encode_categorical_type(
    table: &SourceTable,
    catalog: &FieldCatalog,
    value_type: ValueType,
    options: &PipelineOptions,
) -> CategoricalStage {
    let selection = classify_columns(table.header(), catalog, value_type);
    let has_columns = match selection.require_columns() {
        Ok(()) => true,
        Err(error) => {
            warn!(value_type = %value_type, %error, "writing eid-only outputs");
            false
        }
    };
    if !selection.absent_fields.is_empty() {
        debug!(
            value_type = %value_type,
            absent_field_count = selection.absent_fields.len(),
            "catalog fields without columns"
        );
    }
    let vocabularies = build_vocabularies(table, &selection);
    let encoder = EncoderOptions {
        exclusion_threshold: options.exclusion_threshold,
    };
    let encoding = encode_categorical(table, &selection, &vocabularies, &encoder);
    info!(
        value_type = %value_type,
        field_count = encoding.report.surviving_fields,
        excluded_field_count = encoding.report.excluded_fields.len(),
        column_count = encoding.report.column_count,
        "categorical fields encoded"
    );
    CategoricalStage {
        value_type,
        vocabularies,
        encoding,
        has_columns,
    }
}

// ============================================================================
// Stage 3: Numeric
// ============================================================================

pub fn split_numeric_type(
    table: &SourceTable,
    catalog: &FieldCatalog,
    value_type: ValueType,
) -> Result<(NumericSplit, bool)> {
    let selection = classify_columns(table.header(), catalog, value_type);
    let has_columns = match selection.require_columns() {
        Ok(()) => true,
        Err(error) => {
            warn!(value_type = %value_type, %error, "writing eid-only outputs");
            false
        }
    };
    let split = split_numeric(table, &selection)
        .with_context(|| format!("split {value_type} fields"))?;
    info!(
        value_type = %value_type,
        single_columns = split.report.single_columns,
        multiple_columns = split.report.multiple_columns,
        masked_values = split.report.masked_values,
        "numeric fields split"
    );
    Ok((split, has_columns))
}

// ============================================================================
// Stage 4: Diagnoses
// ============================================================================

#[derive(Debug)]
pub struct DiagnosisStage {
    pub joined: Vec<JoinedDiagnosis>,
    pub encoding: DiagnosisEncoding,
}

pub fn encode_diagnosis_tables(
    inputs: &PipelineInputs,
    table: &SourceTable,
    options: &PipelineOptions,
) -> Result<DiagnosisStage> {
    let episodes = read_episodes(&inputs.hesin, &options.admission_date_column)
        .context("load episode table")?;
    let diagnoses = read_diagnoses(&inputs.hesin_diag, &options.diagnosis_code_column)
        .context("load diagnosis table")?;
    let joined = join_episodes(diagnoses, &episodes).context("join diagnoses to episodes")?;

    let entries = read_coding_entries(&inputs.coding).context("load code reference")?;
    let hierarchy = build_hierarchy(&entries).context("build diagnosis hierarchy")?;

    let baseline = match options.diagnosis_filter {
        DiagnosisFilter::All => None,
        DiagnosisFilter::BeforeBaseline => Some(
            baseline_dates(table, &options.baseline_column).context("read baseline dates")?,
        ),
    };
    let diagnosis_options = DiagnosisOptions {
        unmapped_codes: options.unmapped_codes,
        filter: options.diagnosis_filter,
    };
    let encoding = encode_diagnoses(
        table.eids(),
        &joined,
        &hierarchy,
        &diagnosis_options,
        baseline.as_ref(),
    )
    .context("encode diagnoses")?;
    Ok(DiagnosisStage { joined, encoding })
}

// ============================================================================
// Full run
// ============================================================================

/// Run every stage; `output_dir: None` computes everything but writes nothing.
pub fn run_pipeline(
    inputs: &PipelineInputs,
    options: &PipelineOptions,
    output_dir: Option<&Path>,
) -> Result<PipelineOutcome> {
    let run_start = Instant::now();
    let mut summary = RunSummary::new(env!("CARGO_PKG_VERSION"), options.clone());
    let mut warnings = Vec::new();

    let load_span = info_span!("load", source = %inputs.source.display());
    let LoadResult {
        catalog,
        table,
        digests,
    } = load_span.in_scope(|| load(inputs))?;
    summary.inputs = digests;
    summary.participants = table.row_count();

    let categorical: Vec<CategoricalStage> = [
        ValueType::CategoricalSingle,
        ValueType::CategoricalMultiple,
    ]
    .into_iter()
    .map(|value_type| {
        info_span!("encode_categorical", value_type = %value_type)
            .in_scope(|| encode_categorical_type(&table, &catalog, value_type, options))
    })
    .collect();

    let mut numeric = Vec::new();
    for value_type in [ValueType::Continuous, ValueType::Integer] {
        let (split, has_columns) = info_span!("split_numeric", value_type = %value_type)
            .in_scope(|| split_numeric_type(&table, &catalog, value_type))?;
        if !has_columns {
            summary.empty_types.push(value_type);
        }
        numeric.push(split);
    }
    for stage in &categorical {
        if !stage.has_columns {
            summary.empty_types.push(stage.value_type);
        }
    }
    summary.empty_types.sort();
    for value_type in &summary.empty_types {
        warnings.push(format!("no {value_type} columns in the cohort table"));
    }

    let diagnosis = info_span!("diagnoses", hesin_diag = %inputs.hesin_diag.display())
        .in_scope(|| encode_diagnosis_tables(inputs, &table, options))?;
    let unmapped: usize = diagnosis.encoding.report.unmapped_codes.values().sum();
    if unmapped > 0 {
        warnings.push(format!(
            "{unmapped} diagnoses with {} unmapped codes were excluded",
            diagnosis.encoding.report.unmapped_codes.len()
        ));
    }

    let mut matrices: Vec<&FeatureMatrix> = Vec::with_capacity(MERGE_ORDER.len());
    for split in &numeric {
        matrices.push(&split.single);
        matrices.push(&split.multiple);
    }
    for stage in &categorical {
        matrices.push(&stage.encoding.matrix);
    }
    matrices.push(&diagnosis.encoding.level2);
    matrices.push(&diagnosis.encoding.level1);
    matrices.sort_by_key(|matrix| {
        MERGE_ORDER
            .iter()
            .position(|name| *name == matrix.name())
            .unwrap_or(MERGE_ORDER.len())
    });

    let merged = info_span!("assemble").in_scope(|| assemble_matrices(&matrices))?;
    info!(
        row_count = merged.height(),
        column_count = merged.width(),
        "features merged"
    );

    summary.categorical = categorical
        .iter()
        .map(|stage| stage.encoding.report.clone())
        .collect();
    summary.numeric = numeric.iter().map(|split| split.report.clone()).collect();
    summary.diagnoses = Some(diagnosis.encoding.report.clone());

    let mut shapes: Vec<MatrixShape> = Vec::with_capacity(matrices.len() + 1);
    let mut summary_path = None;
    if let Some(output_dir) = output_dir {
        let output_span = info_span!("output", output_dir = %output_dir.display());
        let _output_guard = output_span.enter();
        fs::create_dir_all(output_dir)
            .with_context(|| format!("create {}", output_dir.display()))?;

        for value_type in ValueType::ENCODED {
            write_datafields(output_dir, value_type, &catalog.fields_of_type(value_type))?;
        }
        for stage in &categorical {
            write_possible_categories(output_dir, &stage.vocabularies)?;
        }
        write_joined_diagnoses(
            output_dir,
            &diagnosis.joined,
            &options.diagnosis_code_column,
            &options.admission_date_column,
        )?;
        for matrix in &matrices {
            let path = write_matrix(output_dir, matrix)?;
            shapes.push(MatrixShape::of(matrix, Some(path)));
        }
        let merged_path = output_dir.join(format!("{MERGED_NAME}.csv"));
        write_frame(&merged_path, &merged)
            .with_context(|| format!("write {}", merged_path.display()))?;
        shapes.push(merged_shape(merged.height(), merged.width(), Some(merged_path)));

        summary.matrices.clone_from(&shapes);
        summary_path = Some(write_run_summary(output_dir, &summary)?);
    } else {
        shapes.extend(matrices.iter().map(|matrix| MatrixShape::of(matrix, None)));
        shapes.push(merged_shape(merged.height(), merged.width(), None));
        summary.matrices.clone_from(&shapes);
    }

    info!(
        participant_count = summary.participants,
        matrix_count = shapes.len(),
        duration_ms = run_start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(PipelineOutcome {
        output_dir: output_dir.map(Path::to_path_buf),
        participants: summary.participants,
        matrices: shapes,
        summary,
        summary_path,
        warnings,
    })
}

/// Shape of the merged matrix, whose width includes `eid`.
fn merged_shape(rows: usize, width: usize, path: Option<PathBuf>) -> MatrixShape {
    MatrixShape {
        name: MERGED_NAME.to_string(),
        rows,
        columns: width.saturating_sub(1),
        path,
    }
}
