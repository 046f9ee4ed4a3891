//! End-to-end runs of the extraction pipeline on a small cohort.

use std::fs;
use std::path::Path;

use cohort_cli::pipeline::run_pipeline;
use cohort_cli::types::PipelineInputs;
use cohort_model::{DiagnosisFilter, PipelineOptions, UnmappedCodePolicy};

const CATALOG: &str = "FieldID\tDescription\tCategory\tValueType\n\
    31\tSex\t100094\tCategorical (single)\n\
    53\tDate of attending assessment centre\t100024\tDate\n\
    20002\tNon-cancer illness code, self-reported\t100074\tCategorical (multiple)\n\
    1160\tSleep duration\t100057\tInteger\n\
    4080\tSystolic blood pressure, automated reading\t100011\tContinuous\n";

const SOURCE: &str = "f.eid\tf.31.0.0\tf.53.0.0\tf.20002.0.0\tf.20002.0.1\t\
    f.1160.0.0\tf.4080.0.0\tf.4080.0.1\n\
    1000001\t1\t2008-01-23\t1065\t1223\t-3\t-3\t140\n\
    1000002\t0\t2009-03-02\tNA\t\t7\t132\tNA\n";

const HESIN: &str = "eid\tins_index\tadmidate\n\
    1000001\t0\t2005-06-01\n\
    1000001\t1\t2012-02-10\n";

const HESIN_DIAG: &str = "eid\tins_index\tarr_index\tdiag_icd10\n\
    1000001\t0\t0\tI210\n\
    1000001\t1\t0\tE119\n";

const CODING: &str = "coding\tmeaning\n\
    Block E10-E14\tDiabetes mellitus\n\
    E11\tNon-insulin-dependent diabetes mellitus\n\
    Block I20-I25\tIschaemic heart diseases\n\
    I21\tAcute myocardial infarction\n";

fn write_inputs(dir: &Path, hesin_diag: &str) -> PipelineInputs {
    let inputs = PipelineInputs {
        catalog: dir.join("ukbdatafields.webscraped.tsv"),
        source: dir.join("ukb.tab"),
        hesin: dir.join("hesin.txt"),
        hesin_diag: dir.join("hesin_diag.txt"),
        coding: dir.join("coding19.tsv"),
    };
    fs::write(&inputs.catalog, CATALOG).unwrap();
    fs::write(&inputs.source, SOURCE).unwrap();
    fs::write(&inputs.hesin, HESIN).unwrap();
    fs::write(&inputs.hesin_diag, hesin_diag).unwrap();
    fs::write(&inputs.coding, CODING).unwrap();
    inputs
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap()
}

#[test]
fn extract_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), HESIN_DIAG);
    let output = dir.path().join("out");

    let outcome = run_pipeline(&inputs, &PipelineOptions::default(), Some(&output)).unwrap();
    assert_eq!(outcome.participants, 2);
    assert!(outcome.warnings.is_empty());

    for name in [
        "Categorical_single.datafields",
        "Categorical_multiple.datafields",
        "Integer.datafields",
        "Continuous.datafields",
        "Categorical_single.possiblecategories.txt",
        "Categorical_multiple.possiblecategories.txt",
        "Categorical_single.onehot.csv",
        "Categorical_multiple.onehot.csv",
        "Integer_single.csv",
        "Integer_multiple.csv",
        "Continuous_single.csv",
        "Continuous_multiple.csv",
        "hesin_merged_hesin_diag.tsv",
        "icd10level1.csv",
        "icd10level2.csv",
        "features_merged.csv",
        "run_summary.json",
    ] {
        assert!(output.join(name).is_file(), "{name} was not written");
    }
    let leftovers: Vec<_> = fs::read_dir(&output)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
        .collect();
    assert!(leftovers.is_empty());

    assert_eq!(
        read(&output, "Integer_single.csv"),
        "eid,f.1160.0.0\n1000001,NA\n1000002,7\n"
    );
    assert_eq!(
        read(&output, "Continuous_multiple.csv"),
        "eid,f.4080.0.0,f.4080.0.1\n1000001,-3,140\n1000002,132,NA\n"
    );
    assert_eq!(
        read(&output, "icd10level1.csv"),
        "eid,E10-E14,I20-I25\n1000001,1,1\n1000002,0,0\n"
    );
    assert_eq!(
        read(&output, "Categorical_multiple.possiblecategories.txt"),
        "20002\t1065\t1223\n"
    );
    assert_eq!(
        read(&output, "hesin_merged_hesin_diag.tsv"),
        "eid\tins_index\tarr_index\tdiag_icd10\tadmidate\n\
         1000001\t0\t0\tI210\t2005-06-01\n\
         1000001\t1\t0\tE119\t2012-02-10\n"
    );
    assert_eq!(
        read(&output, "features_merged.csv"),
        "eid,f.4080.0.0,f.4080.0.1,f.1160.0.0,c.31.0,c.31.1,c.31.NA,\
         c.20002.1065,c.20002.1223,c.20002.NA,E11,I21,E10-E14,I20-I25\n\
         1000001,-3,140,NA,0,1,0,1,1,0,1,1,1,1\n\
         1000002,132,NA,7,1,0,0,0,0,1,0,0,0,0\n"
    );

    let summary: serde_json::Value =
        serde_json::from_str(&read(&output, "run_summary.json")).unwrap();
    assert_eq!(summary["participants"], 2);
    assert_eq!(summary["inputs"].as_array().unwrap().len(), 5);
    assert_eq!(summary["diagnoses"]["encoded_records"], 2);
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), HESIN_DIAG);
    let outcome = run_pipeline(&inputs, &PipelineOptions::default(), None).unwrap();
    assert!(outcome.summary_path.is_none());
    let merged = outcome.matrices.last().unwrap();
    assert_eq!(merged.name, "features_merged");
    assert_eq!(merged.columns, 13);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn baseline_filter_drops_later_admissions() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), HESIN_DIAG);
    let output = dir.path().join("out");
    let options =
        PipelineOptions::default().with_diagnosis_filter(DiagnosisFilter::BeforeBaseline);
    let outcome = run_pipeline(&inputs, &options, Some(&output)).unwrap();
    assert_eq!(
        read(&output, "icd10level2.csv"),
        "eid,E11,I21\n1000001,0,1\n1000002,0,0\n"
    );
    let report = outcome.summary.diagnoses.unwrap();
    assert_eq!(report.filtered_records, 1);
}

#[test]
fn unmapped_code_aborts_without_merged_output() {
    let dir = tempfile::tempdir().unwrap();
    let diag = format!("{HESIN_DIAG}1000002\t0\t0\tZ999\n");
    let inputs = write_inputs(dir.path(), &diag);
    let output = dir.path().join("out");

    let error = run_pipeline(&inputs, &PipelineOptions::default(), Some(&output)).unwrap_err();
    assert!(format!("{error:#}").contains("Z99"));
    assert!(!output.join("features_merged.csv").exists());

    let options = PipelineOptions::default().with_unmapped_codes(UnmappedCodePolicy::Report);
    let outcome = run_pipeline(&inputs, &options, Some(&output)).unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert!(output.join("features_merged.csv").is_file());
}

#[test]
fn missing_numeric_type_still_emits_eid_only_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path(), HESIN_DIAG);
    fs::write(&inputs.source, "f.eid\tf.31.0.0\n1000001\t1\n1000002\t0\n").unwrap();
    let output = dir.path().join("out");
    let outcome = run_pipeline(&inputs, &PipelineOptions::default(), Some(&output)).unwrap();
    assert_eq!(read(&output, "Integer_single.csv"), "eid\n1000001\n1000002\n");
    assert_eq!(outcome.summary.empty_types.len(), 3);
    assert_eq!(outcome.warnings.len(), 3);
}
