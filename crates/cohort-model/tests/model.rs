//! Tests for cohort-model types.

use cohort_model::{
    CohortError, DiagnosisFilter, FieldId, ParticipantId, PipelineOptions, UnmappedCodePolicy,
    ValueType,
};

#[test]
fn options_default_threshold_is_fifty() {
    let options = PipelineOptions::default();
    assert_eq!(options.exclusion_threshold, 50);
    assert_eq!(options.unmapped_codes, UnmappedCodePolicy::Fail);
    assert_eq!(options.diagnosis_filter, DiagnosisFilter::All);
}

#[test]
fn options_load_from_partial_toml() {
    let options: PipelineOptions = toml::from_str(
        r#"
exclusion_threshold = 20
unmapped_codes = "report"
diagnosis_filter = "before-baseline"
"#,
    )
    .expect("parse options");
    assert_eq!(options.exclusion_threshold, 20);
    assert_eq!(options.unmapped_codes, UnmappedCodePolicy::Report);
    assert_eq!(options.diagnosis_filter, DiagnosisFilter::BeforeBaseline);
    assert_eq!(options.baseline_column, "f.53.0.0");
}

#[test]
fn options_reject_unknown_keys() {
    let result: Result<PipelineOptions, _> = toml::from_str("threshold = 20\n");
    assert!(result.is_err());
}

#[test]
fn value_type_serializes_as_tag() {
    let json = serde_json::to_string(&ValueType::CategoricalMultiple).expect("serialize");
    assert_eq!(json, "\"Categorical_multiple\"");
}

#[test]
fn lookup_error_names_code_and_participant() {
    let error = CohortError::Lookup {
        code: "Z99".to_string(),
        eid: ParticipantId::new(1000001),
        level: "level-1",
    };
    let message = error.to_string();
    assert!(message.contains("Z99"));
    assert!(message.contains("1000001"));
    assert!(error.is_fatal());
    assert!(!CohortError::schema("no columns").is_fatal());
}

#[test]
fn field_id_serializes_transparently() {
    let id = FieldId::new(20002).unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "20002");
}
