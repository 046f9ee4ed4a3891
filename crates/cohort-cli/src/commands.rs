use anyhow::{Context, Result};
use comfy_table::{CellAlignment, Table};
use tracing::info_span;

use cohort_cli::config::load_options;
use cohort_cli::pipeline::run_pipeline;
use cohort_cli::types::{PipelineInputs, PipelineOutcome};
use cohort_ingest::read_field_catalog;
use cohort_model::{DiagnosisFilter, PipelineOptions, UnmappedCodePolicy, ValueType};

use crate::cli::{ExtractArgs, TypesArgs, UnmappedCodesArg};
use crate::summary::{align_column, apply_table_style, header_cell};

pub fn run_types(args: &TypesArgs) -> Result<()> {
    let catalog = read_field_catalog(&args.catalog).context("load field catalog")?;
    let counts = catalog.count_by_type();
    let mut table = Table::new();
    table.set_header(vec![header_cell("Value type"), header_cell("Fields")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for value_type in ValueType::ALL {
        let count = counts.get(&value_type).copied().unwrap_or_default();
        table.add_row(vec![value_type.to_string(), count.to_string()]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_extract(args: &ExtractArgs) -> Result<PipelineOutcome> {
    let options = resolve_options(args)?;
    let inputs = PipelineInputs {
        catalog: args.catalog.clone(),
        source: args.source.clone(),
        hesin: args.hesin.clone(),
        hesin_diag: args.hesin_diag.clone(),
        coding: args.coding.clone(),
    };
    let output_dir = (!args.dry_run).then_some(args.output_dir.as_path());
    let span = info_span!(
        "extract",
        output_dir = %args.output_dir.display(),
        dry_run = args.dry_run
    );
    span.in_scope(|| run_pipeline(&inputs, &options, output_dir))
}

/// Config file values first, then explicit flags.
fn resolve_options(args: &ExtractArgs) -> Result<PipelineOptions> {
    let mut options = load_options(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        options = options.with_exclusion_threshold(threshold);
    }
    if let Some(policy) = args.unmapped_codes {
        options = options.with_unmapped_codes(match policy {
            UnmappedCodesArg::Fail => UnmappedCodePolicy::Fail,
            UnmappedCodesArg::Report => UnmappedCodePolicy::Report,
        });
    }
    if args.before_baseline {
        options = options.with_diagnosis_filter(DiagnosisFilter::BeforeBaseline);
    }
    Ok(options)
}
