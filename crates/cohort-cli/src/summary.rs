use std::path::PathBuf;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_cli::types::PipelineOutcome;

pub fn print_summary(outcome: &PipelineOutcome) {
    match &outcome.output_dir {
        Some(dir) => println!("Output: {}", dir.display()),
        None => println!("Output: (dry run, nothing written)"),
    }
    println!("Participants: {}", outcome.participants);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Matrix"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("File"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for shape in &outcome.matrices {
        table.add_row(vec![
            Cell::new(&shape.name),
            Cell::new(shape.rows),
            count_cell(shape.columns),
            path_cell(shape.path.as_ref()),
        ]);
    }
    println!("{table}");

    if let Some(report) = &outcome.summary.diagnoses {
        println!(
            "Diagnoses: {} encoded for {} participants, {} outside the cohort, {} filtered",
            report.encoded_records,
            report.participants_with_diagnoses,
            report.unknown_participants,
            report.filtered_records
        );
    }
    for report in &outcome.summary.categorical {
        if !report.excluded_fields.is_empty() {
            let fields: Vec<String> = report
                .excluded_fields
                .iter()
                .map(|excluded| format!("{} ({})", excluded.field, excluded.categories))
                .collect();
            println!(
                "{}: excluded {} fields: {}",
                report.value_type,
                fields.len(),
                fields.join(", ")
            );
        }
    }
    if let Some(path) = &outcome.summary_path {
        println!("Run summary: {}", path.display());
    }
    if !outcome.warnings.is_empty() {
        eprintln!("Warnings:");
        for warning in &outcome.warnings {
            eprintln!("- {warning}");
        }
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count)
    } else {
        dim_cell(count)
    }
}

fn path_cell(path: Option<&PathBuf>) -> Cell {
    match path.and_then(|path| path.file_name()) {
        Some(name) => Cell::new(name.to_string_lossy()),
        None => dim_cell("-"),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
