//! Output generation for the feature pipeline.
//!
//! - **CSV matrices**: one file per partial matrix plus the merged matrix
//! - **Audit listings**: `<Type>.datafields` and possible categories
//! - **Run summary**: options, shapes, counts, and input digests as JSON

mod assemble;
mod frame;
mod summary;
mod writer;

pub use assemble::{MERGE_ORDER, assemble, assemble_matrices};
pub use frame::{EID_COLUMN, frame_eids, matrix_to_frame};
pub use summary::{InputDigest, MatrixShape, RunSummary, write_run_summary};
pub use writer::{
    write_atomic, write_datafields, write_frame, write_joined_diagnoses, write_matrix,
    write_possible_categories,
};
