//! CLI library components for cohort feature extraction.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
