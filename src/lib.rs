//! bamstats-rs: per read group alignment statistics and mismatch QC.
//!
//! # Library usage
//!
//! ```no_run
//! use bamstats_rs::{StatsConfig, collect_stats};
//! use bamstats_rs::bam_io::AlignmentInput;
//! use bamstats_rs::report::StatsReport;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut input = AlignmentInput::open(Path::new("sample.bam"))?;
//! let header = input.header().clone();
//! let config = StatsConfig::default();
//! let (engine, _run) = collect_stats(&header, input.records(), &config)?;
//!
//! let report = StatsReport::build("sample.bam", engine, config.estimation_mode());
//! report.write_bas(&mut std::io::stdout())?;
//! # Ok(())
//! # }
//! ```

// Public modules: the stable API surface.
pub mod bam_io;
pub mod cigar;
pub mod classify;
pub mod divergence;
pub mod error;
pub mod insert_size;
pub mod pipeline;
pub mod qc;
pub mod read_group;
pub mod report;
pub mod stats;
pub mod types;

// Flat re-exports for the most commonly used public types.
pub use classify::{AlignmentClassifier, StatsEngine};
pub use divergence::DivergenceResult;
pub use error::{Error, Result};
pub use insert_size::{EstimationMode, InsertSizeSummary, TrimConfig};
pub use pipeline::{RecordPolicy, RunStats, StatsConfig, collect_stats, run_stats};
pub use qc::{FlagMode, QcConfig, QcStats, run_flag_modifier, run_mismatch_qc};
pub use read_group::{ReadGroupCatalog, ReadGroupEntry};
pub use stats::{PerBucketStats, StatsAccumulator};
