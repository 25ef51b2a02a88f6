//! Report generation module.
//!
//! Stage reports are collected into a [`PipelineReport`] suitable for:
//! - JSON output to stdout (`--json` CLI flag)
//! - JSON file output (`--emit-report` CLI flag)
//! - Programmatic access in library mode
//!
//! # Example
//!
//! ```rust,ignore
//! use kamp_processing::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report(stage_reports);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("data/results"));
//! generator.write_report_to_file(&report, "pipeline")?;
//! ```

mod generator;

pub use generator::{PipelineReport, ReportGenerator};
