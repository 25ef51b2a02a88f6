use crate::error::Result;
use crate::types::StageReport;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

// ============================================================================
// Pipeline Report
// ============================================================================

/// Report covering one or more stages of a run.
///
/// Use this for both JSON output (`--json`) and file writing (`--emit-report`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Raw dataset the run started from
    pub input_file: Option<String>,
    /// Last file written by the run
    pub final_output: Option<String>,
    /// Total execution time in milliseconds
    pub duration_ms: u64,
    /// Rows in the first stage input
    pub rows_before: usize,
    /// Rows in the last stage output
    pub rows_after: usize,
    /// Per-stage details, in execution order
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// All warnings from all stages, prefixed by stage name.
    pub fn warnings(&self) -> Vec<String> {
        self.stages
            .iter()
            .flat_map(|stage| {
                stage
                    .warnings
                    .iter()
                    .map(move |w| format!("[{}] {}", stage.stage, w))
            })
            .collect()
    }
}

pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/results"),
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Build a report from stage reports, in execution order.
    pub fn build_report(stages: Vec<StageReport>) -> PipelineReport {
        let input_file = stages.first().and_then(|s| s.input_file.clone());
        let final_output = stages.last().and_then(|s| s.output_files.last().cloned());

        PipelineReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file,
            final_output,
            duration_ms: stages.iter().map(|s| s.duration_ms).sum(),
            rows_before: stages.first().map(|s| s.rows_before).unwrap_or(0),
            rows_after: stages.last().map(|s| s.rows_after).unwrap_or(0),
            stages,
        }
    }

    /// Write a report to a JSON file.
    ///
    /// For example, if `report_base_name` is "pipeline", the file will be
    /// "pipeline_report.json" inside the output directory.
    pub fn write_report_to_file(&self, report: &PipelineReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PipelineStage;

    fn stage(kind: PipelineStage, before: usize, after: usize) -> StageReport {
        let mut report = StageReport::new(kind).with_input_shape((before, 5));
        report.set_output_shape((after, 5));
        report.duration_ms = 10;
        report
    }

    #[test]
    fn test_build_report_spans_stages() {
        let mut first = stage(PipelineStage::MissingValues, 100, 90);
        first.input_file = Some("raw.csv".to_string());
        let mut last = stage(PipelineStage::OutlierFiltering, 80, 70);
        last.output_files.push("03.csv".to_string());
        last.add_warning("date skipped");

        let report = ReportGenerator::build_report(vec![first, last]);

        assert_eq!(report.rows_before, 100);
        assert_eq!(report.rows_after, 70);
        assert_eq!(report.duration_ms, 20);
        assert_eq!(report.input_file.as_deref(), Some("raw.csv"));
        assert_eq!(report.final_output.as_deref(), Some("03.csv"));
        assert_eq!(report.warnings(), vec!["[Outlier Filtering] date skipped".to_string()]);
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("reports"));
        let report = ReportGenerator::build_report(vec![stage(PipelineStage::Cleansing, 4, 2)]);

        let path = generator.write_report_to_file(&report, "pipeline").unwrap();

        assert!(path.ends_with("pipeline_report.json"));
        let written: PipelineReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.stages.len(), 1);
        assert_eq!(written.rows_after, 2);
    }
}
