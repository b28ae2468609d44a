// Sweep comparison table: one CSV row per run.

use super::AnalysisReport;
use crate::error::Result;
use crate::trace::TraceSummary;
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 10] = [
    "name",
    "tracked_sent",
    "tracked_received",
    "drop_rate",
    "samples",
    "mean_latency_us",
    "min_latency_us",
    "max_latency_us",
    "mean_jitter_us",
    "throughput_mbps",
];

pub struct ReportLogger {
    path: PathBuf,
    writer: Writer<File>,
}

impl ReportLogger {
    /// Creates `<dir>/<stem>.csv` and writes the header.
    pub fn create(dir: impl AsRef<Path>, stem: &str) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("{}.csv", stem));
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(HEADER)?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_run(&mut self, summary: &TraceSummary, analysis: &AnalysisReport) -> Result<()> {
        let us = |s: f64| format!("{:.3}", s * 1e6);
        self.writer.write_record([
            summary.name.clone(),
            summary.tracked_sent.to_string(),
            summary.tracked_received.to_string(),
            format!("{:.6}", summary.drop_rate),
            analysis.samples.to_string(),
            us(analysis.mean_latency_s),
            us(analysis.min_latency_s),
            us(analysis.max_latency_s),
            us(analysis.mean_jitter_s),
            format!("{:.3}", analysis.mean_throughput_bytes_per_s * 8.0 / 1e6),
        ])?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }
}
