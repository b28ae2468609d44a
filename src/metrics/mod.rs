pub mod analyzer;
pub mod logger;

pub use analyzer::AnalysisReport;
pub use logger::ReportLogger;
