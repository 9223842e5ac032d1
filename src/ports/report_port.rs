//! Report generation port trait.

use crate::domain::error::RiskplotError;
use crate::domain::pipeline::PortfolioRun;
use std::path::Path;

/// Port for writing the paged diagnostic report.
pub trait ReportPort {
    /// Write one page per instrument plus a combined page titled `title`.
    /// Fails as a whole if the document cannot be written.
    fn write(&self, run: &PortfolioRun, title: &str, output_path: &Path)
        -> Result<(), RiskplotError>;
}
