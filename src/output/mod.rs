//! Rendering and export of a finished [`RunReport`](crate::load::RunReport).
mod export;
mod text;


use std::io::Write;

use crate::args::OutputFormat;
use crate::error::AppResult;
use crate::load::RunReport;

pub use export::export_json;
pub use text::{render_text, success_rate_x100};

/// Writes the report to stdout in the requested format.
///
/// # Errors
///
/// Returns an error when the report cannot be serialized or stdout is closed.
pub fn print_report(report: &RunReport, format: OutputFormat) -> AppResult<()> {
    let rendered = match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    stdout.flush()?;
    Ok(())
}
