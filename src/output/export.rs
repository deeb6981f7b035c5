use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::load::RunReport;

/// Writes the full `{ summary, results }` report as pretty JSON.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub async fn export_json(path: &Path, report: &RunReport) -> Result<(), std::io::Error> {
    let json = serde_json::to_vec_pretty(report).map_err(std::io::Error::other)?;
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&json).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    info!("Report written to {}", path.display());
    Ok(())
}
