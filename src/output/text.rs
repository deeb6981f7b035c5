use crate::load::{OutcomeStatus, RunReport, Summary};

/// Success rate in hundredths of a percent (`9_950` is 99.50%).
#[must_use]
pub fn success_rate_x100(summary: &Summary) -> u64 {
    if summary.total_requests == 0 {
        return 0;
    }
    let scaled = u128::from(summary.success_count)
        .saturating_mul(10_000)
        .checked_div(u128::from(summary.total_requests))
        .unwrap_or(0);
    u64::try_from(scaled).map_or(u64::MAX, |value| value)
}

#[must_use]
pub fn render_text(report: &RunReport) -> String {
    summary_lines(&report.summary)
        .into_iter()
        .chain(result_lines(report))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_lines(summary: &Summary) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("Total Requests: {}", summary.total_requests));
    lines.push(format!(
        "Successful: {} ({}%)",
        summary.success_count,
        format_x100(success_rate_x100(summary))
    ));
    lines.push(format!("Failed: {}", summary.failed_count));
    lines.push(format!("Avg Time: {}ms", summary.average_ms));
    lines.push(format!(
        "Min/Max Time: {}ms / {}ms",
        summary.min_ms, summary.max_ms
    ));
    lines
}

fn result_lines(report: &RunReport) -> Vec<String> {
    if report.results.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::with_capacity(report.results.len().saturating_add(2));
    lines.push(String::new());
    lines.push(format!("{:>6}  {:>6}  {:>8}  Error", "#", "Status", "Time"));
    for outcome in &report.results {
        let status = match outcome.status() {
            OutcomeStatus::Code(code) => code.to_string(),
            OutcomeStatus::Error => OutcomeStatus::ERROR_SENTINEL.to_owned(),
        };
        let time = format!("{}ms", outcome.elapsed_ms());
        let line = format!(
            "{:>6}  {:>6}  {:>8}  {}",
            outcome.index(),
            status,
            time,
            outcome.error_message().unwrap_or("")
        );
        lines.push(line.trim_end().to_owned());
    }
    lines
}

fn format_x100(value: u64) -> String {
    format!("{}.{:02}", value / 100, value % 100)
}
