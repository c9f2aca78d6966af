//! Plain-text rendering of a report, shared by all transports.

use vigil_report::Report;

/// Render the notification body: aggregate counts first, then the failure
/// cards in source order.
pub fn render_body(report: &Report) -> String {
    let mut body = format!(
        "total: {} | success: {} | failures: {}",
        report.total,
        report.success_count,
        report.failure_count()
    );
    if report.failures.is_empty() {
        body.push_str("\nAll subjects passed.");
        return body;
    }
    body.push_str("\nFailed subjects:");
    for f in &report.failures {
        body.push_str(&format!(
            "\n· {} | duration: {}\n   error: {}",
            f.subject_id, f.duration, f.detail
        ));
    }
    body
}

/// Short title line, including the source timestamp when the page had one.
pub fn render_title(report: &Report) -> String {
    match report.generated_at {
        Some(ts) => format!("Status report — {}", ts.format("%Y-%m-%d %H:%M UTC")),
        None => "Status report".to_string(),
    }
}
