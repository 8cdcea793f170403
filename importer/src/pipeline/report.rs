//! End-of-run summary and resume hints.

use super::RunResult;

/// Resume commands printed before collapsing the rest into a count.
pub const MAX_RESUME_HINTS: usize = 5;

/// One re-invocation per failed ordinal, capped at [`MAX_RESUME_HINTS`].
pub fn resume_commands(base: &str, failed: &[usize]) -> Vec<String> {
    let mut lines: Vec<String> = failed
        .iter()
        .take(MAX_RESUME_HINTS)
        .map(|n| format!("{base} --start {n} --end {n}"))
        .collect();

    if failed.len() > MAX_RESUME_HINTS {
        lines.push(format!("... and {} more", failed.len() - MAX_RESUME_HINTS));
    }
    lines
}

/// Human-readable summary lines.
pub fn summary_lines(result: &RunResult, resume_base: &str) -> Vec<String> {
    let mut lines = Vec::new();

    let title = if result.dry_run { "Dry run summary" } else { "Run summary" };
    lines.push(format!("{} ({}, started {})", title, result.sector, result.started_at));
    lines.push(format!(
        "Units: {} processed of {} selected ({} in source)",
        result.units_processed, result.units_selected, result.units_total
    ));
    lines.push(format!("Records read: {}", result.records_read));

    if !result.dry_run {
        lines.push(format!(
            "Succeeded: {}, failed: {}",
            result.units_succeeded,
            result.failures.len()
        ));
        lines.push(format!("Records sent: {}", result.records_sent));
        lines.push(format!("Records acknowledged: {}", result.records_acknowledged));
    }

    match result.header_uploaded {
        Some(true) => lines.push("Header: uploaded".to_string()),
        Some(false) => lines.push("Header: FAILED".to_string()),
        None => {}
    }

    lines.push(format!("Elapsed: {:.1}s", result.elapsed.as_secs_f64()));

    if !result.failures.is_empty() {
        let ordinals: Vec<String> = result
            .failed_ordinals()
            .iter()
            .map(|n| n.to_string())
            .collect();
        lines.push(format!("Failed units: {}", ordinals.join(", ")));
        lines.push("Resume with:".to_string());
        lines.extend(
            resume_commands(resume_base, &result.failed_ordinals())
                .into_iter()
                .map(|l| format!("  {l}")),
        );
    }

    lines
}
