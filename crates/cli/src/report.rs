use colored::*;
use hedra_batch_core::orchestrator::OutcomeRow;
use hedra_batch_core::BatchReport;

/// Print the per-clip outcome table and the summary line.
pub fn print_report(report: &BatchReport) {
    let rows = report.outcome_rows();
    let width = rows
        .iter()
        .map(|r| r.clip.len())
        .max()
        .unwrap_or(0)
        .max("CLIP".len());

    println!();
    println!("{:<width$}  {:<13}  {}", "CLIP".bold(), "STATUS".bold(), "DETAIL".bold());
    for row in &rows {
        println!(
            "{:<width$}  {:<13}  {}",
            row.clip,
            colorize_status(row),
            row.detail
        );
    }
    println!();

    let summary = summary_line(report);
    if report.all_succeeded() {
        println!("{}", summary.green().bold());
    } else if report.cancelled {
        println!("{} {}", summary.yellow().bold(), "(cancelled)".dimmed());
    } else {
        println!("{}", summary.red().bold());
    }
}

fn summary_line(report: &BatchReport) -> String {
    format!(
        "Batch finished: {} in {:.1}s",
        report.summary(),
        report.duration().as_secs_f64()
    )
}

fn colorize_status(row: &OutcomeRow) -> ColoredString {
    match row.status {
        "succeeded" => row.status.green(),
        "reused" => row.status.cyan(),
        "not_attempted" => row.status.dimmed(),
        _ => row.status.red(),
    }
}

/// Process exit code for a finished batch.
pub fn exit_code(report: &BatchReport) -> i32 {
    if report.all_succeeded() {
        0
    } else {
        1
    }
}
