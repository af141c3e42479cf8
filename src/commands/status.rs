//! `sshcm status` - outcome of the last apply

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::engine::executor::print_report;
use crate::state::LastRun;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let path = LastRun::default_path()?;
    let Some(last) = LastRun::load(&path)? else {
        ui::info("No run recorded yet");
        ui::dim(&format!("Runs are recorded in {}", path.display()));
        return Ok(());
    };

    ui::header("Last run");
    ui::kv("host", &last.host);
    ui::kv(
        "finished",
        &last.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    ui::kv("mode", if last.dry_run { "dry run" } else { "apply" });
    let outcome = if last.report.cancelled {
        "cancelled".yellow()
    } else if last.success {
        "success".green()
    } else {
        "failed".red()
    };
    ui::kv("outcome", &outcome.to_string());

    let summary = &last.summary;
    ui::kv(
        "resources",
        &format!(
            "{} changed, {} unchanged, {} failed, {} skipped",
            summary.applied, summary.no_change, summary.failed, summary.skipped
        ),
    );
    ui::kv("changes", &summary.changes.to_string());
    print_report(&last.report, ctx.verbose > 0);
    Ok(())
}
