//! Execution engine - interactive wrapper around the declarative executor

use anyhow::Result;
use colored::Colorize;
use declarative::{
    CancelToken, ExecuteOptions, ExecuteSummary, Graph, ResourceStatus, RunReport, compute_diffs,
};
use std::time::Duration;

use super::differ::display_diff;
use crate::progress::BarProgress;

/// Options for an interactive run (adds confirmation to the engine options)
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Compute and report deltas without applying them
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    pub jobs: usize,
    pub step_timeout: Duration,
    pub verbose: bool,
    /// No progress bar
    pub quiet: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        let engine = ExecuteOptions::default();
        Self {
            dry_run: false,
            yes: false,
            jobs: engine.jobs,
            step_timeout: engine.step_timeout,
            verbose: false,
            quiet: false,
        }
    }
}

impl RunOptions {
    fn engine(&self) -> ExecuteOptions {
        ExecuteOptions {
            dry_run: self.dry_run,
            jobs: self.jobs.max(1),
            step_timeout: self.step_timeout,
            verbose: self.verbose,
        }
    }
}

/// Show the diff, confirm, converge, and print the report
///
/// Returns `None` when the user declined.
pub fn run(graph: &Graph, opts: &RunOptions, cancel: &CancelToken) -> Result<Option<RunReport>> {
    // 1. Show what will change
    let (diffs, errors) = compute_diffs(graph, opts.step_timeout);
    display_diff(&diffs, &errors);

    // 2. Confirm (unless --yes or nothing to do)
    let pending = !diffs.is_empty() || !errors.is_empty();
    if pending && !opts.yes && !opts.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(None);
    }

    // 3. Converge
    if pending && !opts.dry_run {
        println!();
        println!("  {} Applying {} resources...", "→".cyan(), graph.len());
    }
    let mut progress = BarProgress::new("Converging", opts.quiet || !pending);
    let report = declarative::execute(graph, &opts.engine(), cancel, &mut progress)?;

    // 4. Report
    print_report(&report, opts.verbose);
    print_summary(&report);
    Ok(Some(report))
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Per-resource lines; unchanged resources only when verbose
pub fn print_report(report: &RunReport, verbose: bool) {
    let lines: Vec<_> = report
        .resources
        .iter()
        .filter(|r| verbose || r.status != ResourceStatus::NoChange || r.refreshed)
        .collect();
    if lines.is_empty() {
        return;
    }

    println!();
    for resource in lines {
        let symbol = match resource.status {
            ResourceStatus::Applied => resource.status.symbol().green(),
            ResourceStatus::Failed => resource.status.symbol().red(),
            ResourceStatus::Skipped => resource.status.symbol().yellow(),
            _ => resource.status.symbol().dimmed(),
        };
        let mut detail = match (&resource.error, &resource.skipped) {
            (Some(error), _) => error.to_string(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) => resource.status.to_string(),
        };
        if resource.refreshed {
            detail.push_str(if report.dry_run { ", would refresh" } else { ", refreshed" });
        }
        println!("    {} {:<44} {}", symbol, resource.id, detail.dimmed());
        for change in &resource.changes {
            println!("        {}", change.to_string().dimmed());
        }
    }
}

/// Print final summary
pub fn print_summary(report: &RunReport) {
    let summary: ExecuteSummary = report.summary();
    println!();
    if report.cancelled {
        println!("  {} Run cancelled", "⚠".yellow().bold());
    } else if report.dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} Configuration applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Configuration applied with errors", "⚠".yellow().bold());
    }

    if summary.applied > 0 {
        println!("    • {} resources changed", summary.applied);
    }
    if summary.no_change > 0 {
        println!("    • {} resources unchanged", summary.no_change);
    }
    if summary.refreshed > 0 {
        println!("    • {} resources refreshed", summary.refreshed);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ApplyContext, ApplyError, Catalog, Change, Resource, ResourceId, ResourceState};
    use std::sync::Arc;
    use std::time::Instant;

    /// A package whose state query never returns in time
    #[derive(Debug)]
    struct Stuck;

    impl Resource for Stuck {
        fn id(&self) -> ResourceId {
            ResourceId::new("Package", "stuck")
        }

        fn current_state(&self) -> anyhow::Result<ResourceState> {
            std::thread::sleep(Duration::from_secs(2));
            Ok(ResourceState::absent())
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::new().with(declarative::ENSURE, "present")
        }

        fn apply(&self, _changes: &[Change], _ctx: &ApplyContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_run_bounds_every_query() {
        let mut catalog = Catalog::new();
        catalog.add(Arc::new(Stuck)).unwrap();
        let graph = catalog.into_graph().unwrap();
        let opts = RunOptions {
            yes: true,
            quiet: true,
            step_timeout: Duration::from_millis(50),
            ..Default::default()
        };

        let started = Instant::now();
        let report = run(&graph, &opts, &CancelToken::new()).unwrap().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!report.is_success());
        assert!(matches!(
            report.resources[0].error,
            Some(ApplyError::Timeout { .. })
        ));
    }
}
