//! `sshcm apply` - converge the host

use anyhow::Result;
use declarative::{CancelToken, RunReport};
use std::process::ExitCode;
use std::time::Duration;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, RunOptions};
use crate::paths;
use crate::signal;
use crate::state::LastRun;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<ExitCode> {
    let prepared = super::prepare(&args.inputs)?;
    let graph = super::system_graph(&prepared, &args.inputs, args.target.as_deref())?;

    if !args.dry_run && args.inputs.root.is_none() && !paths::is_root() {
        ui::warn("Not running as root; most changes will fail");
    }

    let cancel = CancelToken::new();
    signal::cancel_on_interrupt(&cancel);

    let opts = RunOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        jobs: args.jobs,
        step_timeout: Duration::from_secs(args.timeout),
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    let Some(report) = engine::run(&graph, &opts, &cancel)? else {
        return Ok(ExitCode::SUCCESS);
    };

    if !args.no_state {
        record(&prepared.node, &report);
    }
    Ok(ExitCode::from(exit_status(&report, args.detailed_exitcodes)))
}

/// Persist the run; failing to record never fails the run
fn record(node: &str, report: &RunReport) {
    let result = LastRun::default_path().and_then(|path| {
        LastRun::new(node, report.clone()).save(&path)?;
        Ok(path)
    });
    match result {
        Ok(path) => log::info!("recorded run in {}", path.display()),
        Err(e) => ui::warn(&format!("Could not record run: {:#}", e)),
    }
}

/// 1 on failure or cancellation; 2 for changes with detailed exit codes
pub fn exit_status(report: &RunReport, detailed: bool) -> u8 {
    if !report.is_success() || report.cancelled {
        1
    } else if detailed && report.changed().next().is_some() {
        2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{
        ApplyError, Change, Operation, ResourceId, ResourceReport, ResourceStatus,
    };

    fn report(status: ResourceStatus, changed: bool) -> RunReport {
        let id = ResourceId::new("Service", "ssh");
        let mut resource = ResourceReport::new(id.clone());
        resource.transition(status);
        if changed {
            resource.changes.push(Change::new("enable", Some("false"), "true"));
        }
        if status == ResourceStatus::Failed {
            resource.error = Some(ApplyError::Operation {
                resource: id,
                operation: Operation::Apply,
                cause: "exit 1".to_string(),
            });
        }
        RunReport {
            resources: vec![resource],
            ..Default::default()
        }
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&report(ResourceStatus::NoChange, false), true), 0);
        assert_eq!(exit_status(&report(ResourceStatus::Applied, true), false), 0);
        assert_eq!(exit_status(&report(ResourceStatus::Applied, true), true), 2);
        assert_eq!(exit_status(&report(ResourceStatus::Failed, false), true), 1);
    }

    #[test]
    fn test_cancelled_run_fails() {
        let mut cancelled = report(ResourceStatus::NoChange, false);
        cancelled.cancelled = true;
        assert_eq!(exit_status(&cancelled, false), 1);
    }
}
