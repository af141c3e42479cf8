//! Progress indicators for sshcm runs

#![allow(clippy::expect_used)] // Templates are compile-time constants

use colored::Colorize;
use declarative::{ProgressCallback, ResourceId, ResourceReport};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over a fixed number of resources
pub fn bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {prefix:.cyan} {bar:30.cyan/dim} {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("━━─"),
    );
    pb.set_prefix(msg.to_string());
    pb
}

/// Drives a progress bar from executor callbacks
///
/// Failures are printed above the bar as they happen.
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(label: &str, hidden: bool) -> Self {
        let pb = if hidden {
            ProgressBar::hidden()
        } else {
            bar(0, label)
        };
        Self { pb }
    }
}

impl ProgressCallback for BarProgress {
    fn on_run_start(&mut self, total: usize) {
        self.pb.set_length(total as u64);
    }

    fn on_resource_start(&mut self, id: &ResourceId) {
        self.pb.set_message(id.to_string());
    }

    fn on_resource_complete(&mut self, report: &ResourceReport) {
        if let Some(error) = &report.error {
            self.pb
                .println(format!("    {} {}", "✗".red(), error));
        }
        self.pb.inc(1);
    }

    fn on_run_complete(&mut self) {
        self.pb.finish_and_clear();
    }
}
