//! Diff display - what a run would change

use colored::Colorize;
use declarative::{ApplyError, DiffSummary, ResourceDiff, find_change, group_by_kind};
use similar::{ChangeTag, TextDiff};

fn kind_heading(kind: &str) -> &str {
    match kind {
        "Package" => "Packages",
        "File" => "Files",
        "Service" => "Services",
        "Group" => "Groups",
        "User" => "Users",
        "Hostkey" => "Host keys",
        "KnownHosts" => "Known hosts",
        other => other,
    }
}

/// One-line description of the changes to a resource
fn describe(diff: &ResourceDiff) -> String {
    if diff.is_removal() {
        return "(will remove)".to_string();
    }
    if diff.is_addition() {
        let details: Vec<String> = diff
            .changes
            .iter()
            .filter(|c| c.property != declarative::ENSURE && c.property != "content")
            .map(|c| format!("{}={}", c.property, c.to))
            .collect();
        let ensure = find_change(&diff.changes, declarative::ENSURE).map_or("present", |c| c.to.as_str());
        return if details.is_empty() {
            format!("(absent) → {}", ensure)
        } else {
            format!("(absent) → {} {}", ensure, details.join(" "))
        };
    }
    diff.changes
        .iter()
        .map(|c| {
            format!(
                "{}: {} → {}",
                c.property,
                c.from.as_deref().unwrap_or("<unset>"),
                c.to
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Display a list of diffs grouped by resource kind
pub fn display_diff(diffs: &[ResourceDiff], errors: &[ApplyError]) {
    for error in errors {
        println!("  {} {}", "⚠".yellow(), error);
    }

    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Configuration Diff".bold()
    );
    println!("│");

    for (kind, kind_diffs) in group_by_kind(diffs) {
        println!("│ {}", kind_heading(&kind).bold());
        for diff in kind_diffs {
            let symbol = if diff.is_addition() {
                "+".green()
            } else if diff.is_removal() {
                "-".red()
            } else {
                "~".yellow()
            };
            println!(
                "│   {} {:<36} {}",
                symbol,
                diff.resource_id.title,
                describe(diff).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Unified diff of a managed file; `None` when the contents match
pub fn content_diff(path: &str, current: &str, desired: &str) -> Option<String> {
    if current == desired {
        return None;
    }
    let diff = TextDiff::from_lines(current, desired);
    let mut out = String::new();
    out.push_str(&format!("--- {} (current)\n+++ {} (desired)\n", path, path));
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            out.push_str(sign);
            out.push_str(change.value());
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    Some(out)
}

/// Print a unified diff with colored lines
pub fn display_content_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}
