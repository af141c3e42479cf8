//! `sshcm diff` - preview what apply would change

use anyhow::Result;
use std::fs;
use std::time::Duration;

use crate::Context;
use crate::cli::DiffArgs;
use crate::engine::differ::{content_diff, display_content_diff, display_diff};
use crate::paths;

pub fn run(_ctx: &Context, args: DiffArgs) -> Result<()> {
    let prepared = super::prepare(&args.inputs)?;
    let graph = super::system_graph(&prepared, &args.inputs, args.target.as_deref())?;

    let (diffs, errors) = declarative::compute_diffs(&graph, Duration::from_secs(args.timeout));
    display_diff(&diffs, &errors);

    // Full content of changed files; the property diff only carries digests
    for (path, desired) in prepared.manifest.files() {
        let changed = diffs
            .iter()
            .any(|d| d.resource_id.kind == "File" && d.resource_id.title == path.display().to_string());
        if !changed {
            continue;
        }
        let real = paths::under_root(args.inputs.root.as_deref(), path);
        let current = fs::read_to_string(&real).unwrap_or_default();
        if let Some(diff) = content_diff(&path.display().to_string(), &current, desired) {
            println!();
            display_content_diff(&diff);
        } else {
            log::info!("{} differs only in metadata", path.display());
        }
    }
    Ok(())
}
