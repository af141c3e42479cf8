//! `sshcm render` - print managed file contents

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::cli::RenderArgs;
use crate::ui;

pub fn run(ctx: &Context, args: RenderArgs) -> Result<()> {
    let prepared = super::prepare(&args.inputs)?;

    let files: Vec<_> = prepared
        .manifest
        .files()
        .filter(|(path, _)| args.file.as_ref().is_none_or(|wanted| wanted == *path))
        .collect();

    if files.is_empty() {
        if let Some(wanted) = &args.file {
            bail!("{} is not a managed file", wanted.display());
        }
        ui::warn("No managed files (ensure = \"absent\")");
        return Ok(());
    }

    for (path, content) in files {
        if !ctx.quiet {
            eprintln!("{}", format!("# ==> {} <==", path.display()).dimmed());
        }
        print!("{}", content);
    }
    Ok(())
}
