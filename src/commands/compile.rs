//! `sshcm compile` - show the catalog without touching the host

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::EdgeKind;

use super::Prepared;
use crate::Context;
use crate::catalog::Declaration;
use crate::cli::CompileArgs;
use crate::ui;

pub fn run(_ctx: &Context, args: CompileArgs) -> Result<()> {
    let prepared = super::prepare(&args.inputs)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&prepared.manifest)
                .context("Failed to serialize manifest")?
        );
        return Ok(());
    }

    if args.show_params {
        show_params(&prepared);
    }
    show_catalog(&prepared)
}

/// Every resolved top-level parameter and the layer that set it
fn show_params(prepared: &Prepared) {
    ui::section("Parameters");
    let layers: Vec<&str> = prepared
        .config
        .layers()
        .iter()
        .map(|l| l.name.as_str())
        .collect();
    ui::dim(&format!("layers, lowest first: {}", layers.join(", ")));
    let merged = prepared.config.merged();
    let mut entries: Vec<(&String, &toml::Value)> = merged.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in entries {
        let origin = prepared
            .config
            .lookup(key)
            .map_or("?", |(layer, _)| layer);
        println!("  {} = {} {}", key, value, format!("({})", origin).dimmed());
    }
}

fn summary(declaration: &Declaration) -> String {
    match declaration {
        Declaration::Package { ensure, .. } => format!("ensure {}", ensure),
        Declaration::File {
            content: None, ..
        } => "absent".to_string(),
        Declaration::File {
            owner, group, mode, ..
        } => format!("{}:{} {:04o}", owner, group, mode),
        Declaration::Service {
            running, enabled, ..
        } => format!(
            "{}, {}",
            if *running { "running" } else { "stopped" },
            if *enabled { "enabled" } else { "disabled" }
        ),
        Declaration::Group { params, .. } => match params.gid {
            Some(gid) => format!("{} gid {}", params.presence().as_str(), gid),
            None => params.presence().as_str().to_string(),
        },
        Declaration::User { params, .. } => params.presence().as_str().to_string(),
        Declaration::Hostkey { types, dir, .. } => {
            let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
            format!("{} in {}", types.join(", "), dir.display())
        }
        Declaration::KnownHosts { aliases, .. } if aliases.is_empty() => String::new(),
        Declaration::KnownHosts { aliases, .. } => format!("aliases {}", aliases.join(", ")),
    }
}

fn show_catalog(prepared: &Prepared) -> Result<()> {
    let manifest = &prepared.manifest;
    ui::header(&format!("Catalog for {}", prepared.node));
    ui::kv("platform", &manifest.platform.family);
    ui::kv("package", &manifest.platform.package);
    ui::kv("service", &manifest.platform.service);
    match &manifest.allow_users {
        Some(users) => ui::kv("AllowUsers", &users.join(" ")),
        None => ui::kv("AllowUsers", "unmanaged"),
    }

    let order = declarative::validate(&manifest.ids(), &manifest.edges)?;
    ui::section("Resources (convergence order)");
    for id in &order {
        let detail = manifest
            .declarations
            .iter()
            .find(|d| &d.id() == id)
            .map(summary)
            .unwrap_or_default();
        println!("  {:<44} {}", id.to_string(), detail.dimmed());
    }

    ui::section("Relationships");
    for edge in &manifest.edges {
        let arrow = match edge.kind {
            EdgeKind::Ordering => "→".normal(),
            EdgeKind::Notify => "~>".yellow(),
        };
        println!("  {} {} {}", edge.from, arrow, edge.to);
    }
    Ok(())
}
