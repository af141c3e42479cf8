//! `sshcm facts` - what the host reports about itself

use anyhow::{Context as AnyhowContext, Result};

use crate::Context;
use crate::facts::Facts;
use crate::ui;

pub fn run(_ctx: &Context, json: bool) -> Result<()> {
    let facts = super::gather_facts()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&facts).context("Failed to serialize facts")?
        );
        return Ok(());
    }
    show(&facts);
    Ok(())
}

fn show(facts: &Facts) {
    ui::header("Host facts");
    ui::kv("hostname", &facts.hostname);
    ui::kv("fqdn", &facts.fqdn);
    ui::kv("os", facts.os_name.as_deref().unwrap_or("unknown"));
    ui::kv("os id", facts.os_id.as_deref().unwrap_or("unknown"));
    if !facts.os_id_like.is_empty() {
        ui::kv("os id like", &facts.os_id_like.join(" "));
    }
    match &facts.osfamily {
        Some(family) => ui::kv("osfamily", family),
        None => ui::warn("OS family not recognized; set the osfamily parameter"),
    }
}
