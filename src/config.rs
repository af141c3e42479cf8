//! Layered parameter resolution.
//!
//! Layers are kept lowest priority first and queried highest priority
//! first. Tables are merged recursively; any other value replaces what the
//! lower layers said. After the merge every key in [`REQUIRED_KEYS`] must
//! be present before the table is parsed into [`Params`].
//!
//! Layers, lowest to highest:
//! 1. built-in defaults (`data/defaults.toml`)
//! 2. facts (`hostkey_name` = FQDN)
//! 3. `<config_dir>/site.toml`
//! 4. `<config_dir>/nodes/<node>.toml`
//! 5. the `--params` file
//! 6. `--set key=value` overrides

use crate::catalog::CompileError;
use crate::facts::Facts;
use crate::schema::{Params, REQUIRED_KEYS};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

/// Built-in module defaults
pub const DEFAULTS: &str = include_str!("../data/defaults.toml");

/// One named source of parameters
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub table: toml::Table,
}

/// An ordered stack of parameter layers
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    layers: Vec<Layer>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full stack for one node
    pub fn load(
        config_dir: &Path,
        node: &str,
        facts: &Facts,
        params_file: Option<&Path>,
        overrides: &[String],
    ) -> Result<Self> {
        let mut config = Self::new();
        config.push("defaults", toml::from_str(DEFAULTS).context("Invalid built-in defaults")?);
        config.push("facts", facts_layer(facts));
        config.push_file("site", &config_dir.join("site.toml"), false)?;
        config.push_file(
            &format!("node {}", node),
            &config_dir.join("nodes").join(format!("{}.toml", node)),
            false,
        )?;
        if let Some(path) = params_file {
            config.push_file("params file", path, true)?;
        }
        if !overrides.is_empty() {
            let mut table = toml::Table::new();
            for raw in overrides {
                let (key, value) = parse_override(raw)?;
                set_dotted(&mut table, &key, value);
            }
            config.push("--set", table);
        }
        Ok(config)
    }

    /// Add a layer above every existing one
    pub fn push(&mut self, name: &str, table: toml::Table) {
        log::debug!("parameter layer '{}': {} keys", name, table.len());
        self.layers.push(Layer {
            name: name.to_string(),
            table,
        });
    }

    /// Add a TOML file as a layer; optional files may be missing
    pub fn push_file(&mut self, name: &str, path: &Path, required: bool) -> Result<()> {
        if !path.exists() {
            if required {
                bail!("Parameter file not found: {}", path.display());
            }
            log::debug!("no {} layer at {}", name, path.display());
            return Ok(());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        self.push(name, table);
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Highest-priority value for a top-level key and the layer it came from
    pub fn lookup(&self, key: &str) -> Option<(&str, &toml::Value)> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.table.get(key).map(|v| (layer.name.as_str(), v)))
    }

    /// Deep-merge every layer
    pub fn merged(&self) -> toml::Table {
        let mut merged = toml::Table::new();
        for layer in &self.layers {
            merge_into(&mut merged, &layer.table);
        }
        merged
    }

    /// Merge, check required keys, and parse
    pub fn resolve(&self) -> Result<Params, CompileError> {
        let merged = self.merged();
        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !merged.contains_key(**key)) {
            return Err(CompileError::MissingParameter((*missing).to_string()));
        }

        let text = toml::to_string(&merged)
            .map_err(|e| CompileError::InvalidParameter(e.to_string()))?;
        toml::from_str(&text).map_err(|e| CompileError::InvalidParameter(e.message().to_string()))
    }
}

fn facts_layer(facts: &Facts) -> toml::Table {
    let mut table = toml::Table::new();
    if !facts.fqdn.is_empty() {
        table.insert(
            "hostkey_name".to_string(),
            toml::Value::String(facts.fqdn.clone()),
        );
    }
    table
}

/// Merge `layer` over `base`: tables recurse, everything else replaces
fn merge_into(base: &mut toml::Table, layer: &toml::Table) {
    for (key, value) in layer {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Parse `key=value`; the value is read as TOML, falling back to a string
pub fn parse_override(raw: &str) -> Result<(String, toml::Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Invalid override '{}': expected KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() || key.split('.').any(str::is_empty) {
        bail!("Invalid override '{}': empty key", raw);
    }

    let value = value.trim();
    let parsed = toml::from_str::<toml::Table>(&format!("value = {}", value))
        .ok()
        .and_then(|mut t| t.remove("value"))
        .unwrap_or_else(|| toml::Value::String(value.to_string()));
    Ok((key.to_string(), parsed))
}

/// Insert a value at a dotted path, creating intermediate tables
fn set_dotted(table: &mut toml::Table, key: &str, value: toml::Value) {
    let mut parts: Vec<&str> = key.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = table;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !entry.is_table() {
            *entry = toml::Value::Table(toml::Table::new());
        }
        let toml::Value::Table(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

// ============================================================================
// Tests
// ============================================================================
