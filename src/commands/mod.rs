//! Command implementations
//!
//! Every command that needs a catalog goes through [`prepare`]: gather
//! facts, stack the parameter layers, resolve, and compile. Compilation
//! errors surface here, before any resource touches the host.

pub mod apply;
pub mod compile;
pub mod diff;
pub mod facts;
pub mod render;
pub mod status;

use anyhow::{Context as AnyhowContext, Result};
use declarative::Graph;
use hostkit::SystemRunner;

use crate::catalog::{self, LdapExport, Manifest, UserSource};
use crate::cli::Inputs;
use crate::config::LayeredConfig;
use crate::facts::Facts;
use crate::paths;
use crate::resource::{self, Host};
use crate::schema::Params;

/// A compiled catalog and everything it was compiled from
#[derive(Debug)]
pub struct Prepared {
    pub node: String,
    pub facts: Facts,
    pub config: LayeredConfig,
    pub params: Params,
    pub manifest: Manifest,
}

/// Facts of the running host
pub fn gather_facts() -> Result<Facts> {
    Facts::gather(&SystemRunner::new()).context("Could not gather host facts")
}

/// Gather facts and compile
pub fn prepare(inputs: &Inputs) -> Result<Prepared> {
    prepare_with(inputs, gather_facts()?)
}

/// Compile from already gathered facts
pub fn prepare_with(inputs: &Inputs, facts: Facts) -> Result<Prepared> {
    let config_dir = match &inputs.config_dir {
        Some(dir) => dir.clone(),
        None => paths::config_dir()?,
    };
    let node = inputs
        .node
        .clone()
        .unwrap_or_else(|| facts.hostname.clone());
    log::debug!("compiling for node '{}' from {}", node, config_dir.display());

    let config = LayeredConfig::load(
        &config_dir,
        &node,
        &facts,
        inputs.params.as_deref(),
        &inputs.set,
    )?;
    let params = config.resolve()?;

    let source = inputs
        .ldap_export
        .clone()
        .or_else(|| {
            params
                .ldapuser_source
                .as_ref()
                .map(|p| paths::expand(&p.to_string_lossy()))
        })
        .map(LdapExport::new);
    let manifest = catalog::compile(
        &params,
        &facts,
        source.as_ref().map(|s| s as &dyn UserSource),
    )?;
    log::info!(
        "compiled {} resources and {} edges for {}",
        manifest.declarations.len(),
        manifest.edges.len(),
        node
    );

    Ok(Prepared {
        node,
        facts,
        config,
        params,
        manifest,
    })
}

/// Executable graph for the running system, optionally narrowed to a target
pub fn system_graph(prepared: &Prepared, inputs: &Inputs, target: Option<&str>) -> Result<Graph> {
    let host = Host::system(&prepared.manifest.platform.family, inputs.root.clone())?;
    let graph = resource::instantiate(&prepared.manifest, &host)?
        .filter_by_target(target)
        .into_graph()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CompileError;
    use std::fs;

    fn facts() -> Facts {
        Facts::from_parts(
            "web1".into(),
            "web1.example.com".into(),
            "ID=rocky\nID_LIKE=\"rhel centos fedora\"\n",
        )
    }

    fn inputs(dir: &std::path::Path) -> Inputs {
        Inputs {
            config_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prepare_uses_node_layer_and_facts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nodes")).unwrap();
        fs::write(dir.path().join("nodes").join("web1.toml"), "port = 2222\n").unwrap();

        let prepared = prepare_with(&inputs(dir.path()), facts()).unwrap();
        assert_eq!(prepared.node, "web1");
        assert_eq!(prepared.params.port, 2222);
        assert_eq!(prepared.manifest.platform.service, "sshd");
        let (_, config) = prepared.manifest.files().next().unwrap();
        assert!(config.contains("\nPort 2222\n"));
    }

    #[test]
    fn test_ldap_export_argument() {
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("users.ldif");
        fs::write(&export, "dn: uid=bob,ou=people\nuid: bob\n\ndn: uid=carol\nuid: carol\n").unwrap();

        let mut inputs = inputs(dir.path());
        inputs.set = vec![
            "manage_users_allow=true".to_string(),
            "use_ldapuser=true".to_string(),
        ];
        inputs.ldap_export = Some(export);

        let prepared = prepare_with(&inputs, facts()).unwrap();
        assert_eq!(
            prepared.manifest.allow_users,
            Some(vec!["bob".to_string(), "carol".to_string()])
        );
    }

    #[test]
    fn test_compile_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut inputs = inputs(dir.path());
        inputs.set = vec!["osfamily=Windows".to_string()];

        let err = prepare_with(&inputs, facts()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompileError>(),
            Some(CompileError::UnsupportedPlatform(_))
        ));
    }
}
