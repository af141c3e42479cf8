//! Rendering of `sshd_config` and `ssh_known_hosts`.
//!
//! Both renderers are pure: the same inputs always produce the same bytes.

use super::platform::Platform;
use crate::schema::Params;

/// First line of every managed file
pub const HEADER: &str = "# This file is managed by sshcm. Local changes will be overwritten.";

/// A directive and its values, one output line per value
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    key: String,
    values: Vec<String>,
}

impl Directive {
    fn new(key: &str, values: Vec<String>) -> Self {
        Self {
            key: key.to_string(),
            values,
        }
    }
}

/// Render the `sshd_config` body.
///
/// Built-in directives come first, then the `options` map in key order. An
/// option whose key matches a built-in (ignoring case) replaces it in place;
/// `compile` rejects options that would replace a parameter-driven directive.
pub fn render_sshd_config(
    params: &Params,
    platform: &Platform,
    allow_users: Option<&[String]>,
) -> String {
    let config_dir = params
        .config_dir
        .clone()
        .unwrap_or_else(|| platform.config_dir.clone());

    let mut directives = vec![
        Directive::new("Port", vec![params.port.to_string()]),
        Directive::new("ListenAddress", params.listen_address.clone()),
        Directive::new(
            "PermitRootLogin",
            vec![params.permit_root_login.to_string()],
        ),
    ];
    if params.manage_hostkey {
        let keys = params
            .hostkey_types
            .iter()
            .map(|t| config_dir.join(t.file_name()).display().to_string())
            .collect();
        directives.push(Directive::new("HostKey", keys));
    }
    if let Some(users) = allow_users {
        directives.push(Directive::new("AllowUsers", vec![users.join(" ")]));
    }
    directives.push(Directive::new("UsePAM", vec!["yes".to_string()]));
    directives.push(Directive::new(
        "Subsystem",
        vec![format!("sftp {}", platform.sftp_server)],
    ));

    for (key, value) in &params.options {
        let directive = Directive::new(key, value.lines());
        match directives
            .iter_mut()
            .find(|d| d.key.eq_ignore_ascii_case(key))
        {
            Some(existing) => *existing = directive,
            None => directives.push(directive),
        }
    }

    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");
    for directive in &directives {
        for value in &directive.values {
            out.push_str(&format!("{} {}\n", directive.key, value));
        }
    }
    out
}

/// Render `ssh_known_hosts` from `(algorithm, key)` pairs
pub fn render_known_hosts(hostkey_name: &str, aliases: &[String], keys: &[(String, String)]) -> String {
    let mut names = vec![hostkey_name.to_string()];
    names.extend(aliases.iter().filter(|a| *a != hostkey_name).cloned());
    let names = names.join(",");

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');
    for (algorithm, key) in keys {
        out.push_str(&format!("{} {} {}\n", names, algorithm, key));
    }
    out
}
