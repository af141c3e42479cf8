//! The `AllowUsers` list and the external user source it may come from.

use super::error::CompileError;
use crate::schema::Params;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// External provider of login names
pub trait UserSource: fmt::Debug {
    /// Where the names come from, for error messages
    fn origin(&self) -> String;

    /// Login names in source order
    fn fetch(&self) -> Result<Vec<String>>;
}

/// A directory export on disk.
///
/// LDIF exports are read from their `uid:` attributes; any other file is
/// read as one name per line, ignoring blanks and `#` comments.
#[derive(Debug, Clone)]
pub struct LdapExport {
    path: PathBuf,
}

impl LdapExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl UserSource for LdapExport {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        Ok(parse_export(&content))
    }
}

/// Extract login names from an export body
pub fn parse_export(content: &str) -> Vec<String> {
    let uid_values: Vec<String> = content
        .lines()
        .filter_map(|line| {
            let (attr, value) = line.split_once(':')?;
            attr.trim()
                .eq_ignore_ascii_case("uid")
                .then(|| value.trim().to_string())
        })
        .filter(|v| !v.is_empty())
        .collect();
    if !uid_values.is_empty() {
        return uid_values;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Derive the `AllowUsers` list.
///
/// Returns `None` when the directive is not managed. The external source is
/// read only when `use_ldapuser` is on and no static users are declared.
pub fn derive_allow_users(
    params: &Params,
    source: Option<&dyn UserSource>,
) -> Result<Option<Vec<String>>, CompileError> {
    if !params.manage_users_allow {
        return Ok(None);
    }

    if params.use_ldapuser {
        if !params.users.is_empty() {
            return Err(CompileError::Conflict(
                "use_ldapuser cannot be combined with a static users list".to_string(),
            ));
        }
        let Some(source) = source else {
            return Err(CompileError::Validation(
                "use_ldapuser is set but no user source is configured (ldapuser_source or --ldap-export)"
                    .to_string(),
            ));
        };

        let fetched = source.fetch().map_err(|e| CompileError::UserSource {
            origin: source.origin(),
            message: format!("{:#}", e),
        })?;
        let mut seen = HashSet::new();
        let users: Vec<String> = fetched
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();
        if users.is_empty() {
            return Err(CompileError::Validation(format!(
                "user source {} returned no users; AllowUsers would lock everyone out",
                source.origin()
            )));
        }
        return Ok(Some(users));
    }

    let users: Vec<String> = params
        .users
        .iter()
        .filter(|(_, user)| user.merged_over(&params.users_default).presence().is_present())
        .map(|(name, _)| name.clone())
        .collect();
    if users.is_empty() {
        return Err(CompileError::Validation(
            "manage_users_allow is set but no users are declared; AllowUsers would lock everyone out"
                .to_string(),
        ));
    }
    Ok(Some(users))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::params_with;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct FixedSource {
        names: Vec<String>,
        reads: Cell<usize>,
    }

    impl FixedSource {
        fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|n| n.to_string()).collect(),
                reads: Cell::new(0),
            }
        }
    }

    impl UserSource for FixedSource {
        fn origin(&self) -> String {
            "fixed".to_string()
        }

        fn fetch(&self) -> Result<Vec<String>> {
            self.reads.set(self.reads.get() + 1);
            Ok(self.names.clone())
        }
    }

    #[test]
    fn test_static_users() {
        let params = params_with(
            r#"
            manage_users_allow = true
            [users.alice]
            "#,
        );
        let users = derive_allow_users(&params, None).unwrap();
        assert_eq!(users, Some(vec!["alice".to_string()]));
    }

    #[test]
    fn test_static_users_are_sorted_and_skip_absent() {
        let params = params_with(
            r#"
            manage_users_allow = true
            [users.carol]
            [users.alice]
            [users.mallory]
            ensure = "absent"
            "#,
        );
        let users = derive_allow_users(&params, None).unwrap().unwrap();
        assert_eq!(users, vec!["alice", "carol"]);
    }

    #[test]
    fn test_external_source() {
        let params = params_with(
            r#"
            manage_users_allow = true
            use_ldapuser = true
            "#,
        );
        let source = FixedSource::new(&["bob", "carol", "bob"]);
        let users = derive_allow_users(&params, Some(&source)).unwrap();
        assert_eq!(users, Some(vec!["bob".to_string(), "carol".to_string()]));
    }

    #[test]
    fn test_conflict_checked_before_source_is_read() {
        let params = params_with(
            r#"
            manage_users_allow = true
            use_ldapuser = true
            [users.alice]
            "#,
        );
        let source = FixedSource::new(&["bob"]);
        let err = derive_allow_users(&params, Some(&source)).unwrap_err();
        assert!(matches!(err, CompileError::Conflict(_)));
        assert_eq!(source.reads.get(), 0);
    }

    #[test]
    fn test_empty_lists_are_rejected() {
        let params = params_with("manage_users_allow = true");
        assert!(matches!(
            derive_allow_users(&params, None),
            Err(CompileError::Validation(_))
        ));

        let params = params_with(
            r#"
            manage_users_allow = true
            use_ldapuser = true
            "#,
        );
        let source = FixedSource::new(&[]);
        assert!(matches!(
            derive_allow_users(&params, Some(&source)),
            Err(CompileError::Validation(_))
        ));
    }

    #[test]
    fn test_source_ignored_without_allow_management() {
        let params = params_with("use_ldapuser = true");
        let source = FixedSource::new(&["bob"]);
        assert_eq!(derive_allow_users(&params, Some(&source)).unwrap(), None);
        assert_eq!(source.reads.get(), 0);
    }

    #[test]
    fn test_parse_ldif_export() {
        let ldif = "dn: uid=bob,ou=people,dc=example,dc=com\nuid: bob\ncn: Bob\n\ndn: uid=carol,ou=people,dc=example,dc=com\nUID: carol\n";
        assert_eq!(parse_export(ldif), vec!["bob", "carol"]);
    }

    #[test]
    fn test_parse_plain_export() {
        assert_eq!(parse_export("# admins\nbob\n\n  carol \n"), vec!["bob", "carol"]);
    }

    #[test]
    fn test_ldap_export_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.ldif");
        fs::write(&path, "uid: dave\n").unwrap();
        assert_eq!(LdapExport::new(&path).fetch().unwrap(), vec!["dave"]);
        assert!(LdapExport::new(dir.path().join("missing")).fetch().is_err());
    }
}
