// src/core/commons.rs

use crate::constants::NAMESPACE_SEPARATOR;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid");
    static ref CLI_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("cli name regex is valid");
}

/// True for names a function or parameter could be declared with.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// True for names that can be typed on a command line as a task name or alias.
pub fn is_cli_name(name: &str) -> bool {
    CLI_NAME_RE.is_match(name)
}

/// `dry_run` -> `dry-run`. Leading and trailing underscores are dropped.
pub fn hyphenate(identifier: &str) -> String {
    identifier.trim_matches('_').replace('_', "-")
}

/// Prepends `namespace` to `name` using `separator`. An empty namespace leaves the name alone.
pub fn prefix_name(namespace: Option<&str>, separator: &str, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}{}{}", ns, separator, name),
        _ => name.to_string(),
    }
}

/// Dotted namespace join, e.g. `("docs", "build")` -> `docs.build`.
pub fn namespaced(namespace: Option<&str>, name: &str) -> String {
    prefix_name(namespace, NAMESPACE_SEPARATOR, name)
}

/// The first non-empty line of a doc string, trimmed.
pub fn first_line(doc: &str) -> Option<&str> {
    doc.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("dry_run"), "dry-run");
        assert_eq!(hyphenate("_private_task"), "private-task");
        assert_eq!(hyphenate("plain"), "plain");
    }

    #[test]
    fn test_namespace_prefixing() {
        assert_eq!(namespaced(Some("docs"), "build"), "docs.build");
        assert_eq!(namespaced(Some(""), "build"), "build");
        assert_eq!(namespaced(None, "build"), "build");
        assert_eq!(prefix_name(Some("d"), "", "b"), "db");
    }

    #[test]
    fn test_name_validation() {
        assert!(is_identifier("_hidden_task"));
        assert!(!is_identifier("1abc"));
        assert!(is_cli_name("docs.build-all"));
        assert!(!is_cli_name("build:"));
        assert!(!is_cli_name("-x"));
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  Build it.\n More text"), Some("Build it."));
        assert_eq!(first_line("   "), None);
    }
}
