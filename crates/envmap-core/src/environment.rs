//! Host environment lookup
//!
//! The map only consults the host environment for names it does not hold
//! itself. The capability is injected so the map can be exercised without
//! touching process-wide state.

use std::collections::HashMap;

/// Trait for host environment implementations
pub trait EnvironmentLookup: Send + Sync {
    /// Look up `name`, returning `None` when it is not set.
    ///
    /// `Some(String::new())` is a set-but-empty variable and is distinct
    /// from `None`.
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads the environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentLookup for ProcessEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        // std::env may panic on names the OS cannot represent
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return None;
        }
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

/// A fixed, in-memory environment
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    vars: HashMap<String, String>,
}

impl StaticEnvironment {
    /// Create an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, builder style
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Add or replace a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl<K, V> FromIterator<(K, V)> for StaticEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentLookup for StaticEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// A simple function-based lookup
pub struct FnLookup<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    func: F,
}

impl<F> FnLookup<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    /// Create a new function-based lookup
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> EnvironmentLookup for FnLookup<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn lookup(&self, name: &str) -> Option<String> {
        (self.func)(name)
    }
}

/// Strip the trailing NUL padding some OS calls leave behind
pub(crate) fn strip_nul_padding(value: &str) -> &str {
    value.trim_end_matches('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_environment_reads_path() {
        // PATH is set for any test runner we care about
        let expected = std::env::var("PATH").ok();
        assert_eq!(ProcessEnvironment.lookup("PATH"), expected);
    }

    #[test]
    fn test_process_environment_missing() {
        assert_eq!(
            ProcessEnvironment.lookup("ENVMAP_DEFINITELY_NOT_SET_4F2A"),
            None
        );
    }

    #[test]
    fn test_process_environment_unrepresentable_names() {
        assert_eq!(ProcessEnvironment.lookup(""), None);
        assert_eq!(ProcessEnvironment.lookup("A=B"), None);
        assert_eq!(ProcessEnvironment.lookup("A\0B"), None);
    }

    #[test]
    fn test_static_environment() {
        let env = StaticEnvironment::new()
            .with_var("HOME", "/home/me")
            .with_var("EMPTY", "");

        assert_eq!(env.lookup("HOME"), Some("/home/me".into()));
        assert_eq!(env.lookup("EMPTY"), Some(String::new()));
        assert_eq!(env.lookup("MISSING"), None);
    }

    #[test]
    fn test_static_environment_from_iter() {
        let mut env: StaticEnvironment = [("A", "1"), ("B", "2")].into_iter().collect();
        env.set("A", "3");

        assert_eq!(env.lookup("A"), Some("3".into()));
        assert_eq!(env.lookup("B"), Some("2".into()));
    }

    #[test]
    fn test_fn_lookup() {
        let lookup = FnLookup::new(|name| (name == "USER").then(|| "root".to_string()));

        assert_eq!(lookup.lookup("USER"), Some("root".into()));
        assert_eq!(lookup.lookup("HOME"), None);
    }

    #[test]
    fn test_strip_nul_padding() {
        assert_eq!(strip_nul_padding("value\0\0"), "value");
        assert_eq!(strip_nul_padding("val\0ue"), "val\0ue");
        assert_eq!(strip_nul_padding("\0"), "");
        assert_eq!(strip_nul_padding("plain"), "plain");
    }
}
