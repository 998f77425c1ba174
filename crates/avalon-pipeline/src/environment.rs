//! Injectable process environment.

use std::collections::BTreeMap;

/// An ordered snapshot of environment variables.
///
/// The kernel reads and writes session variables through this map instead
/// of the process environment, so tests and embedded hosts control exactly
/// what the session sees.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let mut env = Environment::new().with("AVALON_PROJECT", "batman");
        assert_eq!(env.get("AVALON_PROJECT"), Some("batman"));
        env.set("AVALON_PROJECT", "robin");
        assert_eq!(env.get("AVALON_PROJECT"), Some("robin"));
        assert_eq!(env.remove("AVALON_PROJECT").as_deref(), Some("robin"));
        assert_eq!(env.get("AVALON_PROJECT"), None);
    }

    #[test]
    fn iterates_in_key_order() {
        let env: Environment = [("B", "2"), ("A", "1")].into_iter().collect();
        let keys: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn process_snapshot_sees_path() {
        let env = Environment::from_process();
        assert_eq!(env.get("PATH").map(str::to_string), std::env::var("PATH").ok());
    }
}
