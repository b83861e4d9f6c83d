//! Configuration sources.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::ConfigError;

/// Ordinal of a source that does not state one.
pub const DEFAULT_ORDINAL: i32 = 100;

/// Ordinal of the process environment.
pub const ENV_ORDINAL: i32 = 300;

/// A named, ordinal-ranked provider of string key/value pairs.
///
/// Higher ordinals win. Access is fallible so sources backed by I/O can
/// report failures instead of pretending a key is absent.
pub trait Source: Send + Sync {
    /// Human-readable name used in logs and diagnostics.
    fn name(&self) -> &str;

    fn ordinal(&self) -> i32 {
        DEFAULT_ORDINAL
    }

    /// Value for `key` (exact, case-sensitive match).
    fn value(&self, key: &str) -> Result<Option<String>, ConfigError>;

    /// Every key/value pair this source holds.
    fn properties(&self) -> Result<BTreeMap<String, String>, ConfigError>;

    fn property_names(&self) -> Result<BTreeSet<String>, ConfigError> {
        Ok(self.properties()?.into_keys().collect())
    }
}

/// In-memory source.
#[derive(Debug, Clone)]
pub struct MapSource {
    name: String,
    ordinal: i32,
    values: BTreeMap<String, String>,
}

impl MapSource {
    pub fn new(name: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            ordinal,
            values: BTreeMap::new(),
        }
    }

    /// Build from any iterator of pairs.
    pub fn from_pairs<K, V, I>(name: impl Into<String>, ordinal: i32, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            ordinal,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Source for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }

    fn properties(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self.values.clone())
    }
}

/// Snapshot of environment variables, optionally restricted to a prefix.
///
/// A key `a.b-c` is looked up as the variable itself, then with every
/// non-alphanumeric character replaced by `_`, then upper-cased (`A_B_C`),
/// each time behind the prefix.
#[derive(Debug, Clone)]
pub struct EnvSource {
    name: String,
    prefix: String,
    ordinal: i32,
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let vars: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(name, value)| {
                let name = name.into_string().ok()?;
                if !name.starts_with(&prefix) {
                    return None;
                }
                match value.into_string() {
                    Ok(value) => Some((name, value)),
                    Err(_) => {
                        debug!(variable = %name, "skipping non UTF-8 environment value");
                        None
                    }
                }
            })
            .collect();
        Self::from_vars(prefix, vars)
    }

    /// Build from explicit variables.
    pub fn from_vars<I>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = prefix.into();
        let vars = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect();
        Self {
            name: format!("environment({prefix}*)"),
            prefix,
            ordinal: ENV_ORDINAL,
            vars,
        }
    }

    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }

    fn candidates(&self, key: &str) -> [String; 3] {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let upper = sanitized.to_ascii_uppercase();
        [
            format!("{}{}", self.prefix, key),
            format!("{}{}", self.prefix, sanitized),
            format!("{}{}", self.prefix, upper),
        ]
    }
}

impl Source for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self
            .candidates(key)
            .iter()
            .find_map(|candidate| self.vars.get(candidate).cloned()))
    }

    fn properties(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(self
            .vars
            .iter()
            .map(|(name, value)| (name[self.prefix.len()..].to_string(), value.clone()))
            .collect())
    }
}
