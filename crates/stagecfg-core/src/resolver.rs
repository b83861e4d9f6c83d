//! Priority-ordered lookup over a fixed set of sources.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::convert::Convertible;
use crate::error::ConfigError;
use crate::registry::ConverterRegistry;
use crate::source::Source;
use crate::ConfigResult;

/// Outcome of a raw lookup, with the source that answered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue {
    key: String,
    raw: Option<String>,
    source_name: Option<String>,
}

impl ConfigValue {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Name of the winning source, `None` when no source has the key.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.raw.is_some()
    }

    pub fn into_raw(self) -> Option<String> {
        self.raw
    }
}

/// Sources sorted by descending ordinal plus the converters to apply.
///
/// Produced by [`ConfigBuilder::build`](crate::ConfigBuilder::build).
pub struct ResolvedConfig {
    sources: RwLock<Vec<Arc<dyn Source>>>,
    converters: Arc<ConverterRegistry>,
}

impl ResolvedConfig {
    pub(crate) fn new(mut sources: Vec<Arc<dyn Source>>, converters: Arc<ConverterRegistry>) -> Self {
        sort_descending(&mut sources);
        Self {
            sources: RwLock::new(sources),
            converters,
        }
    }

    /// Look `key` up in ordinal order and report which source answered.
    pub fn access(&self, key: &str) -> ConfigResult<ConfigValue> {
        for source in self.sources() {
            if let Some(raw) = source.value(key)? {
                debug!(key, source = source.name(), "found value");
                return Ok(ConfigValue {
                    key: key.to_string(),
                    raw: Some(raw),
                    source_name: Some(source.name().to_string()),
                });
            }
        }

        Ok(ConfigValue {
            key: key.to_string(),
            raw: None,
            source_name: None,
        })
    }

    /// First value for `key` in ordinal order.
    pub fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.access(key)?.into_raw())
    }

    /// Typed value for a required key. Absent and empty values are missing.
    pub fn get_value<T: Convertible>(&self, key: &str) -> ConfigResult<T> {
        match self.get_raw(key)? {
            Some(raw) if !raw.is_empty() => self.convert::<T>(&raw),
            _ => Err(ConfigError::MissingKey(key.to_string())),
        }
    }

    /// Typed value for an optional key. Empty values count as absent.
    pub fn get_optional_value<T: Convertible>(&self, key: &str) -> ConfigResult<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) if !raw.is_empty() => self.convert::<T>(&raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Convert `raw` with the active converter for `T`.
    pub fn convert<T: Convertible>(&self, raw: &str) -> ConfigResult<T> {
        Ok(self.converters.convert::<T>(raw)?)
    }

    /// Split `raw` on unescaped commas and convert each element.
    pub fn convert_list<E: Convertible>(&self, raw: &str) -> ConfigResult<Vec<E>> {
        self.convert::<Vec<E>>(raw)
    }

    /// Union of keys across all sources.
    pub fn property_names(&self) -> ConfigResult<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for source in self.sources() {
            names.extend(source.property_names()?);
        }
        Ok(names)
    }

    /// Sources in lookup order.
    pub fn sources(&self) -> Vec<Arc<dyn Source>> {
        self.sources.read().clone()
    }

    /// Add sources and restore ordinal order.
    pub fn add_sources<I>(&self, sources: I)
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        let mut guard = self.sources.write();
        guard.extend(sources);
        sort_descending(&mut guard);
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<(String, i32)> = self
            .sources()
            .iter()
            .map(|s| (s.name().to_string(), s.ordinal()))
            .collect();
        f.debug_struct("ResolvedConfig")
            .field("sources", &sources)
            .field("converters", &self.converters.len())
            .finish()
    }
}

/// Stable sort: equal ordinals keep insertion order.
fn sort_descending(sources: &mut [Arc<dyn Source>]) {
    sources.sort_by_key(|source| Reverse(source.ordinal()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Capabilities, ImplicitDiscovery};
    use crate::source::MapSource;
    use crate::ConfigBuilder;
    use std::collections::BTreeMap;

    fn config(sources: Vec<MapSource>) -> ResolvedConfig {
        ConfigBuilder::new()
            .with_sources(sources.into_iter().map(|s| Arc::new(s) as Arc<dyn Source>))
            .build()
    }

    #[test]
    fn test_highest_ordinal_wins_regardless_of_order() {
        let low = MapSource::new("low", 100).with("key", "low");
        let high = MapSource::new("high", 300).with("key", "high");
        let mid = MapSource::new("mid", 200).with("key", "mid");

        let config = config(vec![low, high, mid]);
        assert_eq!(config.get_raw("key").unwrap(), Some("high".to_string()));

        let value = config.access("key").unwrap();
        assert_eq!(value.source_name(), Some("high"));
    }

    #[test]
    fn test_lower_ordinal_fills_gaps() {
        let low = MapSource::new("low", 100).with("only.low", "x");
        let high = MapSource::new("high", 300).with("key", "high");
        let config = config(vec![high, low]);
        assert_eq!(config.get_raw("only.low").unwrap(), Some("x".to_string()));
        assert_eq!(config.get_raw("unknown").unwrap(), None);
    }

    #[test]
    fn test_equal_ordinals_keep_insertion_order() {
        let first = MapSource::new("first", 150).with("key", "first");
        let second = MapSource::new("second", 150).with("key", "second");
        let config = config(vec![first, second]);
        assert_eq!(config.get_raw("key").unwrap(), Some("first".to_string()));
        let names: Vec<String> = config.sources().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let config = config(vec![MapSource::new("s", 100).with("Key", "v")]);
        assert_eq!(config.get_raw("key").unwrap(), None);
    }

    #[test]
    fn test_property_names_is_union() {
        let a = MapSource::new("a", 100).with("x", "1").with("shared", "a");
        let b = MapSource::new("b", 400).with("y", "2").with("shared", "b");
        let config = config(vec![a, b]);
        let names: Vec<String> = config.property_names().unwrap().into_iter().collect();
        assert_eq!(names, vec!["shared", "x", "y"]);
    }

    #[test]
    fn test_required_value() {
        let config = config(vec![MapSource::new("s", 100)
            .with("port", "8080")
            .with("empty", "")
            .with("bad", "eighty")]);

        assert_eq!(config.get_value::<i32>("port").unwrap(), 8080);
        assert!(config.get_value::<i32>("empty").unwrap_err().is_missing_key());
        assert!(config.get_value::<i32>("absent").unwrap_err().is_missing_key());
        assert!(config.get_value::<i32>("bad").unwrap_err().is_conversion());
    }

    #[test]
    fn test_optional_value() {
        let config = config(vec![MapSource::new("s", 100)
            .with("flag", "yes")
            .with("empty", "")
            .with("bad", "x")]);

        assert_eq!(config.get_optional_value::<bool>("flag").unwrap(), Some(true));
        assert_eq!(config.get_optional_value::<bool>("empty").unwrap(), None);
        assert_eq!(config.get_optional_value::<bool>("absent").unwrap(), None);
        assert!(config.get_optional_value::<f64>("bad").unwrap_err().is_conversion());
    }

    #[test]
    fn test_list_values() {
        let config = config(vec![MapSource::new("s", 100)
            .with("apps", r"a,b\,c,d")
            .with("ports", "80,443")
            .with("none", "")]);

        assert_eq!(
            config.get_value::<Vec<String>>("apps").unwrap(),
            vec!["a", "b,c", "d"]
        );
        assert_eq!(config.get_value::<Vec<i64>>("ports").unwrap(), vec![80, 443]);
        assert!(config.convert_list::<String>("").unwrap().is_empty());
        assert_eq!(config.get_optional_value::<Vec<String>>("none").unwrap(), None);
    }

    #[test]
    fn test_add_sources_resorts() {
        let config = config(vec![MapSource::new("base", 150).with("key", "base")]);
        config.add_sources([Arc::new(MapSource::new("stage", 200).with("key", "stage")) as Arc<dyn Source>]);
        assert_eq!(config.get_raw("key").unwrap(), Some("stage".to_string()));
    }

    struct Failing;

    impl Source for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn ordinal(&self) -> i32 {
            500
        }

        fn value(&self, _key: &str) -> ConfigResult<Option<String>> {
            Err(ConfigError::Source {
                name: "failing".to_string(),
                message: "unreachable".to_string(),
            })
        }

        fn properties(&self) -> ConfigResult<BTreeMap<String, String>> {
            Err(ConfigError::Source {
                name: "failing".to_string(),
                message: "unreachable".to_string(),
            })
        }
    }

    #[test]
    fn test_source_failure_propagates() {
        let config = ConfigBuilder::new()
            .with_source(Failing)
            .with_source(MapSource::new("s", 100).with("key", "v"))
            .build();
        assert!(matches!(config.get_raw("key"), Err(ConfigError::Source { .. })));
        assert!(config.property_names().is_err());
    }

    #[derive(Debug, PartialEq)]
    struct Percent(u8);

    impl Convertible for Percent {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.parse_chars(|raw: &str| {
                raw.trim_end_matches('%')
                    .parse::<u8>()
                    .map(Percent)
                    .map_err(|e| e.to_string())
            });
        }
    }

    #[test]
    fn test_implicit_type_through_resolver() {
        let discovery = Arc::new(ImplicitDiscovery::new());
        let config = ConfigBuilder::with_discovery(Arc::clone(&discovery))
            .with_source(MapSource::new("s", 100).with("load", "75%").with("loads", "1%,2%"))
            .build();

        assert_eq!(config.get_value::<Percent>("load").unwrap(), Percent(75));
        assert_eq!(config.get_value::<Percent>("load").unwrap(), Percent(75));
        assert_eq!(
            config.get_value::<Vec<Percent>>("loads").unwrap(),
            vec![Percent(1), Percent(2)]
        );
        assert_eq!(discovery.probe_runs(), 2);
    }
}
