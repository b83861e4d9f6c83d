//! Assembles a [`ResolvedConfig`] from sources and converters.

use std::sync::Arc;

use crate::convert::{register_defaults, Converter, ImplicitDiscovery};
use crate::registry::ConverterRegistry;
use crate::resolver::ResolvedConfig;
use crate::source::Source;

/// Accumulates sources and converters, then freezes them into a [`ResolvedConfig`].
///
/// Text, boolean, `f64`, `f32`, `i32`, `i64`, [`url::Url`] and
/// [`TypeIdentifier`](crate::TypeIdentifier) converters are registered on
/// construction at [`DEFAULT_CONVERTER_PRIORITY`](crate::DEFAULT_CONVERTER_PRIORITY).
pub struct ConfigBuilder {
    sources: Vec<Arc<dyn Source>>,
    registry: ConverterRegistry,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::from_registry(ConverterRegistry::new())
    }

    /// Builder whose registry uses its own discovery cache.
    pub fn with_discovery(discovery: Arc<ImplicitDiscovery>) -> Self {
        Self::from_registry(ConverterRegistry::with_discovery(discovery))
    }

    fn from_registry(registry: ConverterRegistry) -> Self {
        register_defaults(&registry);
        Self {
            sources: Vec::new(),
            registry,
        }
    }

    pub fn with_sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        self.sources.extend(sources);
        self
    }

    pub fn with_source<S: Source + 'static>(mut self, source: S) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Register a converter for `T`; it replaces an existing one of lower or equal priority.
    pub fn with_converter<T, F>(self, priority: i32, f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.registry.register_fn::<T, F>(priority, f);
        self
    }

    pub fn with_converters<I>(self, converters: I) -> Self
    where
        I: IntoIterator<Item = Converter>,
    {
        for converter in converters {
            self.registry.register(converter);
        }
        self
    }

    /// Sort sources by descending ordinal (stable) and freeze the result.
    pub fn build(self) -> ResolvedConfig {
        ResolvedConfig::new(self.sources, Arc::new(self.registry))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{TypeIdentifier, DEFAULT_CONVERTER_PRIORITY};
    use crate::source::MapSource;
    use url::Url;

    #[test]
    fn test_defaults_present() {
        let config = ConfigBuilder::new()
            .with_source(
                MapSource::new("s", 100)
                    .with("text", "hello")
                    .with("flag", "true")
                    .with("ratio", "0.25")
                    .with("small", "1.5")
                    .with("count", "42")
                    .with("big", "4294967296")
                    .with("endpoint", "https://example.org/config")
                    .with("kind", "std::string::String"),
            )
            .build();

        assert_eq!(config.get_value::<String>("text").unwrap(), "hello");
        assert!(config.get_value::<bool>("flag").unwrap());
        assert!((config.get_value::<f64>("ratio").unwrap() - 0.25).abs() < f64::EPSILON);
        assert!((config.get_value::<f32>("small").unwrap() - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.get_value::<i32>("count").unwrap(), 42);
        assert_eq!(config.get_value::<i64>("big").unwrap(), 4_294_967_296);
        assert_eq!(
            config.get_value::<Url>("endpoint").unwrap().host_str(),
            Some("example.org")
        );
        assert_eq!(
            config.get_value::<TypeIdentifier>("kind").unwrap().simple_name(),
            "String"
        );
        assert_eq!(config.converters().len(), 8);
    }

    #[test]
    fn test_override_default_with_higher_priority() {
        let config = ConfigBuilder::new()
            .with_converter::<String, _>(DEFAULT_CONVERTER_PRIORITY + 1, |raw| Ok(raw.to_uppercase()))
            .with_source(MapSource::new("s", 100).with("text", "hello"))
            .build();
        assert_eq!(config.get_value::<String>("text").unwrap(), "HELLO");
    }

    #[test]
    fn test_lower_priority_does_not_override_default() {
        let config = ConfigBuilder::new()
            .with_converter::<i32, _>(DEFAULT_CONVERTER_PRIORITY - 1, |_| Ok(0))
            .with_source(MapSource::new("s", 100).with("n", "5"))
            .build();
        assert_eq!(config.get_value::<i32>("n").unwrap(), 5);
    }

    #[test]
    fn test_build_sorts_descending() {
        let config = ConfigBuilder::new()
            .with_source(MapSource::new("a", 150))
            .with_source(MapSource::new("b", 350))
            .with_source(MapSource::new("c", 200))
            .with_source(MapSource::new("d", 150))
            .build();
        let order: Vec<(String, i32)> = config
            .sources()
            .iter()
            .map(|s| (s.name().to_string(), s.ordinal()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("b".to_string(), 350),
                ("c".to_string(), 200),
                ("a".to_string(), 150),
                ("d".to_string(), 150),
            ]
        );
    }
}
