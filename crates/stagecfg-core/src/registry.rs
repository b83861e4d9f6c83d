//! Converter registry.
//!
//! Holds at most one explicit converter per type (highest priority wins, ties
//! go to the most recent registration) and falls back to implicit discovery
//! and then to list conversion when no explicit converter exists.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use crate::convert::{Convertible, Converter, ImplicitDiscovery};
use crate::error::ConversionError;

/// Concurrent map from target type to its active converter.
pub struct ConverterRegistry {
    explicit: DashMap<TypeId, Converter>,
    discovery: Arc<ImplicitDiscovery>,
}

impl ConverterRegistry {
    /// Empty registry backed by the process-wide discovery cache.
    pub fn new() -> Self {
        Self::with_discovery(ImplicitDiscovery::shared())
    }

    /// Empty registry backed by the given discovery cache.
    pub fn with_discovery(discovery: Arc<ImplicitDiscovery>) -> Self {
        Self {
            explicit: DashMap::new(),
            discovery,
        }
    }

    /// Store `converter` unless a higher-priority one is already registered.
    ///
    /// Returns whether the converter became active.
    pub fn register(&self, converter: Converter) -> bool {
        match self.explicit.entry(converter.type_id()) {
            Entry::Occupied(mut existing) => {
                if converter.priority() >= existing.get().priority() {
                    trace!(
                        type_name = converter.type_name(),
                        priority = converter.priority(),
                        replaced = existing.get().priority(),
                        "converter overridden"
                    );
                    existing.insert(converter);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(converter);
                true
            }
        }
    }

    /// Register a conversion function for `T`.
    pub fn register_fn<T, F>(&self, priority: i32, f: F) -> bool
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.register(Converter::new::<T, F>(priority, f))
    }

    /// Explicitly registered converter for `T`, if any.
    pub fn explicit<T: 'static>(&self) -> Option<Converter> {
        self.explicit
            .get(&TypeId::of::<T>())
            .map(|entry| entry.value().clone())
    }

    /// Active converter for `T`: explicit, then implicit, then list.
    pub fn resolve<T: Convertible>(&self) -> Result<Converter, ConversionError> {
        if let Some(converter) = self.explicit::<T>() {
            return Ok(converter);
        }

        if let Some(converter) = self.discovery.discover::<T>() {
            return Ok(converter);
        }

        T::list_converter(self).unwrap_or_else(|| {
            Err(ConversionError::NoConverter {
                type_name: type_name::<T>().to_string(),
            })
        })
    }

    /// Resolve the converter for `T` and apply it to `raw`.
    pub fn convert<T: Convertible>(&self, raw: &str) -> Result<T, ConversionError> {
        self.resolve::<T>()?.convert::<T>(raw)
    }

    /// Discovery cache backing this registry.
    pub fn discovery(&self) -> &Arc<ImplicitDiscovery> {
        &self.discovery
    }

    /// Number of explicit registrations.
    pub fn len(&self) -> usize {
        self.explicit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{
        Capabilities, ConverterOrigin, DEFAULT_CONVERTER_PRIORITY, IMPLICIT_PRIORITY,
    };

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    impl Convertible for Port {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.parse_chars(|raw: &str| raw.parse::<u16>().map(Port));
        }
    }

    struct Unconvertible;

    impl Convertible for Unconvertible {}

    fn fresh() -> ConverterRegistry {
        ConverterRegistry::with_discovery(Arc::new(ImplicitDiscovery::new()))
    }

    #[test]
    fn test_higher_priority_wins() {
        let registry = fresh();
        assert!(registry.register_fn::<String, _>(10, |_| Ok("ten".to_string())));
        assert!(!registry.register_fn::<String, _>(5, |_| Ok("five".to_string())));
        assert_eq!(registry.convert::<String>("x").unwrap(), "ten");

        assert!(registry.register_fn::<String, _>(20, |_| Ok("twenty".to_string())));
        assert_eq!(registry.convert::<String>("x").unwrap(), "twenty");
    }

    #[test]
    fn test_tie_goes_to_last_registration() {
        let registry = fresh();
        registry.register_fn::<String, _>(7, |_| Ok("first".to_string()));
        registry.register_fn::<String, _>(7, |_| Ok("second".to_string()));
        assert_eq!(registry.convert::<String>("x").unwrap(), "second");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_explicit_beats_implicit() {
        let registry = fresh();
        registry.register_fn::<Port, _>(1, |_| Ok(Port(1)));
        let converter = registry.resolve::<Port>().unwrap();
        assert_eq!(converter.origin(), ConverterOrigin::Explicit);
        assert_eq!(registry.convert::<Port>("8080").unwrap(), Port(1));
    }

    #[test]
    fn test_implicit_fallback() {
        let registry = fresh();
        let converter = registry.resolve::<Port>().unwrap();
        assert_eq!(converter.priority(), IMPLICIT_PRIORITY);
        assert_eq!(registry.convert::<Port>("8080").unwrap(), Port(8080));
        assert!(registry.convert::<Port>("http").unwrap_err().to_string().contains("http"));
    }

    #[test]
    fn test_implicit_ranks_below_defaults() {
        assert!(IMPLICIT_PRIORITY < DEFAULT_CONVERTER_PRIORITY);

        let registry = fresh();
        let implicit = registry.resolve::<Port>().unwrap();
        registry.register_fn::<Port, _>(DEFAULT_CONVERTER_PRIORITY, |_| Ok(Port(1)));
        let explicit = registry.resolve::<Port>().unwrap();
        assert!(implicit.priority() < explicit.priority());
        assert_eq!(explicit.origin(), ConverterOrigin::Explicit);
    }

    #[test]
    fn test_concurrent_reads_during_registration() {
        const WRITERS: i32 = 4;
        const PER_WRITER: i32 = 25;

        let registry = Arc::new(fresh());
        registry.register_fn::<String, _>(-1, |_| Ok("initial".to_string()));

        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        let priority = i * WRITERS + w;
                        registry.register_fn::<String, _>(priority, move |_| Ok(priority.to_string()));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let value = registry.convert::<String>("x").unwrap();
                        assert!(value == "initial" || value.parse::<i32>().is_ok(), "{value}");
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let highest = WRITERS * PER_WRITER - 1;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve::<String>().unwrap().priority(), highest);
        assert_eq!(registry.convert::<String>("x").unwrap(), highest.to_string());
    }

    #[test]
    fn test_repeated_resolve_does_not_reprobe() {
        let registry = fresh();
        for _ in 0..5 {
            registry.resolve::<Port>().unwrap();
        }
        assert_eq!(registry.discovery().probe_runs(), 1);
    }

    #[test]
    fn test_no_converter_error() {
        let registry = fresh();
        let err = registry.resolve::<Unconvertible>().unwrap_err();
        assert_eq!(
            err,
            ConversionError::NoConverter {
                type_name: type_name::<Unconvertible>().to_string()
            }
        );
        assert!(err.to_string().starts_with("no converter for type "));
    }

    #[test]
    fn test_list_uses_element_converter() {
        let registry = fresh();
        registry.register_fn::<String, _>(1, |raw| Ok(raw.to_string()));

        let values = registry.convert::<Vec<String>>(r"a,b\,c,d").unwrap();
        assert_eq!(values, vec!["a", "b,c", "d"]);
        assert!(registry.convert::<Vec<String>>("").unwrap().is_empty());

        let ports = registry.convert::<Vec<Port>>("80,443").unwrap();
        assert_eq!(ports, vec![Port(80), Port(443)]);
    }

    #[test]
    fn test_list_of_unconvertible_reports_element_type() {
        let registry = fresh();
        let err = registry.resolve::<Vec<Unconvertible>>().unwrap_err();
        assert!(err.to_string().contains("Unconvertible"));
    }
}
