//! Converters and their type-erased registry records.
//!
//! A [`Converter`] turns a raw string into one concrete type. Records are
//! type-erased so a single registry can hold converters for any `'static`
//! type; [`Converter::convert`] downcasts back to the requested type.

mod array;
mod defaults;
mod discovery;

pub use array::{escape_element, split_escaped};
pub use defaults::TypeIdentifier;
pub use discovery::{
    Capabilities, Convertible, ImplicitDiscovery, ParamKind, Probe, ProbeKind, PROBE_ORDER,
};

pub(crate) use defaults::register_defaults;
pub(crate) use discovery::TextFn;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ConversionError;

/// Priority of the converters registered by [`ConfigBuilder::new`](crate::ConfigBuilder::new).
pub const DEFAULT_CONVERTER_PRIORITY: i32 = 1;

/// Priority reported by converters synthesized through implicit discovery.
///
/// Ranks below [`DEFAULT_CONVERTER_PRIORITY`]. Implicit converters are only
/// consulted when a type has no registration at all.
pub const IMPLICIT_PRIORITY: i32 = 0;

type AnyValue = Box<dyn Any + Send>;
type ErasedFn = Arc<dyn Fn(&str) -> Result<AnyValue, String> + Send + Sync>;

/// How a converter came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterOrigin {
    /// Registered by name through a builder or the registry.
    Explicit,
    /// Synthesized from the first matching discovery probe.
    Implicit(Probe),
    /// Element-wise conversion of a comma separated list.
    List,
}

/// A priority-ranked conversion function for one target type.
#[derive(Clone)]
pub struct Converter {
    type_id: TypeId,
    type_name: &'static str,
    priority: i32,
    origin: ConverterOrigin,
    func: ErasedFn,
}

impl Converter {
    /// Create an explicit converter producing `T`.
    pub fn new<T, F>(priority: i32, f: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        Self::erase::<T>(priority, ConverterOrigin::Explicit, Arc::new(f))
    }

    pub(crate) fn implicit<T: Send + 'static>(probe: Probe, f: TextFn<T>) -> Self {
        Self::erase::<T>(IMPLICIT_PRIORITY, ConverterOrigin::Implicit(probe), f)
    }

    /// Wrap an element converter into a converter for `Vec<E>`.
    pub(crate) fn list<E: Send + 'static>(element: Converter) -> Self {
        let priority = element.priority;
        let f: TextFn<Vec<E>> = Arc::new(move |raw: &str| {
            split_escaped(raw)
                .iter()
                .map(|part| element.convert::<E>(part).map_err(|e| e.to_string()))
                .collect()
        });
        Self::erase::<Vec<E>>(priority, ConverterOrigin::List, f)
    }

    fn erase<T: Send + 'static>(priority: i32, origin: ConverterOrigin, f: TextFn<T>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            priority,
            origin,
            func: Arc::new(move |raw: &str| f(raw).map(|value| Box::new(value) as AnyValue)),
        }
    }

    /// Identifier of the produced type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the produced type, for messages.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn origin(&self) -> ConverterOrigin {
        self.origin
    }

    /// Convert `value` into `T`.
    pub fn convert<T: 'static>(&self, value: &str) -> Result<T, ConversionError> {
        let boxed = (self.func)(value).map_err(|reason| ConversionError::Invalid {
            type_name: self.type_name.to_string(),
            value: value.to_string(),
            reason,
        })?;

        boxed
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ConversionError::TypeMismatch {
                registered: self.type_name.to_string(),
                requested: type_name::<T>().to_string(),
            })
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("type_name", &self.type_name)
            .field("priority", &self.priority)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}
