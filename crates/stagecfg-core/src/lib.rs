//! Layered configuration resolution with typed conversion.
//!
//! A [`ResolvedConfig`] consults an ordinal-sorted list of [`Source`]s and turns
//! the first raw string it finds into a typed value through the
//! [`ConverterRegistry`]. Types without an explicit converter can still be
//! converted when they publish text entry points via [`Convertible`].

mod builder;
pub mod convert;
mod error;
mod format;
mod registry;
mod resolver;
mod source;

pub use builder::ConfigBuilder;
pub use convert::{
    Capabilities, Convertible, Converter, ConverterOrigin, ImplicitDiscovery, ParamKind, Probe,
    ProbeKind, TypeIdentifier, DEFAULT_CONVERTER_PRIORITY, IMPLICIT_PRIORITY, PROBE_ORDER,
};
pub use error::{ConfigError, ConversionError};
pub use format::{ConfigType, FileSource};
pub use registry::ConverterRegistry;
pub use resolver::{ConfigValue, ResolvedConfig};
pub use source::{EnvSource, MapSource, Source, DEFAULT_ORDINAL, ENV_ORDINAL};

/// Result alias used across the crate.
pub type ConfigResult<T> = Result<T, ConfigError>;
