//! Implicit converter discovery.
//!
//! Rust has no runtime reflection, so a type opts in by implementing
//! [`Convertible`] and listing the text entry points it offers in a
//! [`Capabilities`] table. Discovery walks [`PROBE_ORDER`] over that table and
//! synthesizes a converter from the first entry point present. The outcome,
//! including "nothing found", is memoized per type.

use std::any::{type_name, TypeId};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::debug;

use super::Converter;
use crate::error::ConversionError;
use crate::registry::ConverterRegistry;

pub(crate) type TextFn<T> = Arc<dyn Fn(&str) -> Result<T, String> + Send + Sync>;

/// Shape of a text entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Single-argument construction, e.g. `From<String>`.
    Construct,
    /// Static "from string" factory, e.g. `FromStr`.
    FromText,
    /// Static `parse` factory.
    Parse,
}

/// Parameter accepted by a text entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Takes an owned `String`.
    OwnedString,
    /// Takes any borrowed character sequence (`&str`).
    CharSequence,
}

/// One discovery probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Probe {
    pub kind: ProbeKind,
    pub param: ParamKind,
}

impl Probe {
    pub const fn new(kind: ProbeKind, param: ParamKind) -> Self {
        Self { kind, param }
    }
}

/// Order in which discovery looks for entry points.
pub const PROBE_ORDER: [Probe; 6] = [
    Probe::new(ProbeKind::Construct, ParamKind::OwnedString),
    Probe::new(ProbeKind::Construct, ParamKind::CharSequence),
    Probe::new(ProbeKind::FromText, ParamKind::OwnedString),
    Probe::new(ProbeKind::FromText, ParamKind::CharSequence),
    Probe::new(ProbeKind::Parse, ParamKind::OwnedString),
    Probe::new(ProbeKind::Parse, ParamKind::CharSequence),
];

/// Text entry points a type publishes to implicit discovery.
pub struct Capabilities<T> {
    offered: Vec<(Probe, TextFn<T>)>,
}

impl<T: 'static> Capabilities<T> {
    pub(crate) fn new() -> Self {
        Self {
            offered: Vec::new(),
        }
    }

    /// Offer an entry point for `probe`, replacing an earlier offer for it.
    pub fn offer<F>(&mut self, probe: Probe, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        let f: TextFn<T> = Arc::new(f);
        self.offered.retain(|(offered, _)| *offered != probe);
        self.offered.push((probe, f));
        self
    }

    /// Infallible constructor taking an owned string.
    pub fn constructor<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> T + Send + Sync + 'static,
    {
        self.offer(
            Probe::new(ProbeKind::Construct, ParamKind::OwnedString),
            move |raw| Ok(f(raw.to_owned())),
        )
    }

    /// Infallible constructor taking a borrowed character sequence.
    pub fn constructor_from_chars<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> T + Send + Sync + 'static,
    {
        self.offer(
            Probe::new(ProbeKind::Construct, ParamKind::CharSequence),
            move |raw| Ok(f(raw)),
        )
    }

    /// "From string" factory taking an owned string.
    pub fn from_text<F, E>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> Result<T, E> + Send + Sync + 'static,
        E: Display,
    {
        self.offer(
            Probe::new(ProbeKind::FromText, ParamKind::OwnedString),
            move |raw| f(raw.to_owned()).map_err(|e| e.to_string()),
        )
    }

    /// "From string" factory taking a borrowed character sequence.
    pub fn from_chars<F, E>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Display,
    {
        self.offer(
            Probe::new(ProbeKind::FromText, ParamKind::CharSequence),
            move |raw| f(raw).map_err(|e| e.to_string()),
        )
    }

    /// `parse` factory taking an owned string.
    pub fn parse<F, E>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> Result<T, E> + Send + Sync + 'static,
        E: Display,
    {
        self.offer(
            Probe::new(ProbeKind::Parse, ParamKind::OwnedString),
            move |raw| f(raw.to_owned()).map_err(|e| e.to_string()),
        )
    }

    /// `parse` factory taking a borrowed character sequence.
    pub fn parse_chars<F, E>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        E: Display,
    {
        self.offer(
            Probe::new(ProbeKind::Parse, ParamKind::CharSequence),
            move |raw| f(raw).map_err(|e| e.to_string()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.offered.is_empty()
    }

    /// First offered entry point in probe order.
    pub(crate) fn first_match(&self) -> Option<(Probe, TextFn<T>)> {
        PROBE_ORDER.iter().find_map(|probe| {
            self.offered
                .iter()
                .find(|(offered, _)| offered == probe)
                .map(|(offered, f)| (*offered, Arc::clone(f)))
        })
    }
}

impl<T: From<String> + 'static> Capabilities<T> {
    /// Offer `T::from(String)` as the owned-string constructor.
    pub fn with_from_string(&mut self) -> &mut Self {
        self.constructor(|raw: String| T::from(raw))
    }
}

impl<T> Capabilities<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    /// Offer `T::from_str` as the character-sequence factory.
    pub fn with_from_str(&mut self) -> &mut Self {
        self.from_chars(|raw: &str| raw.parse::<T>())
    }
}

/// A type that can take part in typed lookups.
///
/// Types with an explicit converter only need an empty impl. Types relying on
/// implicit discovery fill [`Convertible::capabilities`]; list-shaped types
/// provide [`Convertible::list_converter`].
pub trait Convertible: Send + Sized + 'static {
    /// Publish the text entry points this type offers.
    fn capabilities(caps: &mut Capabilities<Self>) {
        let _ = caps;
    }

    /// Converter used when neither explicit nor implicit conversion applies.
    fn list_converter(registry: &ConverterRegistry) -> Option<Result<Converter, ConversionError>> {
        let _ = registry;
        None
    }
}

impl<E: Convertible> Convertible for Vec<E> {
    fn list_converter(registry: &ConverterRegistry) -> Option<Result<Converter, ConversionError>> {
        Some(registry.resolve::<E>().map(Converter::list::<E>))
    }
}

/// Memoized discovery results, keyed by type.
#[derive(Default)]
pub struct ImplicitDiscovery {
    cache: DashMap<TypeId, Option<Converter>>,
    probe_runs: AtomicUsize,
}

impl ImplicitDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance used by registries unless told otherwise.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<ImplicitDiscovery>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ImplicitDiscovery::new())))
    }

    /// Discover (or recall) the implicit converter for `T`.
    pub fn discover<T: Convertible>(&self) -> Option<Converter> {
        let id = TypeId::of::<T>();
        if let Some(cached) = self.cache.get(&id) {
            return cached.value().clone();
        }

        let found = self.probe::<T>();
        // A concurrent probe of the same type may have landed first; keep that one.
        let entry = self.cache.entry(id).or_insert(found);
        entry.value().clone()
    }

    /// Number of times a type's capabilities were actually probed.
    pub fn probe_runs(&self) -> usize {
        self.probe_runs.load(Ordering::Relaxed)
    }

    /// Whether a discovery outcome is memoized for `T`.
    pub fn is_cached<T: 'static>(&self) -> bool {
        self.cache.contains_key(&TypeId::of::<T>())
    }

    fn probe<T: Convertible>(&self) -> Option<Converter> {
        self.probe_runs.fetch_add(1, Ordering::Relaxed);

        let mut caps = Capabilities::<T>::new();
        T::capabilities(&mut caps);

        match caps.first_match() {
            Some((probe, f)) => {
                debug!(type_name = type_name::<T>(), ?probe, "synthesized implicit converter");
                Some(Converter::implicit::<T>(probe, f))
            }
            None => {
                debug!(type_name = type_name::<T>(), "no implicit converter entry point");
                None
            }
        }
    }
}
