//! Built-in converters and the `Convertible` impls for standard types.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;

use super::{Capabilities, Convertible, DEFAULT_CONVERTER_PRIORITY};
use crate::registry::ConverterRegistry;

/// Spellings accepted as `true` (case-insensitive); anything else is `false`.
const TRUE_VALUES: &[&str] = &["true", "1", "yes", "y", "on"];

static TYPE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(::)?[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("type path pattern is valid")
});

/// A syntactically valid Rust type path such as `std::string::String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdentifier(String);

impl TypeIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, e.g. `String` for `std::string::String`.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
}

impl FromStr for TypeIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if TYPE_PATH.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("'{s}' is not a valid type path"))
        }
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    Ok(TRUE_VALUES.iter().any(|t| t.eq_ignore_ascii_case(raw)))
}

fn parse_with<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| e.to_string())
}

/// Register text, boolean, floats, 32/64-bit integers, URL and type path.
pub(crate) fn register_defaults(registry: &ConverterRegistry) {
    let priority = DEFAULT_CONVERTER_PRIORITY;
    registry.register_fn::<String, _>(priority, |raw| Ok(raw.to_string()));
    registry.register_fn::<bool, _>(priority, parse_bool);
    registry.register_fn::<f64, _>(priority, parse_with::<f64>);
    registry.register_fn::<f32, _>(priority, parse_with::<f32>);
    registry.register_fn::<i32, _>(priority, parse_with::<i32>);
    registry.register_fn::<i64, _>(priority, parse_with::<i64>);
    registry.register_fn::<Url, _>(priority, |raw| Url::parse(raw).map_err(|e| e.to_string()));
    registry.register_fn::<TypeIdentifier, _>(priority, parse_with::<TypeIdentifier>);
}

macro_rules! convertible_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Convertible for $ty {
                fn capabilities(caps: &mut Capabilities<Self>) {
                    caps.with_from_str();
                }
            }
        )*
    };
}

convertible_from_str!(
    String, bool, char, f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, Url, TypeIdentifier,
);

impl Convertible for PathBuf {
    fn capabilities(caps: &mut Capabilities<Self>) {
        caps.with_from_string();
    }
}
