//! On-disk source formats.
//!
//! Every format is flattened into dotted keys. Nested tables become
//! `outer.inner`, sequences of scalars become a comma separated value (with
//! embedded commas escaped) so the list converter reads them back, and
//! sequences holding tables are indexed as `key[0].field`.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::convert::escape_element;
use crate::error::ConfigError;
use crate::source::Source;

/// Supported file formats, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    Yaml,
    Properties,
    Toml,
}

impl ConfigType {
    pub const ALL: [ConfigType; 3] = [ConfigType::Yaml, ConfigType::Properties, ConfigType::Toml];

    /// Canonical file suffix, including the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            ConfigType::Yaml => ".yaml",
            ConfigType::Properties => ".properties",
            ConfigType::Toml => ".toml",
        }
    }

    /// Format implied by a path's suffix.
    pub fn from_path(path: &Path) -> Option<ConfigType> {
        let name = path.file_name()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|config_type| name.ends_with(config_type.suffix()))
            .or_else(|| name.ends_with(".yml").then_some(ConfigType::Yaml))
    }

    /// Parse `content` into flat key/value pairs.
    pub fn parse(self, location: &str, content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
        let parse_error = |message: String| ConfigError::Parse {
            location: location.to_string(),
            message,
        };

        match self {
            ConfigType::Properties => Ok(parse_properties(content)),
            ConfigType::Yaml => {
                let value: Value = if content.trim().is_empty() {
                    Value::Null
                } else {
                    serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
                };
                Ok(flatten(value))
            }
            ConfigType::Toml => {
                let value: toml::Value =
                    toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                Ok(flatten(toml_to_json(value)))
            }
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::Yaml => "yaml",
            ConfigType::Properties => "properties",
            ConfigType::Toml => "toml",
        };
        f.write_str(name)
    }
}

/// A source loaded from one file.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    config_type: ConfigType,
    ordinal: i32,
    values: BTreeMap<String, String>,
}

impl FileSource {
    /// Read and parse `path` as `config_type`.
    pub fn load(config_type: ConfigType, path: &Path, ordinal: i32) -> Result<Self, ConfigError> {
        let location = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            location: location.clone(),
            message: e.to_string(),
        })?;
        let source = Self::parse(config_type, location, &content, ordinal)?;
        debug!(
            source = %source.name,
            format = %config_type,
            ordinal,
            keys = source.values.len(),
            "loaded file source"
        );
        Ok(source)
    }

    /// Read `path`, inferring the format from its suffix.
    pub fn load_inferred(path: &Path, ordinal: i32) -> Result<Self, ConfigError> {
        let config_type = ConfigType::from_path(path).ok_or_else(|| ConfigError::Parse {
            location: path.display().to_string(),
            message: "unsupported file suffix".to_string(),
        })?;
        Self::load(config_type, path, ordinal)
    }

    /// Parse in-memory `content`.
    pub fn parse(
        config_type: ConfigType,
        name: impl Into<String>,
        content: &str,
        ordinal: i32,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let values = config_type.parse(&name, content)?;
        Ok(Self {
            name,
            config_type,
            ordinal,
            values,
        })
    }

    pub fn config_type(&self) -> ConfigType {
        self.config_type
    }
}

impl Source for FileSource {
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

/// Convert a TOML value into the JSON model used for flattening.
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn flatten(value: Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    // A document that is a bare scalar or sequence has no keys.
    if let Value::Object(map) = value {
        for (key, value) in map {
            flatten_into(&key, value, &mut out);
        }
    }
    out
}

fn flatten_into(prefix: &str, value: Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(&format!("{prefix}.{key}"), value, out);
            }
        }
        Value::Array(items) => {
            if items.iter().all(is_scalar) {
                let joined = items
                    .iter()
                    .filter_map(scalar_text)
                    .map(|item| escape_element(&item))
                    .collect::<Vec<_>>()
                    .join(",");
                out.insert(prefix.to_string(), joined);
            } else {
                for (index, item) in items.into_iter().enumerate() {
                    flatten_into(&format!("{prefix}[{index}]"), item, out);
                }
            }
        }
        scalar => {
            if let Some(text) = scalar_text(&scalar) {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse `key=value` / `key: value` / `key value` lines.
///
/// `#` and `!` start comments, a trailing odd backslash continues the line.
/// Escapes `\t`, `\n`, `\r`, `\\`, `\=`, `\:`, `\ ` and `\uXXXX` are decoded;
/// `\,` is kept verbatim for the list converter.
fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut logical = String::new();

    for line in content.lines() {
        let trimmed = line.trim_start();
        if logical.is_empty() && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!')) {
            continue;
        }

        let trailing = trimmed.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            logical.push_str(&trimmed[..trimmed.len() - 1]);
            continue;
        }
        logical.push_str(trimmed);

        let (key, value) = split_property(&logical);
        out.insert(unescape_property(key), unescape_property(value));
        logical.clear();
    }

    if !logical.is_empty() {
        let (key, value) = split_property(&logical);
        out.insert(unescape_property(key), unescape_property(value));
    }
    out
}

fn split_property(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (line[..index].trim_end(), line[index + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[index..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..index], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape_property(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(',') => out.push_str("\\,"),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
