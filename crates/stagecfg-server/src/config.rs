//! Server settings.
//!
//! Read through stagecfg-core itself: an optional settings file (any
//! supported format) overlaid by `STAGECFG_`-prefixed environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stagecfg_core::{
    ConfigBuilder, ConfigError, ConfigResult, EnvSource, FileSource, ResolvedConfig, Source,
    DEFAULT_ORDINAL,
};

/// Prefix of environment variables overriding settings.
pub const ENV_PREFIX: &str = "STAGECFG_";

/// Listen address used when `bind` is not set.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

pub const APPLICATIONS_KEY: &str = "applications";
pub const ROOT_DIRECTORY_KEY: &str = "rootDirectory";
pub const BIND_KEY: &str = "bind";
pub const SIGNING_KEY_KEY: &str = "signingKey";

/// Server configuration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Allow-listed application names.
    pub applications: Vec<String>,
    /// Directory holding `{app}/{app}[-{stage}]{suffix}` files.
    pub root_directory: PathBuf,
    pub bind: SocketAddr,
    /// Base64 Ed25519 seed. An ephemeral key is used when absent.
    pub signing_key: Option<String>,
}

impl ServerSettings {
    /// Load from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut sources: Vec<Arc<dyn Source>> = vec![Arc::new(EnvSource::new(ENV_PREFIX))];
        if let Some(path) = path {
            sources.push(Arc::new(FileSource::load_inferred(path, DEFAULT_ORDINAL)?));
        }
        Self::from_sources(sources)
    }

    pub fn from_sources<I>(sources: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn Source>>,
    {
        Self::from_config(&ConfigBuilder::new().with_sources(sources).build())
    }

    pub fn from_config(config: &ResolvedConfig) -> ConfigResult<Self> {
        let applications: Vec<String> = config
            .get_value::<Vec<String>>(APPLICATIONS_KEY)?
            .into_iter()
            .map(|app| app.trim().to_string())
            .filter(|app| !app.is_empty())
            .collect();
        if applications.is_empty() {
            return Err(ConfigError::MissingKey(APPLICATIONS_KEY.to_string()));
        }

        let bind = match config.get_optional_value::<SocketAddr>(BIND_KEY)? {
            Some(bind) => bind,
            None => config.convert::<SocketAddr>(DEFAULT_BIND)?,
        };

        Ok(Self {
            applications,
            root_directory: config.get_value::<PathBuf>(ROOT_DIRECTORY_KEY)?,
            bind,
            signing_key: config.get_optional_value::<String>(SIGNING_KEY_KEY)?,
        })
    }
}
