//! stagecfg client
//!
//! Reads configuration from ordinal-ranked sources, one of which can be a
//! config server distributing signed tokens for an application and stage.
//! The resolver itself lives in [`stagecfg_core`]; this crate adds the
//! [`RemoteSource`] and a helper wiring it behind local sources.

pub mod error;
pub mod remote;

pub use error::{ClientError, ClientResult, ErrorKind};
pub use remote::bootstrap::Bootstrap;
pub use remote::transport::{HttpReply, HttpTransport, Transport, TransportError};
pub use remote::{FetchPolicy, RemoteSource, REMOTE_ORDINAL, REMOTE_SOURCE_NAME};

pub use stagecfg_core::{ConfigBuilder, ConfigError, ResolvedConfig, Source};

use std::sync::Arc;

/// Resolver over `local` plus a remote source bootstrapped from `local` alone.
///
/// The remote source reads its own parameters from a resolver that does not
/// contain it, so a lookup never re-enters the fetch.
pub fn with_remote(local: Vec<Arc<dyn Source>>, policy: FetchPolicy) -> ResolvedConfig {
    let bootstrap = Arc::new(ConfigBuilder::new().with_sources(local.iter().cloned()).build());
    ConfigBuilder::new()
        .with_sources(local)
        .with_source(RemoteSource::new(bootstrap).with_policy(policy))
        .build()
}
