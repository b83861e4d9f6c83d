//! stagecfg config server.
//!
//! Aggregates per-application configuration files (base plus stage
//! overrides), resolves them with stagecfg-core and distributes the flat
//! result as a signed token over HTTP.

pub mod aggregator;
pub mod config;
pub mod endpoint;
pub mod http;
pub mod logging;
pub mod lookup;

pub use aggregator::{AggregateError, SourceAggregator, BASE_ORDINAL, STAGE_ORDINAL};
pub use config::ServerSettings;
pub use endpoint::{Distribution, DistributionEndpoint, EndpointError};
pub use http::build_router;
pub use logging::{init_tracing, LogFormat};
pub use lookup::{FsLookup, MemoryLookup, Resource, ResourceLookup};

use std::sync::Arc;

use stagecfg_protocol::{TokenError, TokenSigner};
use tracing::warn;

/// Wire settings into an endpoint backed by the filesystem.
pub fn endpoint_from_settings(settings: &ServerSettings) -> Result<DistributionEndpoint, TokenError> {
    let signer = match &settings.signing_key {
        Some(encoded) => TokenSigner::from_base64(encoded)?,
        None => {
            let signer = TokenSigner::generate();
            warn!(
                fingerprint = signer.fingerprint(),
                "no signingKey configured, using an ephemeral key"
            );
            signer
        }
    };
    let lookup = Arc::new(FsLookup::new(&settings.root_directory));
    let aggregator = SourceAggregator::new(lookup, settings.applications.iter().cloned());
    Ok(DistributionEndpoint::new(aggregator, Arc::new(signer)))
}
