//! Materializes an application's configuration into a signed token.

use std::sync::Arc;

use stagecfg_core::{ConfigBuilder, ConfigError};
use stagecfg_protocol::{Properties, TokenError, TokenSigner, ValidationError};
use thiserror::Error;
use tracing::info;

use crate::aggregator::{AggregateError, SourceAggregator};

/// Outcome of a distribution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    /// Signed token carrying every resolved key.
    Token(String),
    /// The application is not allow-listed.
    UnknownApplication,
}

/// Failures while building a distribution.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to load configuration: {0}")]
    Aggregate(AggregateError),

    #[error("failed to resolve configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to encode token: {0}")]
    Token(#[from] TokenError),
}

/// Serves configuration sets as signed tokens.
pub struct DistributionEndpoint {
    aggregator: SourceAggregator,
    signer: Arc<TokenSigner>,
}

impl DistributionEndpoint {
    pub fn new(aggregator: SourceAggregator, signer: Arc<TokenSigner>) -> Self {
        Self { aggregator, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }

    /// Resolve every key of `application` (with `stage` overrides) and sign the result.
    pub fn distribute(
        &self,
        application: &str,
        stage: Option<&str>,
    ) -> Result<Distribution, EndpointError> {
        let sources = match self.aggregator.sources(application, stage) {
            Ok(sources) => sources,
            Err(AggregateError::UnknownApplication(_)) => {
                info!(application, "unknown application");
                return Ok(Distribution::UnknownApplication);
            }
            Err(AggregateError::Validation(e)) => return Err(EndpointError::Validation(e)),
            Err(e) => return Err(EndpointError::Aggregate(e)),
        };

        let config = ConfigBuilder::new().with_sources(sources).build();
        let mut properties = Properties::new();
        for key in config.property_names()? {
            let value = match config.get_raw(&key)? {
                Some(raw) if !raw.is_empty() => config.convert::<String>(&raw)?,
                _ => String::new(),
            };
            properties.insert(key, value);
        }

        let token = self.signer.encode(&properties)?;
        info!(
            application,
            stage = stage.unwrap_or_default(),
            keys = properties.len(),
            "distributed configuration"
        );
        Ok(Distribution::Token(token))
    }
}
