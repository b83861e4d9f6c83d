//! Remote source: configuration fetched once from a config server.
//!
//! The bootstrap parameters are read from a local [`ResolvedConfig`] on
//! first access. Exactly one request is issued however many threads race
//! for the first value; what happens after a failed fetch depends on the
//! [`FetchPolicy`].

pub mod bootstrap;
pub mod transport;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use stagecfg_core::{ConfigError, ResolvedConfig, Source};
use stagecfg_protocol::{decode_token, FetchStatus, Properties};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use bootstrap::Bootstrap;
use transport::{HttpTransport, Transport};

/// Name reported by the remote source.
pub const REMOTE_SOURCE_NAME: &str = "Config Server";

/// Ordinal of the remote source, above environment variables.
pub const REMOTE_ORDINAL: i32 = 350;

/// What a failed fetch means for later accesses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// The first outcome, success or failure, is final.
    #[default]
    MemoizeFailure,
    /// Failures are not kept; the next access fetches again.
    RetryOnFailure,
}

/// A [`Source`] backed by the config server.
pub struct RemoteSource {
    local: Arc<ResolvedConfig>,
    transport: Option<Arc<dyn Transport>>,
    policy: FetchPolicy,
    fetched: OnceLock<ClientResult<Arc<Properties>>>,
    init: Mutex<()>,
}

impl RemoteSource {
    /// Remote source bootstrapped from `local`, using HTTP.
    pub fn new(local: Arc<ResolvedConfig>) -> Self {
        Self {
            local,
            transport: None,
            policy: FetchPolicy::default(),
            fetched: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// True once an outcome has been kept.
    pub fn is_fetched(&self) -> bool {
        self.fetched.get().is_some()
    }

    /// Value of `key` on the server, fetching on first use.
    pub fn get_value(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    pub fn properties(&self) -> ClientResult<Properties> {
        Ok(self.load()?.as_ref().clone())
    }

    pub fn property_names(&self) -> ClientResult<BTreeSet<String>> {
        Ok(self.load()?.keys().cloned().collect())
    }

    fn load(&self) -> ClientResult<Arc<Properties>> {
        if let Some(outcome) = self.fetched.get() {
            return outcome.clone();
        }

        let _guard = self.init.lock();
        if let Some(outcome) = self.fetched.get() {
            return outcome.clone();
        }

        let outcome = self.fetch().map(Arc::new);
        if outcome.is_ok() || self.policy == FetchPolicy::MemoizeFailure {
            let _ = self.fetched.set(outcome.clone());
        }
        outcome
    }

    fn fetch(&self) -> ClientResult<Properties> {
        let bootstrap = Bootstrap::from_config(&self.local)?;
        let url = bootstrap.request_url();

        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(
                HttpTransport::new(bootstrap.timeout)
                    .map_err(|e| ClientError::Transport(e.to_string()))?,
            ),
        };

        info!(%url, "reading configuration values");
        let reply = transport
            .get(&url)
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        match FetchStatus::from_code(reply.status) {
            FetchStatus::Token => {
                let decoded = decode_token(&reply.body, bootstrap.public_key.as_ref())?;
                if !decoded.verified {
                    warn!(
                        fingerprint = %decoded.key_fingerprint,
                        "config.server.publicKey not set, token signature not verified"
                    );
                }
                debug!(keys = decoded.properties.len(), "fetched configuration");
                Ok(decoded.properties)
            }
            FetchStatus::UnknownApplication => Err(ClientError::UnknownApplication(
                bootstrap.descriptor.application().to_string(),
            )),
            FetchStatus::ServerError => {
                warn!(status = reply.status, "config server error");
                Err(ClientError::Server(reply.body))
            }
        }
    }
}

impl fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSource")
            .field("policy", &self.policy)
            .field("fetched", &self.is_fetched())
            .finish_non_exhaustive()
    }
}

impl Source for RemoteSource {
    fn name(&self) -> &str {
        REMOTE_SOURCE_NAME
    }

    fn ordinal(&self) -> i32 {
        REMOTE_ORDINAL
    }

    fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(RemoteSource::get_value(self, key)?)
    }

    fn properties(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        Ok(RemoteSource::properties(self)?)
    }
}
