//! Per-application source aggregation.
//!
//! Layout under the lookup root:
//! - `{app}/{app}{suffix}` at ordinal 150
//! - `{app}/{app}-{stage}{suffix}` at ordinal 200

use std::collections::BTreeSet;
use std::sync::Arc;

use stagecfg_core::{ConfigError, ConfigType, FileSource, Source};
use stagecfg_protocol::{AppDescriptor, ValidationError};
use thiserror::Error;
use tracing::debug;

use crate::lookup::ResourceLookup;

/// Ordinal of an application's base files.
pub const BASE_ORDINAL: i32 = 150;

/// Ordinal of an application's stage files.
pub const STAGE_ORDINAL: i32 = 200;

/// Errors from aggregating sources.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Application '{0}' is not known")]
    UnknownApplication(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read {location}: {message}")]
    Lookup { location: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Finds the configuration files of allow-listed applications.
pub struct SourceAggregator {
    lookup: Arc<dyn ResourceLookup>,
    applications: BTreeSet<String>,
}

impl SourceAggregator {
    pub fn new<I, S>(lookup: Arc<dyn ResourceLookup>, applications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lookup,
            applications: applications.into_iter().map(Into::into).collect(),
        }
    }

    pub fn applications(&self) -> &BTreeSet<String> {
        &self.applications
    }

    pub fn is_known(&self, application: &str) -> bool {
        self.applications.contains(application)
    }

    /// Sources for `application`, with stage files when `stage` is non-empty.
    ///
    /// A known application without files yields an empty list.
    pub fn sources(
        &self,
        application: &str,
        stage: Option<&str>,
    ) -> Result<Vec<Arc<dyn Source>>, AggregateError> {
        let descriptor = AppDescriptor::new(application, stage)?;
        if !self.is_known(descriptor.application()) {
            return Err(AggregateError::UnknownApplication(application.to_string()));
        }

        let app = descriptor.application();
        let mut sources = self.probe(&format!("{app}/{app}"), BASE_ORDINAL)?;
        if let Some(stage) = descriptor.stage() {
            sources.extend(self.probe(&format!("{app}/{app}-{stage}"), STAGE_ORDINAL)?);
        }

        debug!(%descriptor, sources = sources.len(), "aggregated sources");
        Ok(sources)
    }

    fn probe(&self, stem: &str, ordinal: i32) -> Result<Vec<Arc<dyn Source>>, AggregateError> {
        let mut sources: Vec<Arc<dyn Source>> = Vec::new();
        for config_type in ConfigType::ALL {
            let relative = format!("{stem}{}", config_type.suffix());
            let resource = self
                .lookup
                .read(&relative)
                .map_err(|e| AggregateError::Lookup {
                    location: relative.clone(),
                    message: e.to_string(),
                })?;
            if let Some(resource) = resource {
                let source =
                    FileSource::parse(config_type, resource.location, &resource.content, ordinal)?;
                sources.push(Arc::new(source));
            }
        }
        Ok(sources)
    }
}
