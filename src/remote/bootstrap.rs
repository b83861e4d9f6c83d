//! Bootstrap parameters: how the client finds its config server.

use std::time::Duration;

use stagecfg_core::ResolvedConfig;
use stagecfg_protocol::{
    decode_verifying_key, AppDescriptor, ValidationError, ValidationRule,
    VerifyingKey, CONFIG_SEGMENT, STAGE_PARAM,
};
use url::Url;

use crate::error::{ClientError, ClientResult};

pub const URL_KEY: &str = "config.server.url";
pub const APP_KEY: &str = "config.server.app";
pub const STAGE_KEY: &str = "config.server.stage";
pub const PUBLIC_KEY_KEY: &str = "config.server.publicKey";
pub const TIMEOUT_KEY: &str = "config.server.timeout";

/// Request timeout when `config.server.timeout` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated bootstrap parameters.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub server_url: Url,
    pub descriptor: AppDescriptor,
    /// When set, token signatures are verified against this key.
    pub public_key: Option<VerifyingKey>,
    pub timeout: Duration,
}

impl Bootstrap {
    /// Read and validate the bootstrap parameters from `config`.
    pub fn from_config(config: &ResolvedConfig) -> ClientResult<Self> {
        let raw_url = config
            .get_optional_value::<String>(URL_KEY)?
            .ok_or_else(|| ValidationError::required(URL_KEY))?;
        let server_url = Url::parse(raw_url.trim())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ValidationError::new(URL_KEY, ValidationRule::InvalidUrl))?;

        let application = config.get_raw(APP_KEY)?;
        let stage = config.get_raw(STAGE_KEY)?;
        let descriptor = AppDescriptor::with_parameter_names(
            APP_KEY,
            application.as_deref(),
            STAGE_KEY,
            stage.as_deref(),
        )?;

        let public_key = config
            .get_optional_value::<String>(PUBLIC_KEY_KEY)?
            .map(|encoded| decode_verifying_key(&encoded))
            .transpose()
            .map_err(|e| ClientError::Token(format!("{PUBLIC_KEY_KEY}: {e}")))?;

        let timeout = config
            .get_optional_value::<u64>(TIMEOUT_KEY)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            server_url,
            descriptor,
            public_key,
            timeout,
        })
    }

    /// `{url}[/]config/{app}[?stage=…]`
    pub fn request_url(&self) -> Url {
        let mut url = self.server_url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let path = format!(
            "{}{}/{}",
            url.path(),
            CONFIG_SEGMENT,
            self.descriptor.application()
        );
        url.set_path(&path);
        url.set_query(None);
        if let Some(stage) = self.descriptor.stage() {
            url.query_pairs_mut().append_pair(STAGE_PARAM, stage);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecfg_core::{ConfigBuilder, MapSource};

    fn bootstrap(pairs: &[(&str, &str)]) -> ClientResult<Bootstrap> {
        let config = ConfigBuilder::new()
            .with_source(MapSource::from_pairs("local", 100, pairs.iter().copied()))
            .build();
        Bootstrap::from_config(&config)
    }

    fn validation(result: ClientResult<Bootstrap>) -> String {
        match result {
            Err(ClientError::Validation(e)) => e.to_string(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_request_url() {
        let b = bootstrap(&[(URL_KEY, "http://localhost:8080"), (APP_KEY, "shop")]).unwrap();
        assert_eq!(b.request_url().as_str(), "http://localhost:8080/config/shop");
        assert_eq!(b.timeout, DEFAULT_TIMEOUT);

        let b = bootstrap(&[
            (URL_KEY, "http://localhost:8080/base/"),
            (APP_KEY, "shop"),
            (STAGE_KEY, "prod"),
        ])
        .unwrap();
        assert_eq!(
            b.request_url().as_str(),
            "http://localhost:8080/base/config/shop?stage=prod"
        );
    }

    #[test]
    fn test_missing_parameters() {
        assert_eq!(
            validation(bootstrap(&[(APP_KEY, "shop")])),
            "parameter 'config.server.url' is required"
        );
        assert_eq!(
            validation(bootstrap(&[(URL_KEY, "http://localhost")])),
            "parameter 'config.server.app' is required"
        );
        assert_eq!(
            validation(bootstrap(&[(URL_KEY, "http://localhost"), (APP_KEY, "")])),
            "parameter 'config.server.app' is required"
        );
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            validation(bootstrap(&[(URL_KEY, "http://localhost"), (APP_KEY, "test&")])),
            "parameter 'config.server.app' can contain only alphabet characters and digits"
        );
        assert_eq!(
            validation(bootstrap(&[
                (URL_KEY, "http://localhost"),
                (APP_KEY, "shop"),
                (STAGE_KEY, "pr-od")
            ])),
            "parameter 'config.server.stage' can contain only alphabet characters and digits"
        );
        assert_eq!(
            validation(bootstrap(&[(URL_KEY, "blablabla"), (APP_KEY, "shop")])),
            "parameter 'config.server.url' must be an absolute URL"
        );
    }

    #[test]
    fn test_optional_parameters() {
        let b = bootstrap(&[
            (URL_KEY, "http://localhost"),
            (APP_KEY, "shop"),
            (TIMEOUT_KEY, "5"),
        ])
        .unwrap();
        assert_eq!(b.timeout, Duration::from_secs(5));
        assert!(b.public_key.is_none());

        let err = bootstrap(&[
            (URL_KEY, "http://localhost"),
            (APP_KEY, "shop"),
            (PUBLIC_KEY_KEY, "not-a-key"),
        ])
        .unwrap_err();
        assert!(matches!(err, ClientError::Token(_)));
    }
}
