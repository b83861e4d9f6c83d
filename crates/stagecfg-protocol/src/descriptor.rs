//! Application/stage identifiers.
//!
//! Both identifiers end up in filesystem paths on the server, so they are
//! restricted to ASCII letters and digits before they are used anywhere.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule a parameter violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Mandatory parameter is absent or empty.
    Required,
    /// Parameter contains something other than letters and digits.
    InvalidCharacters,
    /// Parameter is not an absolute URL.
    InvalidUrl,
}

/// A parameter failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub parameter: String,
    pub rule: ValidationRule,
}

impl ValidationError {
    pub fn new(parameter: impl Into<String>, rule: ValidationRule) -> Self {
        Self {
            parameter: parameter.into(),
            rule,
        }
    }

    pub fn required(parameter: impl Into<String>) -> Self {
        Self::new(parameter, ValidationRule::Required)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            ValidationRule::Required => {
                write!(f, "parameter '{}' is required", self.parameter)
            }
            ValidationRule::InvalidCharacters => write!(
                f,
                "parameter '{}' can contain only alphabet characters and digits",
                self.parameter
            ),
            ValidationRule::InvalidUrl => {
                write!(f, "parameter '{}' must be an absolute URL", self.parameter)
            }
        }
    }
}

/// Validate one identifier.
///
/// Empty counts as absent. Returns the identifier when present and valid,
/// `None` when absent and optional.
pub fn validate_identifier(
    parameter: &str,
    value: Option<&str>,
    required: bool,
) -> Result<Option<String>, ValidationError> {
    match value {
        None | Some("") if required => Err(ValidationError::required(parameter)),
        None | Some("") => Ok(None),
        Some(value) if value.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Ok(Some(value.to_string()))
        }
        Some(_) => Err(ValidationError::new(parameter, ValidationRule::InvalidCharacters)),
    }
}

/// Which configuration set to resolve: an application and optional stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppDescriptor {
    application: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage: Option<String>,
}

impl AppDescriptor {
    /// Parameter name used for the application in server-side messages.
    pub const APPLICATION_PARAM: &'static str = "application";
    /// Parameter name used for the stage in server-side messages.
    pub const STAGE_PARAM: &'static str = "stage";

    /// Validate with the wire parameter names.
    pub fn new(application: &str, stage: Option<&str>) -> Result<Self, ValidationError> {
        Self::with_parameter_names(
            Self::APPLICATION_PARAM,
            Some(application),
            Self::STAGE_PARAM,
            stage,
        )
    }

    /// Validate, naming the parameters as the caller knows them.
    pub fn with_parameter_names(
        application_param: &str,
        application: Option<&str>,
        stage_param: &str,
        stage: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let application = validate_identifier(application_param, application, true)?
            .ok_or_else(|| ValidationError::required(application_param))?;
        let stage = validate_identifier(stage_param, stage, false)?;
        Ok(Self { application, stage })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }
}

impl fmt::Display for AppDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stage {
            Some(stage) => write!(f, "{}-{}", self.application, stage),
            None => f.write_str(&self.application),
        }
    }
}
