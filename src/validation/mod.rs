use std::fmt;

use thiserror::Error;
use url::Url;

use crate::config::{ResolvedConfig, StepSettings};

pub const ENDPOINT_FIELD: &str = "JaaS endpoint";
pub const TEST_PROJECT_URL_FIELD: &str = "Test project URL";
pub const ENV_ID_FIELD: &str = "Environment ID";
pub const START_TIMEOUT_FIELD: &str = "Execution start timeout";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid url: {0}")]
    InvalidUrl(String),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("executionStartTimeoutInSeconds must be >= 0, got {0}")]
    Negative(String),
    #[error("{0} is mandatory!")]
    Mandatory(&'static str),
}

/// A failed check together with the field it was run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub error: ValidationError,
}

impl FieldIssue {
    pub fn new(field: &'static str, error: ValidationError) -> Self {
        Self { field, error }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error {
            ValidationError::Mandatory(_) => write!(f, "{}", self.error),
            _ => write!(f, "{}: {}", self.field, self.error),
        }
    }
}

impl std::error::Error for FieldIssue {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub fn check_url(value: &str) -> Result<(), ValidationError> {
    let url = Url::parse(value).map_err(|err| ValidationError::InvalidUrl(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ValidationError::InvalidUrl(format!(
            "'{value}' is not a hierarchical url"
        )));
    }
    Ok(())
}

/// Empty is accepted and means "use the service default".
pub fn check_start_timeout(value: &str) -> Result<(), ValidationError> {
    parse_start_timeout(value).map(|_| ())
}

pub fn check_required(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(ValidationError::Mandatory(field)),
    }
}

pub(crate) fn parse_start_timeout(value: &str) -> Result<Option<u64>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<i64>() {
        Ok(n) if n < 0 => Err(ValidationError::Negative(value.to_string())),
        Ok(n) => Ok(Some(n as u64)),
        Err(_) => Err(ValidationError::NotANumber(value.to_string())),
    }
}

// Values still carrying a `$` are resolved at run time, so the form-level
// checks let them through.
fn is_deferred(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.starts_with('$'))
}

pub fn check_endpoint_field(value: Option<&str>) -> Result<(), ValidationError> {
    if is_deferred(value) {
        return Ok(());
    }
    check_url(value.unwrap_or_default())
}

pub fn check_test_project_url_field(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        _ if is_deferred(value) => Ok(()),
        None | Some("") => Ok(()),
        Some(v) => check_url(v),
    }
}

pub fn check_env_id_field(value: Option<&str>) -> Result<(), ValidationError> {
    if is_deferred(value) {
        return Ok(());
    }
    check_required(ENV_ID_FIELD, value)
}

pub fn check_start_timeout_field(value: Option<&str>) -> Result<(), ValidationError> {
    if is_deferred(value) {
        return Ok(());
    }
    check_start_timeout(value.unwrap_or_default())
}

/// Runs every field check against raw, possibly templated settings.
pub fn validate_settings(settings: &StepSettings) -> Vec<FieldIssue> {
    let checks = [
        (
            ENDPOINT_FIELD,
            check_endpoint_field(settings.jaas_endpoint.as_deref()),
        ),
        (
            TEST_PROJECT_URL_FIELD,
            check_test_project_url_field(settings.test_project_url.as_deref()),
        ),
        (ENV_ID_FIELD, check_env_id_field(settings.env_id.as_deref())),
        (
            START_TIMEOUT_FIELD,
            check_start_timeout_field(settings.execution_start_timeout.as_deref()),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|error| FieldIssue::new(field, error)))
        .collect()
}

/// Checks a resolved snapshot before anything is submitted. Stops at the
/// first problem.
pub fn validate_resolved(config: &ResolvedConfig) -> Result<(), FieldIssue> {
    let endpoint = config.endpoint()?;
    check_url(endpoint).map_err(|error| FieldIssue::new(ENDPOINT_FIELD, error))?;
    if let Some(url) = config.test_project_url() {
        check_url(url).map_err(|error| FieldIssue::new(TEST_PROJECT_URL_FIELD, error))?;
    }
    config.env_id()?;
    if let Some(timeout) = config.execution_start_timeout() {
        check_start_timeout(timeout)
            .map_err(|error| FieldIssue::new(START_TIMEOUT_FIELD, error))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SubstitutionContext;
    use pretty_assertions::assert_eq;

    #[test]
    fn check_url_accepts_absolute_urls_only() {
        assert!(check_url("http://host/path").is_ok());
        assert!(check_url("https://jaas.example.com:8088/jaas").is_ok());

        let err = check_url("not a url").unwrap_err();
        assert!(err.to_string().starts_with("Invalid url: "));
        assert!(check_url("").is_err());
        assert!(check_url("mailto:ops@example.com").is_err());
    }

    #[test]
    fn check_start_timeout_covers_type_and_range() {
        assert!(check_start_timeout("").is_ok());
        assert!(check_start_timeout("0").is_ok());
        assert!(check_start_timeout("120").is_ok());

        assert_eq!(
            check_start_timeout("-1"),
            Err(ValidationError::Negative("-1".to_string()))
        );
        assert_eq!(
            check_start_timeout("abc").unwrap_err().to_string(),
            "'abc' is not a number"
        );
        assert!(check_start_timeout("1.5").is_err());
    }

    #[test]
    fn check_required_rejects_missing_and_empty() {
        assert!(check_required(ENV_ID_FIELD, Some("env-1")).is_ok());
        assert_eq!(
            check_required(ENV_ID_FIELD, Some("")).unwrap_err().to_string(),
            "Environment ID is mandatory!"
        );
        assert!(check_required(ENV_ID_FIELD, None).is_err());
    }

    #[test]
    fn field_checks_defer_templated_values() {
        assert!(check_endpoint_field(Some("${JAAS_URL}")).is_ok());
        assert!(check_env_id_field(Some("$ENV_ID")).is_ok());
        assert!(check_start_timeout_field(Some("${TIMEOUT}")).is_ok());
        assert!(check_test_project_url_field(None).is_ok());
        assert!(check_endpoint_field(None).is_err());
    }

    #[test]
    fn validate_settings_reports_every_failing_field() {
        let settings = StepSettings {
            jaas_endpoint: Some("jaas".to_string()),
            test_project_url: Some("http://repo/project.git".to_string()),
            env_id: None,
            load_scenario_id: None,
            execution_start_timeout: Some("soon".to_string()),
        };

        let issues = validate_settings(&settings);
        let fields: Vec<_> = issues.iter().map(|issue| issue.field).collect();
        assert_eq!(fields, vec![ENDPOINT_FIELD, ENV_ID_FIELD, START_TIMEOUT_FIELD]);
    }

    #[test]
    fn validate_resolved_requires_endpoint_and_env_id() {
        let ctx = SubstitutionContext::default();
        let settings = StepSettings {
            jaas_endpoint: Some("http://x/jaas".to_string()),
            env_id: Some("  ".to_string()),
            ..StepSettings::default()
        };
        let resolved = ResolvedConfig::resolve(&settings, &ctx);
        let issue = validate_resolved(&resolved).unwrap_err();
        assert_eq!(issue.field, ENV_ID_FIELD);

        let settings = StepSettings {
            jaas_endpoint: Some("http://x/jaas".to_string()),
            env_id: Some("env-1".to_string()),
            execution_start_timeout: Some("30".to_string()),
            ..StepSettings::default()
        };
        assert!(validate_resolved(&ResolvedConfig::resolve(&settings, &ctx)).is_ok());
    }
}
