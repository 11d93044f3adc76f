use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::client::ExecutionRequest;
use crate::env::{resolve_value, SubstitutionContext};
use crate::validation::{
    parse_start_timeout, FieldIssue, ValidationError, ENDPOINT_FIELD, ENV_ID_FIELD,
    START_TIMEOUT_FIELD,
};

/// Raw step settings as the user wrote them. Values may still contain
/// `$NAME` / `${NAME}` macros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepSettings {
    pub jaas_endpoint: Option<String>,
    pub test_project_url: Option<String>,
    pub env_id: Option<String>,
    pub load_scenario_id: Option<String>,
    #[serde(
        rename = "executionStartTimeoutInSeconds",
        deserialize_with = "string_or_number"
    )]
    pub execution_start_timeout: Option<String>,
}

// Config files may carry the timeout as a JSON number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl StepSettings {
    /// Fields set on `other` replace the ones here.
    pub fn overlay(mut self, other: &StepSettings) -> Self {
        fn pick(slot: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        pick(&mut self.jaas_endpoint, &other.jaas_endpoint);
        pick(&mut self.test_project_url, &other.test_project_url);
        pick(&mut self.env_id, &other.env_id);
        pick(&mut self.load_scenario_id, &other.load_scenario_id);
        pick(&mut self.execution_start_timeout, &other.execution_start_timeout);
        self
    }
}

/// Placeholder-free settings for exactly one run.
///
/// Built fresh by [`ResolvedConfig::resolve`] at the start of every run and
/// never mutated afterwards. Optional accessors return `None` when the setting
/// resolved to nothing (absent or blank).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    jaas_endpoint: Option<String>,
    test_project_url: Option<String>,
    env_id: Option<String>,
    load_scenario_id: Option<String>,
    execution_start_timeout: Option<String>,
}

impl ResolvedConfig {
    pub fn resolve(settings: &StepSettings, ctx: &SubstitutionContext) -> Self {
        let resolve = |raw: &Option<String>| resolve_value(raw.as_deref(), ctx);
        Self {
            jaas_endpoint: resolve(&settings.jaas_endpoint),
            test_project_url: resolve(&settings.test_project_url),
            env_id: resolve(&settings.env_id),
            load_scenario_id: resolve(&settings.load_scenario_id),
            execution_start_timeout: resolve(&settings.execution_start_timeout),
        }
    }

    pub fn endpoint(&self) -> Result<&str, FieldIssue> {
        self.jaas_endpoint
            .as_deref()
            .ok_or_else(|| FieldIssue::new(ENDPOINT_FIELD, ValidationError::Mandatory(ENDPOINT_FIELD)))
    }

    pub fn env_id(&self) -> Result<&str, FieldIssue> {
        self.env_id
            .as_deref()
            .ok_or_else(|| FieldIssue::new(ENV_ID_FIELD, ValidationError::Mandatory(ENV_ID_FIELD)))
    }

    pub fn test_project_url(&self) -> Option<&str> {
        self.test_project_url.as_deref()
    }

    pub fn load_scenario_id(&self) -> Option<&str> {
        self.load_scenario_id.as_deref()
    }

    /// The timeout as resolved, before it is parsed.
    pub fn execution_start_timeout(&self) -> Option<&str> {
        self.execution_start_timeout.as_deref()
    }

    pub fn start_timeout_secs(&self) -> Result<Option<u64>, FieldIssue> {
        match self.execution_start_timeout.as_deref() {
            Some(raw) => parse_start_timeout(raw)
                .map_err(|error| FieldIssue::new(START_TIMEOUT_FIELD, error)),
            None => Ok(None),
        }
    }

    pub fn execution_request(&self) -> Result<ExecutionRequest, FieldIssue> {
        Ok(ExecutionRequest {
            env_id: self.env_id()?.to_string(),
            load_scenario_id: self.load_scenario_id.clone(),
            test_project_url: self.test_project_url.clone(),
            execution_start_timeout_in_seconds: self.start_timeout_secs()?,
        })
    }

    /// Link to the JaaS report page for a finished session.
    pub fn report_url(&self, session_id: &str) -> Result<String, FieldIssue> {
        let endpoint = self.endpoint()?.trim_end_matches('/');
        Ok(format!("{endpoint}/report?sessionId={session_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvMap;
    use pretty_assertions::assert_eq;

    fn vars(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn templated() -> StepSettings {
        StepSettings {
            jaas_endpoint: Some("http://${JAAS_HOST}/jaas".to_string()),
            test_project_url: Some("$PROJECT_URL".to_string()),
            env_id: Some("$ENV_ID".to_string()),
            load_scenario_id: Some("${SCENARIO}".to_string()),
            execution_start_timeout: Some("$TIMEOUT".to_string()),
        }
    }

    #[test]
    fn resolve_without_placeholders_only_drops_blanks() {
        let settings = StepSettings {
            jaas_endpoint: Some("http://x/jaas".to_string()),
            test_project_url: Some("   ".to_string()),
            env_id: Some("env-1".to_string()),
            load_scenario_id: Some(String::new()),
            execution_start_timeout: None,
        };
        let resolved = ResolvedConfig::resolve(&settings, &SubstitutionContext::default());

        assert_eq!(
            resolved,
            ResolvedConfig {
                jaas_endpoint: Some("http://x/jaas".to_string()),
                test_project_url: None,
                env_id: Some("env-1".to_string()),
                load_scenario_id: None,
                execution_start_timeout: None,
            }
        );
    }

    #[test]
    fn each_resolution_starts_from_scratch() {
        let settings = templated();

        let first = ResolvedConfig::resolve(
            &settings,
            &SubstitutionContext::new(
                vars(&[
                    ("JAAS_HOST", "first"),
                    ("PROJECT_URL", "http://repo/one.git"),
                    ("ENV_ID", "env-1"),
                    ("SCENARIO", "smoke"),
                    ("TIMEOUT", "60"),
                ]),
                EnvMap::new(),
            ),
        );
        let second = ResolvedConfig::resolve(
            &settings,
            &SubstitutionContext::new(
                vars(&[("ENV_ID", "env-2"), ("SCENARIO", "")]),
                vars(&[("JAAS_HOST", "second")]),
            ),
        );

        assert_eq!(first.jaas_endpoint.as_deref(), Some("http://first/jaas"));
        assert_eq!(first.load_scenario_id.as_deref(), Some("smoke"));

        assert_eq!(second.jaas_endpoint.as_deref(), Some("http://second/jaas"));
        assert_eq!(second.env_id.as_deref(), Some("env-2"));
        assert_eq!(second.load_scenario_id, None);
        assert_eq!(second.test_project_url.as_deref(), Some("$PROJECT_URL"));
        assert_eq!(second.execution_start_timeout.as_deref(), Some("$TIMEOUT"));
    }

    #[test]
    fn accessors_expose_the_resolved_values() {
        let resolved = ResolvedConfig::resolve(
            &templated(),
            &SubstitutionContext::new(
                vars(&[("ENV_ID", "env-1"), ("TIMEOUT", "abc"), ("SCENARIO", " ")]),
                vars(&[("JAAS_HOST", "x")]),
            ),
        );

        assert_eq!(resolved.endpoint().unwrap(), "http://x/jaas");
        assert_eq!(resolved.env_id().unwrap(), "env-1");
        assert_eq!(resolved.test_project_url(), Some("$PROJECT_URL"));
        assert_eq!(resolved.load_scenario_id(), None);
        assert_eq!(resolved.execution_start_timeout(), Some("abc"));
        assert!(resolved.start_timeout_secs().is_err());
    }

    #[test]
    fn execution_request_parses_timeout_and_requires_env_id() {
        let resolved = ResolvedConfig {
            jaas_endpoint: Some("http://x/jaas".to_string()),
            test_project_url: None,
            env_id: Some("env-1".to_string()),
            load_scenario_id: Some("smoke".to_string()),
            execution_start_timeout: Some("120".to_string()),
        };
        let request = resolved.execution_request().unwrap();
        assert_eq!(request.env_id, "env-1");
        assert_eq!(request.load_scenario_id.as_deref(), Some("smoke"));
        assert_eq!(request.execution_start_timeout_in_seconds, Some(120));

        let bad_timeout = ResolvedConfig {
            execution_start_timeout: Some("-5".to_string()),
            ..resolved.clone()
        };
        let issue = bad_timeout.execution_request().unwrap_err();
        assert_eq!(issue.field, START_TIMEOUT_FIELD);

        let no_env = ResolvedConfig {
            env_id: None,
            ..resolved
        };
        assert_eq!(no_env.execution_request().unwrap_err().field, ENV_ID_FIELD);
    }

    #[test]
    fn report_url_joins_endpoint_and_session() {
        for endpoint in ["http://x/jaas", "http://x/jaas/"] {
            let resolved = ResolvedConfig::resolve(
                &StepSettings {
                    jaas_endpoint: Some(endpoint.to_string()),
                    ..StepSettings::default()
                },
                &SubstitutionContext::default(),
            );
            assert_eq!(
                resolved.report_url("abc123").unwrap(),
                "http://x/jaas/report?sessionId=abc123"
            );
        }
    }

    #[test]
    fn timeout_may_be_written_as_number() {
        let settings: StepSettings =
            serde_json::from_str(r#"{"envId": "e", "executionStartTimeoutInSeconds": 300}"#)
                .unwrap();
        assert_eq!(settings.execution_start_timeout.as_deref(), Some("300"));

        let settings: StepSettings = serde_json::from_str(r#"{"envId": "e"}"#).unwrap();
        assert_eq!(settings.execution_start_timeout, None);
    }

    #[test]
    fn overlay_keeps_unset_fields() {
        let base = StepSettings {
            jaas_endpoint: Some("http://base/jaas".to_string()),
            env_id: Some("base-env".to_string()),
            ..StepSettings::default()
        };
        let merged = base.overlay(&StepSettings {
            env_id: Some("override".to_string()),
            ..StepSettings::default()
        });
        assert_eq!(merged.jaas_endpoint.as_deref(), Some("http://base/jaas"));
        assert_eq!(merged.env_id.as_deref(), Some("override"));
    }
}
