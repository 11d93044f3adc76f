use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Timeout
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST {endpoint}/executions`. Unset optional fields are left out
/// so the service applies its own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub env_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_scenario_id: Option<String>,
    #[serde(rename = "testProjectURL", skip_serializing_if = "Option::is_none")]
    pub test_project_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_start_timeout_in_seconds: Option<u64>,
}

/// An execution as reported by JaaS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEntity {
    pub id: u64,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_scenario_id: Option<String>,
    #[serde(
        rename = "testProjectURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub test_project_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_start_timeout_in_seconds: Option<u64>,
}

impl ExecutionEntity {
    pub fn new(id: u64, status: ExecutionStatus) -> Self {
        Self {
            id,
            status,
            session_id: None,
            env_id: None,
            load_scenario_id: None,
            test_project_url: None,
            execution_start_timeout_in_seconds: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
