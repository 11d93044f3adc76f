use thiserror::Error;

use crate::validation::FieldIssue;

pub type RunResult<T> = Result<T, RunError>;

/// Everything that can abort a run. None of these are retried.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] FieldIssue),

    #[error("Invalid JaaS endpoint URL while {action}: {message}")]
    Transport {
        action: String,
        execution_id: Option<u64>,
        message: String,
    },

    #[error("Error occurred while {action}: {message}")]
    Remote {
        action: String,
        execution_id: Option<u64>,
        message: String,
    },

    #[error("Test execution with id={execution_id} cancelled by timeout.")]
    Timeout { execution_id: u64 },

    #[error("Test execution with id={execution_id} finished with status FAILED!")]
    ExecutionFailed { execution_id: u64 },

    #[error("Run cancelled while {stage}")]
    Cancelled {
        stage: String,
        execution_id: Option<u64>,
    },
}

const SUBMIT_ACTION: &str = "sending test execution to JaaS";

fn poll_action(execution_id: u64) -> String {
    format!("polling status of test execution with id={execution_id}")
}

impl RunError {
    pub(crate) fn submit_failed(err: impl std::fmt::Display) -> Self {
        RunError::Remote {
            action: SUBMIT_ACTION.to_string(),
            execution_id: None,
            message: err.to_string(),
        }
    }

    pub(crate) fn poll_failed(execution_id: u64, err: impl std::fmt::Display) -> Self {
        RunError::Remote {
            action: poll_action(execution_id),
            execution_id: Some(execution_id),
            message: err.to_string(),
        }
    }

    pub(crate) fn bad_submit_url(err: impl std::fmt::Display) -> Self {
        RunError::Transport {
            action: SUBMIT_ACTION.to_string(),
            execution_id: None,
            message: err.to_string(),
        }
    }

    pub(crate) fn bad_poll_url(execution_id: u64, err: impl std::fmt::Display) -> Self {
        RunError::Transport {
            action: poll_action(execution_id),
            execution_id: Some(execution_id),
            message: err.to_string(),
        }
    }

    /// The execution the failure refers to, when one had been created.
    pub fn execution_id(&self) -> Option<u64> {
        match self {
            RunError::Configuration(_) => None,
            RunError::Transport { execution_id, .. }
            | RunError::Remote { execution_id, .. }
            | RunError::Cancelled { execution_id, .. } => *execution_id,
            RunError::Timeout { execution_id } | RunError::ExecutionFailed { execution_id } => {
                Some(*execution_id)
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{FieldIssue, ValidationError};

    #[test]
    fn messages_name_the_execution() {
        let err = RunError::poll_failed(42, "connection refused");
        assert_eq!(
            err.to_string(),
            "Error occurred while polling status of test execution with id=42: connection refused"
        );
        assert_eq!(err.execution_id(), Some(42));

        let err = RunError::ExecutionFailed { execution_id: 7 };
        assert_eq!(
            err.to_string(),
            "Test execution with id=7 finished with status FAILED!"
        );
    }

    #[test]
    fn transport_errors_name_the_execution_when_known() {
        let err = RunError::bad_poll_url(9, "relative URL without a base");
        assert_eq!(err.execution_id(), Some(9));
        assert_eq!(
            err.to_string(),
            "Invalid JaaS endpoint URL while polling status of test execution with id=9: \
             relative URL without a base"
        );

        let err = RunError::bad_submit_url("relative URL without a base");
        assert_eq!(err.execution_id(), None);
        assert!(err
            .to_string()
            .starts_with("Invalid JaaS endpoint URL while sending test execution to JaaS: "));
    }

    #[test]
    fn configuration_errors_carry_the_field() {
        let err = RunError::from(FieldIssue::new(
            "Environment ID",
            ValidationError::Mandatory("Environment ID"),
        ));
        assert_eq!(err.execution_id(), None);
        assert_eq!(
            err.to_string(),
            "Configuration error: Environment ID is mandatory!"
        );
    }
}
