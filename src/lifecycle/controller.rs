use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::client::{ExecutionApi, ExecutionEntity, ExecutionRequest, ExecutionStatus};
use crate::config::ResolvedConfig;
use crate::error::{RunError, RunResult};

use super::cancel::CancelToken;
use super::log::BuildLog;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a successful run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub execution_id: u64,
    pub status: ExecutionStatus,
    pub session_id: Option<String>,
    pub report_url: Option<String>,
    /// Status reads made while waiting for the execution to leave PENDING.
    pub start_polls: usize,
    /// Status reads made while waiting for the execution to leave RUNNING.
    pub finish_polls: usize,
}

/// Drives one execution from submission to a terminal status:
///
/// 1. build the request from the resolved settings,
/// 2. submit it,
/// 3. poll while the execution is PENDING (TIMEOUT aborts),
/// 4. poll while it is RUNNING (FAILED aborts),
/// 5. publish the report link.
///
/// Every step runs sequentially on the caller's task. Nothing is retried;
/// the first error ends the run.
pub struct LifecycleController<C> {
    client: C,
    poll_interval: Duration,
    cancel: CancelToken,
}

impl<C: ExecutionApi> LifecycleController<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn run(
        &self,
        config: &ResolvedConfig,
        log: &mut dyn BuildLog,
    ) -> RunResult<RunOutcome> {
        log.banner("Step 1: Creating test execution request...");
        let endpoint = config.endpoint()?;
        let request = describe_request(endpoint, config, log)?;

        log.banner("Step 2: Sending request to JaaS...");
        let created = self
            .guarded(
                "submitting test execution".to_string(),
                None,
                self.client.submit(endpoint, &request, log),
            )
            .await?;
        let execution_id = created.id;
        info!(execution_id, status = %created.status, "test execution created");

        log.banner("Step 3: Waiting test to start execution...");
        let start_polls = self.wait_started(endpoint, execution_id, log).await?;

        log.banner("Step 4: Waiting test to finish execution...");
        let (finished, finish_polls) = self.wait_finished(endpoint, execution_id, log).await?;

        log.banner("Step 5: Publishing test execution results...");
        let report_url = match finished.session_id.as_deref() {
            Some(session_id) => {
                let url = config.report_url(session_id)?;
                log.println("Test execution report can be found by the link:");
                log.println(&url);
                Some(url)
            }
            None => {
                log.println("sessionId is unavailable. Can't publish link to the test report.");
                None
            }
        };

        Ok(RunOutcome {
            execution_id,
            status: finished.status,
            session_id: finished.session_id,
            report_url,
            start_polls,
            finish_polls,
        })
    }

    async fn wait_started(
        &self,
        endpoint: &str,
        execution_id: u64,
        log: &mut dyn BuildLog,
    ) -> RunResult<usize> {
        let stage = format!("waiting test execution with id={execution_id} to start");
        let mut polls = 0;

        loop {
            let execution = self.poll(endpoint, execution_id, &stage, log).await?;
            polls += 1;

            match execution.status {
                ExecutionStatus::Pending => self.pause(execution_id, &stage).await?,
                ExecutionStatus::Timeout => {
                    log.println("");
                    return Err(RunError::Timeout { execution_id });
                }
                status => {
                    info!(execution_id, %status, polls, "test execution started");
                    return Ok(polls);
                }
            }
        }
    }

    async fn wait_finished(
        &self,
        endpoint: &str,
        execution_id: u64,
        log: &mut dyn BuildLog,
    ) -> RunResult<(ExecutionEntity, usize)> {
        let stage = format!("waiting test execution with id={execution_id} to finish");
        let mut polls = 0;

        let execution = loop {
            let execution = self.poll(endpoint, execution_id, &stage, log).await?;
            polls += 1;
            self.pause(execution_id, &stage).await?;
            if execution.status != ExecutionStatus::Running {
                break execution;
            }
        };

        match execution.status {
            ExecutionStatus::Completed => {
                log.success(&format!(
                    "Test execution with id={execution_id} successfully finished!"
                ));
            }
            ExecutionStatus::Failed => {
                return Err(RunError::ExecutionFailed { execution_id });
            }
            status => {
                // Accepted as success; JaaS should never end RUNNING this way.
                warn!(execution_id, %status, "test execution left RUNNING with an unexpected status");
            }
        }

        Ok((execution, polls))
    }

    async fn poll(
        &self,
        endpoint: &str,
        execution_id: u64,
        stage: &str,
        log: &mut dyn BuildLog,
    ) -> RunResult<ExecutionEntity> {
        let result = self
            .guarded(
                stage.to_string(),
                Some(execution_id),
                self.client.fetch(endpoint, execution_id, log),
            )
            .await;
        if matches!(&result, Err(err) if err.is_cancelled()) {
            // finish the half-written polling line
            log.println("");
        }
        result
    }

    async fn pause(&self, execution_id: u64, stage: &str) -> RunResult<()> {
        debug!(execution_id, interval = ?self.poll_interval, "sleeping before next poll");
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled(stage, Some(execution_id))),
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
        }
    }

    async fn guarded<T>(
        &self,
        stage: String,
        execution_id: Option<u64>,
        call: impl Future<Output = RunResult<T>>,
    ) -> RunResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(cancelled(&stage, execution_id)),
            result = call => result,
        }
    }
}

fn cancelled(stage: &str, execution_id: Option<u64>) -> RunError {
    warn!(?execution_id, stage, "run cancelled");
    RunError::Cancelled {
        stage: stage.to_string(),
        execution_id,
    }
}

fn describe_request(
    endpoint: &str,
    config: &ResolvedConfig,
    log: &mut dyn BuildLog,
) -> RunResult<ExecutionRequest> {
    let request = config.execution_request()?;

    log.println(&format!("JaaS endpoint: {endpoint}"));
    log.println("Test execution properties:");
    log.println(&format!("    Environment ID: {}", request.env_id));
    if let Some(scenario) = &request.load_scenario_id {
        log.println(&format!("    Load scenario ID: {scenario}"));
    }
    if let Some(url) = &request.test_project_url {
        log.println(&format!("    Test project URL: {url}"));
    }
    if let Some(timeout) = request.execution_start_timeout_in_seconds {
        log.println(&format!("    Execution start timeout in seconds: {timeout}"));
    }

    Ok(request)
}
