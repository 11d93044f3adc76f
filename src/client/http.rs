use std::error::Error as _;

use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::error::{RunError, RunResult};
use crate::lifecycle::BuildLog;

use super::models::{ExecutionEntity, ExecutionRequest};
use super::ExecutionApi;

/// JaaS REST client. The endpoint is supplied per call, so a single client
/// (and its connection pool) can be shared between runs.
#[derive(Debug, Clone, Default)]
pub struct JaasClient {
    http: Client,
}

impl JaasClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

fn executions_url(endpoint: &str, execution_id: Option<u64>) -> Result<Url, String> {
    let base = endpoint.trim_end_matches('/');
    let raw = match execution_id {
        Some(id) => format!("{base}/executions/{id}"),
        None => format!("{base}/executions"),
    };
    let url = Url::parse(&raw).map_err(|err| err.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("'{endpoint}' is not a base url"));
    }
    Ok(url)
}

impl ExecutionApi for JaasClient {
    async fn submit(
        &self,
        endpoint: &str,
        request: &ExecutionRequest,
        log: &mut dyn BuildLog,
    ) -> RunResult<ExecutionEntity> {
        let url = executions_url(endpoint, None).map_err(|err| {
            log.println("");
            RunError::bad_submit_url(err)
        })?;
        debug!(%url, env_id = %request.env_id, "submitting test execution");

        let result = async {
            let response = checked(self.http.post(url).json(request).send().await?)?;
            let status = response.status();
            let entity: ExecutionEntity = response.json().await?;
            Ok::<_, reqwest::Error>((status, entity))
        }
        .await;

        let (status, entity) = result.map_err(|err| {
            log.println("");
            RunError::submit_failed(describe(&err))
        })?;

        log.println("Request successfully sent!");
        log.println("");
        log.println(&format!("Response status: {}", status.as_u16()));
        log.println("Response body:");
        log.println(&render_entity(&entity));
        Ok(entity)
    }

    async fn fetch(
        &self,
        endpoint: &str,
        execution_id: u64,
        log: &mut dyn BuildLog,
    ) -> RunResult<ExecutionEntity> {
        log.print(&format!(
            "Polling status of test execution with id={execution_id} ... "
        ));
        let url = executions_url(endpoint, Some(execution_id)).map_err(|err| {
            log.println("");
            RunError::bad_poll_url(execution_id, err)
        })?;

        let result = async {
            let response = checked(self.http.get(url).send().await?)?;
            response.json::<ExecutionEntity>().await
        }
        .await;

        let entity = result.map_err(|err| {
            log.println("");
            RunError::poll_failed(execution_id, describe(&err))
        })?;

        debug!(execution_id, status = %entity.status, "polled test execution");
        log.println(entity.status.as_str());
        Ok(entity)
    }
}

fn checked(response: Response) -> reqwest::Result<Response> {
    response.error_for_status()
}

// reqwest keeps the interesting part (refused connection, bad JSON) in the
// source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn render_entity(entity: &ExecutionEntity) -> String {
    serde_json::to_string_pretty(entity).unwrap_or_else(|_| format!("{entity:?}"))
}
