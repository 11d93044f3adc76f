use std::future::Future;

use crate::error::RunResult;
use crate::lifecycle::BuildLog;

mod http;
mod models;

pub use http::JaasClient;
pub use models::{ExecutionEntity, ExecutionRequest, ExecutionStatus};

/// The two remote operations the lifecycle controller drives.
///
/// The endpoint comes from the run's resolved settings on every call, so one
/// client can serve runs against different JaaS instances. Implementations
/// write their progress lines to `log` around each call.
pub trait ExecutionApi {
    fn submit(
        &self,
        endpoint: &str,
        request: &ExecutionRequest,
        log: &mut dyn BuildLog,
    ) -> impl Future<Output = RunResult<ExecutionEntity>>;

    fn fetch(
        &self,
        endpoint: &str,
        execution_id: u64,
        log: &mut dyn BuildLog,
    ) -> impl Future<Output = RunResult<ExecutionEntity>>;
}
