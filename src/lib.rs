pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod lifecycle;
pub mod validation;

pub use client::{ExecutionApi, JaasClient};
pub use config::{ResolvedConfig, StepSettings};
pub use error::{RunError, RunResult};
pub use lifecycle::{BuildLog, CancelToken, LifecycleController, RunOutcome};
