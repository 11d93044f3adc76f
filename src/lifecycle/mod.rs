mod cancel;
mod controller;
mod log;

pub use cancel::CancelToken;
pub use controller::{LifecycleController, RunOutcome, DEFAULT_POLL_INTERVAL};
#[cfg(feature = "cli")]
pub use log::ConsoleLog;
pub use log::{BuildLog, MemoryLog, WriterLog};
