mod environment;
mod loader;
mod settings;

pub use environment::{RunInputs, RunInputsBuilder};
pub use loader::{load_config, LoadedConfig, ProfileConfig, RunnerConfig, CONFIG_FILE_NAME};
pub use settings::{ResolvedConfig, StepSettings};
