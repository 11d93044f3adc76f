use std::collections::HashMap;

pub type EnvMap = HashMap<String, String>;

mod loader;
mod placeholders;

pub use loader::{load_vars_file, parse_assignment};
pub use placeholders::{expand_macros, resolve_value, SubstitutionContext};
