//! CLI command handlers. Each command is in its own file.

mod doctor;
mod get;
mod presets;
mod serve;

pub use doctor::run_doctor;
pub use get::{run_get, GetOptions};
pub use presets::run_presets;
pub use serve::{run_serve, ServeOptions};
