//! CLI command implementations

pub mod decode;
pub mod run;
pub mod tools;

pub use decode::decode_command;
pub use run::{run_command, RunArgs};
pub use tools::tools_command;
