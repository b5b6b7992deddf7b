//! CLI command implementations.

mod collect;
mod config;
mod doctor;
mod extract;
mod list;
mod mcp;
mod stats;

pub use collect::{run_collect, CollectMode};
pub use config::run_config;
pub use doctor::run_doctor;
pub use extract::{run_extract, run_process};
pub use list::{run_details, run_list};
pub use mcp::run_mcp;
pub use stats::run_stats;
