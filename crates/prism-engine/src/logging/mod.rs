//! Logging utilities.
//!
//! Status lines (initialization, filtering/rotation toggles) and shader
//! diagnostics all go through the `log` facade. This module only owns the
//! one-time backend setup.

mod init;

pub use init::{init_logging, LoggingConfig, SHADER_TARGET};
