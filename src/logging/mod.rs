//! Logging system for packetview
//!
//! The terminal belongs to the viewer, so logs go to a timestamped file
//! under `~/.packetview/logs`. Old files are pruned at startup.

mod file_writer;
mod retention;

pub use file_writer::{init_file_logging, LogFileInfo, LoggingGuard};
pub use retention::cleanup_old_logs;

/// File name prefix shared by log creation and retention
pub(crate) const LOG_FILE_PREFIX: &str = "packetview-";
