//! FreeSpace table language server
//!
//! LSP server for `.tbl` / `.tbm` files, providing:
//! - Diagnostics (syntax errors, schema violations, deprecations)
//! - Hover information for matched labels

mod config;
mod convert;
mod server;
mod session;

pub use config::{LoadConfigError, UserConfig, config_path, load_config};
pub use server::{FsoTableServer, run};
pub use session::{AnalysisStatus, DiagnosticSink, Document, Registry, Ticket, run_analysis};
