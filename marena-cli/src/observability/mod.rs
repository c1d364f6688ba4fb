//! Logging setup for the marena CLI.
//!
//! Logging format is controlled via `MARENA_LOG_FORMAT`:
//! - `json` - Structured JSON output
//! - `pretty` - Human-readable multi-line output
//! - `compact` - Compact single-line format (default)
//!
//! The filter comes from `MARENA_LOG_LEVEL`, then `RUST_LOG`, then the
//! `-v` count on the command line.
//!
//! # Example
//!
//! ```ignore
//! let _guard = init_tracing(TracingConfig::from_env(cli.verbose))?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig};
pub use tracing_setup::{TracingGuard, init_tracing};
