//! logmeter server - Tailer, Export & Startup Plumbing
//!
//! ```text
//! log files ──poll──► tail_files ──mpsc──► Dispatcher ──► MetricStore
//!                                                             │
//!                                   GET /json, GET /csv ◄─────┘
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod tail;
pub mod telemetry;

pub use config::{Cli, ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use export::{encode_csv, router};
pub use tail::{tail_files, FileTail};
pub use telemetry::init_tracing;
