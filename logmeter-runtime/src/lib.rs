//! logmeter runtime - Program Execution
//!
//! Runs compiled programs against log lines:
//!
//! ```text
//! program dir ──load──► Vec<Vm> ──► Dispatcher ◄── mpsc<String> ◄── tailer
//!                                       │
//!                                       ▼
//!                                 Arc<MetricStore> ──► export
//! ```
//!
//! Programs are loaded once at startup. The dispatcher owns every VM and
//! feeds each line to all of them in turn on a single task; the store is
//! the only state shared with the outside.

pub mod dispatcher;
pub mod load;
pub mod strptime;
pub mod vm;

pub use dispatcher::Dispatcher;
pub use load::{compile_program, load_programs, LoadError, LoadResult};
pub use strptime::parse_time;
pub use vm::{RuntimeError, RuntimeResult, Vm};
