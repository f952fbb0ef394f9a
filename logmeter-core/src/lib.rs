//! logmeter Core - Metric Types and Shared Store
//!
//! Data structures shared by every other crate in the workspace: the
//! [`Metric`] record updated by program builtins, and the [`MetricStore`]
//! that owns every metric for the lifetime of the process.
//!
//! ```text
//! VM builtins ──write──▶ MetricStore ◀──snapshot── export handlers
//! ```

use chrono::{DateTime, Utc};

pub mod error;
pub mod metric;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use metric::{Metric, MetricKind};
pub use store::MetricStore;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
