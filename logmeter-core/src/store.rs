//! Process-wide metric store.
//!
//! Every VM holds an `Arc<MetricStore>` handed to it at construction; the
//! export handlers hold another. Each mutation takes the write lock for the
//! duration of one metric update, and each read takes a consistent snapshot,
//! so readers never observe a partially updated metric.

use crate::{Metric, MetricKind, StoreError, StoreResult, Timestamp};
use std::collections::HashMap;
use std::sync::RwLock;

/// Shared mapping from metric name to [`Metric`].
///
/// Metrics are created on first reference and never removed. The first
/// value write of a name decides its kind; tags alone leave it open. Later
/// writers that disagree are logged once per metric and the update is still
/// applied to the existing metric.
#[derive(Debug, Default)]
pub struct MetricStore {
    metrics: RwLock<HashMap<String, Slot>>,
}

#[derive(Debug)]
struct Slot {
    metric: Metric,
    kind_settled: bool,
    conflict_logged: bool,
}

impl MetricStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `by` to the metric's value and stamp its time. Returns the new value.
    pub fn increment(&self, name: &str, kind: MetricKind, by: f64, time: Timestamp) -> StoreResult<f64> {
        self.with_metric(name, Some(kind), time, |metric| {
            metric.value += by;
            metric.time = time;
            metric.value
        })
    }

    /// Overwrite the metric's value and stamp its time.
    pub fn set_value(&self, name: &str, kind: MetricKind, value: f64, time: Timestamp) -> StoreResult<()> {
        self.with_metric(name, Some(kind), time, |metric| {
            metric.value = value;
            metric.time = time;
        })
    }

    /// Attach or overwrite a `key=value` tag. A metric created here keeps
    /// the default kind until its first value write.
    pub fn set_tag(&self, name: &str, key: &str, value: &str, time: Timestamp) -> StoreResult<()> {
        self.with_metric(name, None, time, |metric| {
            metric.tags.insert(key.to_string(), value.to_string());
        })
    }

    /// Clone of a single metric.
    pub fn get(&self, name: &str) -> StoreResult<Metric> {
        let metrics = self.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
        metrics.get(name).map(|slot| slot.metric.clone()).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })
    }

    /// Consistent copy of every metric, sorted by name.
    pub fn snapshot(&self) -> StoreResult<Vec<Metric>> {
        let metrics = self.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut all: Vec<Metric> = metrics.values().map(|slot| slot.metric.clone()).collect();
        drop(metrics);
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    /// Number of metrics in the store.
    pub fn len(&self) -> StoreResult<usize> {
        let metrics = self.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(metrics.len())
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn with_metric<R>(
        &self,
        name: &str,
        kind: Option<MetricKind>,
        time: Timestamp,
        update: impl FnOnce(&mut Metric) -> R,
    ) -> StoreResult<R> {
        let mut metrics = self.metrics.write().map_err(|_| StoreError::LockPoisoned)?;
        let slot = metrics.entry(name.to_string()).or_insert_with(|| Slot {
            metric: Metric::new(name, kind.unwrap_or_default(), time),
            kind_settled: false,
            conflict_logged: false,
        });

        match kind {
            Some(kind) if !slot.kind_settled => {
                slot.metric.kind = kind;
                slot.kind_settled = true;
            }
            Some(kind) if slot.metric.kind != kind && !slot.conflict_logged => {
                slot.conflict_logged = true;
                tracing::warn!(
                    metric = name,
                    kind = %slot.metric.kind,
                    requested_kind = %kind,
                    "Metric kind conflict, keeping first declaration"
                );
            }
            _ => {}
        }
        Ok(update(&mut slot.metric))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use std::thread;

    fn at(secs: i64) -> Timestamp {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
    }

    #[test]
    fn test_increment_creates_at_zero() -> StoreResult<()> {
        let store = MetricStore::new();
        assert!(store.is_empty()?);

        assert_eq!(store.increment("lines", MetricKind::Counter, 1.0, at(10))?, 1.0);
        assert_eq!(store.increment("lines", MetricKind::Counter, 1.0, at(20))?, 2.0);

        let metric = store.get("lines")?;
        assert_eq!(metric.value, 2.0);
        assert_eq!(metric.time, at(20));
        assert_eq!(metric.kind, MetricKind::Counter);
        Ok(())
    }

    #[test]
    fn test_first_writer_kind_is_authoritative() -> StoreResult<()> {
        let store = MetricStore::new();
        store.increment("shared", MetricKind::Counter, 3.0, at(1))?;
        store.set_value("shared", MetricKind::Gauge, 7.0, at(2))?;

        let metric = store.get("shared")?;
        assert_eq!(metric.kind, MetricKind::Counter);
        assert_eq!(metric.value, 7.0);
        Ok(())
    }

    #[test]
    fn test_tag_does_not_settle_kind() -> StoreResult<()> {
        let store = MetricStore::new();
        store.set_tag("shared", "source", "a", at(1))?;
        assert_eq!(store.get("shared")?.kind, MetricKind::Counter);

        store.set_value("shared", MetricKind::Gauge, 7.0, at(2))?;
        store.increment("shared", MetricKind::Counter, 1.0, at(3))?;

        let metric = store.get("shared")?;
        assert_eq!(metric.kind, MetricKind::Gauge);
        assert_eq!(metric.value, 8.0);
        assert_eq!(metric.tags["source"], "a");
        Ok(())
    }

    #[test]
    fn test_kind_conflict_flagged_once() -> StoreResult<()> {
        let store = MetricStore::new();
        store.increment("shared", MetricKind::Counter, 1.0, at(1))?;
        {
            let metrics = store.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
            assert!(!metrics["shared"].conflict_logged);
        }

        for i in 0..3 {
            store.set_value("shared", MetricKind::Gauge, 5.0, at(2 + i))?;
            let metrics = store.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
            assert!(metrics["shared"].conflict_logged);
        }
        assert_eq!(store.get("shared")?.kind, MetricKind::Counter);

        store.increment("other", MetricKind::Counter, 1.0, at(1))?;
        let metrics = store.metrics.read().map_err(|_| StoreError::LockPoisoned)?;
        assert!(!metrics["other"].conflict_logged);
        Ok(())
    }

    #[test]
    fn test_tags_overwrite() -> StoreResult<()> {
        let store = MetricStore::new();
        store.set_tag("requests", "host", "a", at(1))?;
        store.set_tag("requests", "host", "b", at(1))?;

        let metric = store.get("requests")?;
        assert_eq!(metric.tags.len(), 1);
        assert_eq!(metric.tags["host"], "b");
        assert_eq!(metric.value, 0.0);
        Ok(())
    }

    #[test]
    fn test_get_missing() {
        let store = MetricStore::new();
        assert_eq!(
            store.get("nope"),
            Err(StoreError::NotFound {
                name: "nope".to_string()
            })
        );
    }

    #[test]
    fn test_snapshot_sorted_by_name() -> StoreResult<()> {
        let store = MetricStore::new();
        store.increment("zeta", MetricKind::Counter, 1.0, at(1))?;
        store.increment("alpha", MetricKind::Counter, 1.0, at(1))?;
        store.set_value("mid", MetricKind::Gauge, 4.0, at(5))?;

        let names: Vec<String> = store.snapshot()?.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        Ok(())
    }

    #[test]
    fn test_concurrent_readers_see_whole_updates() -> StoreResult<()> {
        let store = Arc::new(MetricStore::new());
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || -> StoreResult<()> {
                for i in 0..1000 {
                    store.increment("hits", MetricKind::Counter, 1.0, at(i))?;
                }
                Ok(())
            })
        };

        let mut last = 0.0;
        for _ in 0..100 {
            for metric in store.snapshot()? {
                assert!(metric.value >= last);
                assert_eq!(metric.value.fract(), 0.0);
                last = metric.value;
            }
        }

        writer.join().map_err(|_| StoreError::LockPoisoned)??;
        assert_eq!(store.get("hits")?.value, 1000.0);
        Ok(())
    }
}
