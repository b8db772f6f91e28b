// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::mesh::MeshClient;
use crate::store::Store;

/// Shared state behind the request router. Written once before the listeners
/// start; only the store's interior is mutated afterward.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub mesh: Arc<dyn MeshClient>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: Store, mesh: Arc<dyn MeshClient>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            mesh,
            metrics: Arc::new(Metrics::default()),
        }
    }
}

/// Request counters published at `/debug/varz`.
#[derive(Default)]
pub struct Metrics {
    pub gets: AtomicU64,
    pub puts: AtomicU64,
    pub activates: AtomicU64,
    pub deletes: AtomicU64,
    pub errors: AtomicU64,
}

/// Point-in-time view of the counters plus store gauges.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub gets: u64,
    pub puts: u64,
    pub activates: u64,
    pub deletes: u64,
    pub errors: u64,
    pub secret_count: usize,
    pub version_count: usize,
}

impl Metrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, secret_count: usize, version_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            activates: self.activates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            secret_count,
            version_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = Metrics::default();
        Metrics::incr(&metrics.gets);
        Metrics::incr(&metrics.gets);
        Metrics::incr(&metrics.errors);

        let snap = metrics.snapshot(3, 7);
        assert_eq!(snap.gets, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.puts, 0);
        assert_eq!(snap.secret_count, 3);
        assert_eq!(snap.version_count, 7);
    }
}
