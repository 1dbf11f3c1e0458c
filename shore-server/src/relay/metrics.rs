//! 转发计数器
//!
//! 转发没有持久化可供事后排查，结构化计数器是唯一的运行时观测面。

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Relay counters, shared by the hub and the health endpoint
#[derive(Debug, Default)]
pub struct RelayMetrics {
    joins: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    drops: AtomicU64,
}

impl RelayMetrics {
    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    /// One fan-out attempt (regardless of member count)
    pub fn record_broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// One event handed to one member's mailbox
    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// One member unreachable at broadcast time
    pub fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            joins: self.joins.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub joins: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
    pub drops: u64,
}
