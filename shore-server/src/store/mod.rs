//! JSON-snapshot storage layer for order records
//!
//! # Layout
//!
//! One append-only collection of [`Order`] records, held in a `DashMap`
//! keyed by order id and mirrored to `orders.json` as a whole snapshot
//! after every mutation. A missing or empty backing file initializes to an
//! empty collection instead of failing.
//!
//! # Concurrency
//!
//! - Read-modify-write of a single order's status happens under that key's
//!   entry lock, so concurrent status updates on the same order serialize.
//! - Updates to different orders never contend on the same lock.
//! - The snapshot file has its own write lock; writes go through a temp
//!   file + rename so readers always see a complete snapshot.
//!
//! # Durability
//!
//! Persistence failures surface as [`StoreError::Io`] on the request that
//! triggered them; the in-memory table and the relay keep running.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;

use shared::order::{InvalidTransition, Order, OrderId, OrderStatus};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 快照文件句柄：路径 + 写锁
#[derive(Debug)]
struct SnapshotFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

/// Order store backed by a JSON snapshot file
#[derive(Clone)]
pub struct OrderStore {
    orders: Arc<DashMap<OrderId, Order>>,
    backing: Option<Arc<SnapshotFile>>,
}

impl OrderStore {
    /// Open the store at the given snapshot path.
    ///
    /// A missing or blank file starts an empty collection; a present file
    /// is parsed as the whole order collection.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let orders: DashMap<OrderId, Order> = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => {}
            Ok(text) => {
                let records: Vec<Order> = serde_json::from_str(&text)?;
                for order in records {
                    orders.insert(order.id.clone(), order);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(path = %path.display(), orders = orders.len(), "Order store opened");

        Ok(Self {
            orders: Arc::new(orders),
            backing: Some(Arc::new(SnapshotFile {
                path,
                write_lock: Mutex::new(()),
            })),
        })
    }

    /// Open a store with no backing file (tests, ephemeral deployments)
    pub fn open_in_memory() -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            backing: None,
        }
    }

    // ========== Order Operations ==========

    /// Insert a freshly created order and persist the snapshot
    pub fn insert(&self, order: Order) -> StoreResult<Order> {
        self.orders.insert(order.id.clone(), order.clone());
        self.persist()?;
        Ok(order)
    }

    /// Fetch one order by id
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.get(id).map(|entry| entry.clone())
    }

    /// All orders, most-recent-last by creation time
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|e| e.value().clone()).collect();
        orders.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        orders
    }

    /// The most recently created order, if any
    pub fn latest(&self) -> Option<Order> {
        self.list().pop()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Apply a status transition atomically and persist.
    ///
    /// The state machine runs while the entry lock is held, so two racing
    /// updates on one order can never both observe the old status. Rejected
    /// transitions leave the record and the snapshot untouched.
    pub fn update_status(&self, id: &OrderId, requested: OrderStatus) -> StoreResult<Order> {
        let updated = {
            let mut entry = self
                .orders
                .get_mut(id)
                .ok_or_else(|| StoreError::OrderNotFound(id.clone()))?;
            entry.status = entry.status.advance_to(requested)?;
            entry.clone()
        };
        self.persist()?;
        Ok(updated)
    }

    // ========== Persistence ==========

    /// Write the whole collection as one snapshot.
    ///
    /// Temp file + rename keeps the snapshot readable as a whole at every
    /// point in time, even across a crash mid-write. Serialization happens
    /// under the write lock so snapshot age matches rename order and a
    /// newer snapshot can never be overwritten by an older one.
    fn persist(&self) -> StoreResult<()> {
        let Some(backing) = &self.backing else {
            return Ok(());
        };

        let _guard = backing.write_lock.lock();
        let data = serde_json::to_vec_pretty(&self.list())?;
        let tmp = backing.path.with_extension("json.tmp");
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, &backing.path)?;
        Ok(())
    }
}
