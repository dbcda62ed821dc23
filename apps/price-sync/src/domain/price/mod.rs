//! Price Domain Types and Store
//!
//! Holds the latest known price snapshot per product and merges snapshot
//! fetches with streaming updates into one coherent value.
//!
//! # Reconciliation
//!
//! Neither the REST response nor a stream frame carries a version or a
//! server timestamp, so the merge rule is last-write-wins in the order
//! updates arrive at this process. A slow fetch response can overwrite a
//! newer frame and vice versa; that is the stated policy, not a bug to fix
//! here. Every applied update replaces the whole snapshot atomically.
//!
//! Entries are created lazily on first interest and evicted immediately
//! when interest is withdrawn; a later re-subscription re-seeds via fetch.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// =============================================================================
// Product Id
// =============================================================================

/// Opaque, stable identifier for a priced catalog product.
///
/// Equality is exact string match; the same key is used across the REST
/// fetch and the streaming subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Price Snapshot
// =============================================================================

/// A complete price observation for one product.
///
/// Prices are carried as integer minor units (paise) to avoid floating
/// point drift; conversion to major units happens only at the presentation
/// boundary via [`PriceSnapshot::display_rupees`]. `observed_at` is the
/// local arrival time — the transport guarantees no timestamp of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    /// Product this snapshot belongs to.
    pub product_id: ProductId,
    /// Display price in paise (minor units), never negative.
    pub display_paise: i64,
    /// When this process observed the value.
    pub observed_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Create a snapshot observed now.
    #[must_use]
    pub fn new(product_id: ProductId, display_paise: i64) -> Self {
        Self {
            product_id,
            display_paise,
            observed_at: Utc::now(),
        }
    }

    /// The display price in rupees (major units).
    #[must_use]
    pub fn display_rupees(&self) -> Decimal {
        Decimal::new(self.display_paise, 2)
    }
}

// =============================================================================
// Store Entry
// =============================================================================

/// Per-product state owned exclusively by the [`PriceStore`].
#[derive(Debug, Clone, Default)]
pub struct PriceStoreEntry {
    /// Latest known snapshot, absent until first seed or stream update.
    pub snapshot: Option<PriceSnapshot>,
    /// True only while a manual recompute for this product is in flight.
    pub recomputing: bool,
}

/// Broadcast event published whenever an entry's snapshot changes.
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    /// Product whose price changed.
    pub product_id: ProductId,
    /// New display price in paise.
    pub display_paise: i64,
}

// =============================================================================
// Price Store
// =============================================================================

/// Default capacity of the price update broadcast channel.
const DEFAULT_UPDATES_CAPACITY: usize = 1024;

/// Authoritative registry of per-product price state.
///
/// All mutation goes through [`seed`](Self::seed),
/// [`apply_update`](Self::apply_update), [`begin_recompute`](Self::begin_recompute),
/// [`ensure`](Self::ensure) and [`remove`](Self::remove); collaborators never
/// touch entries directly. Updates fan out reactively over a broadcast
/// channel obtained from [`subscribe_updates`](Self::subscribe_updates).
pub struct PriceStore {
    entries: RwLock<HashMap<ProductId, PriceStoreEntry>>,
    updates_tx: broadcast::Sender<PriceUpdate>,
}

impl Default for PriceStore {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATES_CAPACITY)
    }
}

impl PriceStore {
    /// Create a store with the given broadcast capacity.
    #[must_use]
    pub fn new(updates_capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            updates_tx: broadcast::channel(updates_capacity).0,
        }
    }

    /// Create an empty entry for a product if none exists yet.
    ///
    /// Called when interest in a product is first declared; the snapshot
    /// stays absent until a fetch or stream update lands.
    pub fn ensure(&self, product_id: &ProductId) {
        self.entries
            .write()
            .entry(product_id.clone())
            .or_default();
    }

    /// Evict a product's entry. Returns whether an entry existed.
    ///
    /// Eviction is immediate; re-subscription re-seeds via fetch.
    pub fn remove(&self, product_id: &ProductId) -> bool {
        self.entries.write().remove(product_id).is_some()
    }

    /// Install a snapshot obtained from a fetch or recompute.
    ///
    /// A completed fetch is always trusted as current: the snapshot replaces
    /// whatever is stored (last-write-wins). Returns `false` without side
    /// effects when the entry no longer exists — a late result for a product
    /// nobody watches anymore is silently discarded, never an error.
    pub fn seed(&self, snapshot: PriceSnapshot) -> bool {
        self.install(snapshot)
    }

    /// Install a snapshot converted from a stream frame.
    ///
    /// Same merge rule as [`seed`](Self::seed); the two sources are
    /// deliberately indistinguishable once a value is applied.
    pub fn apply_update(&self, snapshot: PriceSnapshot) -> bool {
        self.install(snapshot)
    }

    fn install(&self, snapshot: PriceSnapshot) -> bool {
        let update = PriceUpdate {
            product_id: snapshot.product_id.clone(),
            display_paise: snapshot.display_paise,
        };

        {
            let mut entries = self.entries.write();
            let Some(entry) = entries.get_mut(&snapshot.product_id) else {
                tracing::debug!(product_id = %snapshot.product_id, "discarding update for evicted product");
                return false;
            };
            entry.snapshot = Some(snapshot);
        }

        // No receivers is fine; send only fails then.
        let _ = self.updates_tx.send(update);
        true
    }

    /// Mark a product as recomputing, returning a guard that clears the
    /// flag when dropped.
    ///
    /// Returns `None` when the entry is absent or a recompute is already in
    /// flight, enforcing at most one concurrent recompute per product. The
    /// guard clears the flag on every exit path, so it can never stay stuck
    /// true past the recompute call that set it.
    #[must_use]
    pub fn begin_recompute(&self, product_id: &ProductId) -> Option<RecomputeGuard<'_>> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(product_id)?;
        if entry.recomputing {
            return None;
        }
        entry.recomputing = true;
        Some(RecomputeGuard {
            store: self,
            product_id: product_id.clone(),
        })
    }

    /// Read a product's entry, if it exists.
    #[must_use]
    pub fn entry(&self, product_id: &ProductId) -> Option<PriceStoreEntry> {
        self.entries.read().get(product_id).cloned()
    }

    /// Current display price in rupees, if known.
    #[must_use]
    pub fn display_rupees(&self, product_id: &ProductId) -> Option<Decimal> {
        self.entries
            .read()
            .get(product_id)
            .and_then(|e| e.snapshot.as_ref())
            .map(PriceSnapshot::display_rupees)
    }

    /// Mapping of every product with a known price to its rupee value.
    #[must_use]
    pub fn rupees_map(&self) -> HashMap<ProductId, Decimal> {
        self.entries
            .read()
            .iter()
            .filter_map(|(id, entry)| {
                entry
                    .snapshot
                    .as_ref()
                    .map(|s| (id.clone(), s.display_rupees()))
            })
            .collect()
    }

    /// Number of tracked products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no products are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Get a new receiver for price updates.
    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<PriceUpdate> {
        self.updates_tx.subscribe()
    }

    fn end_recompute(&self, product_id: &ProductId) {
        if let Some(entry) = self.entries.write().get_mut(product_id) {
            entry.recomputing = false;
        }
    }
}

/// RAII guard holding a product's `recomputing` flag high.
///
/// Dropping the guard clears the flag, whether the recompute succeeded,
/// failed, or the owning task unwound.
pub struct RecomputeGuard<'a> {
    store: &'a PriceStore,
    product_id: ProductId,
}

impl RecomputeGuard<'_> {
    /// The product this guard covers.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }
}

impl Drop for RecomputeGuard<'_> {
    fn drop(&mut self) {
        self.store.end_recompute(&self.product_id);
    }
}

// =============================================================================
// Tests
// =============================================================================
