//! Live Price Service
//!
//! The subscription multiplexer. Given the full set of products consumers
//! currently care about, it owns the set of open streaming subscriptions,
//! diffs requested against active on every change, opens subscriptions for
//! additions and closes them for removals — one subscription per product
//! regardless of how many surfaces request it.
//!
//! # Per-product lifecycle
//!
//! ```text
//! Unwanted ──interest declared──▶ Priming ──first fetch/frame──▶ Streaming
//!     ▲                                                              │
//!     └───────────── close completes ◀── Closing ◀── interest withdrawn
//! ```
//!
//! `Unwanted` is represented by absence from the active map. A transport
//! or stream error never drives a transition: the subscription simply stops
//! producing frames and the entry keeps its last known value.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{PriceApi, StreamConnector, SubscriptionHandle};
use crate::domain::interest::InterestChanges;
use crate::domain::price::{PriceSnapshot, PriceStore, PriceStoreEntry, ProductId};
use crate::infrastructure::metrics::{
    ApiResult, record_fetch_result, record_recompute_result, set_open_subscriptions,
};

// =============================================================================
// Sync Phase
// =============================================================================

/// Lifecycle phase of one product's synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Interest declared; snapshot fetch and stream both in flight, no
    /// value observed yet.
    Priming,
    /// At least one value has landed from either source.
    Streaming,
    /// Interest withdrawn; subscription close issued.
    Closing,
}

/// Shared, lock-protected phase cell.
///
/// The priming fetch task and the stream task race to flip
/// `Priming → Streaming`; whichever source lands first wins and the other
/// transition is a no-op.
#[derive(Debug)]
pub struct PhaseCell(Mutex<SyncPhase>);

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseCell {
    /// Create a cell in `Priming`.
    #[must_use]
    pub fn new() -> Self {
        Self(Mutex::new(SyncPhase::Priming))
    }

    /// Current phase.
    #[must_use]
    pub fn get(&self) -> SyncPhase {
        *self.0.lock()
    }

    /// Advance `Priming → Streaming`; any other state is left alone.
    pub fn mark_streaming(&self) {
        let mut phase = self.0.lock();
        if *phase == SyncPhase::Priming {
            *phase = SyncPhase::Streaming;
        }
    }

    fn mark_closing(&self) {
        *self.0.lock() = SyncPhase::Closing;
    }
}

// =============================================================================
// Frame Sink
// =============================================================================

/// The only path stream frames take into the store.
///
/// Connectors hand every validated frame here; the sink applies the shared
/// merge rule and advances the product's phase on first delivery. Updates
/// for evicted products are discarded silently.
#[derive(Clone)]
pub struct FrameSink {
    store: Arc<PriceStore>,
    phase: Arc<PhaseCell>,
}

impl FrameSink {
    /// Create a sink feeding `store` and advancing `phase`.
    #[must_use]
    pub fn new(store: Arc<PriceStore>, phase: Arc<PhaseCell>) -> Self {
        Self { store, phase }
    }

    /// Apply a snapshot converted from a stream frame.
    ///
    /// Returns whether the update was applied (false once the entry has
    /// been evicted).
    pub fn deliver(&self, snapshot: PriceSnapshot) -> bool {
        let applied = self.store.apply_update(snapshot);
        if applied {
            self.phase.mark_streaming();
        }
        applied
    }
}

// =============================================================================
// Live Price Service
// =============================================================================

struct ActiveSubscription {
    handle: SubscriptionHandle,
    phase: Arc<PhaseCell>,
}

/// Multiplexes price synchronization across a changing set of products.
///
/// Keyed by product, not by consumer: callers recompute their full
/// requested set on every change and hand it to
/// [`set_interest`](Self::set_interest); sharing and teardown fall out of
/// the diff. Reads go through the [`PriceStore`], reactively via its
/// broadcast channel or on demand through the accessors here.
pub struct LivePriceService {
    api: Arc<dyn PriceApi>,
    connector: Arc<dyn StreamConnector>,
    store: Arc<PriceStore>,
    margin_percent: f64,
    active: Mutex<HashMap<ProductId, ActiveSubscription>>,
}

impl LivePriceService {
    /// Create a service over the given transports and store.
    #[must_use]
    pub fn new(
        api: Arc<dyn PriceApi>,
        connector: Arc<dyn StreamConnector>,
        store: Arc<PriceStore>,
        margin_percent: f64,
    ) -> Self {
        Self {
            api,
            connector,
            store,
            margin_percent,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store, for reactive update subscriptions.
    #[must_use]
    pub fn store(&self) -> &Arc<PriceStore> {
        &self.store
    }

    /// Declare the full set of products currently of interest.
    ///
    /// Opens one subscription and issues one priming fetch per added
    /// product; closes the subscription and evicts the entry per removed
    /// product. Identical consecutive sets perform no operations. Returns
    /// the computed changes.
    ///
    /// Must be called from within a Tokio runtime (priming fetches and
    /// stream tasks are spawned).
    pub fn set_interest(&self, requested: &HashSet<ProductId>) -> InterestChanges {
        let mut active = self.active.lock();
        let active_ids: HashSet<ProductId> = active.keys().cloned().collect();
        let changes = InterestChanges::between(&active_ids, requested);

        for product_id in &changes.close {
            if let Some(sub) = active.remove(product_id) {
                sub.phase.mark_closing();
                sub.handle.close();
                self.store.remove(product_id);
                tracing::debug!(product_id = %product_id, "subscription closed");
            }
        }

        for product_id in &changes.open {
            self.store.ensure(product_id);
            let phase = Arc::new(PhaseCell::new());
            let sink = FrameSink::new(Arc::clone(&self.store), Arc::clone(&phase));
            let handle = self.connector.open(product_id, sink);
            active.insert(
                product_id.clone(),
                ActiveSubscription {
                    handle,
                    phase: Arc::clone(&phase),
                },
            );
            self.spawn_priming_fetch(product_id.clone(), phase);
            tracing::debug!(product_id = %product_id, "subscription opened");
        }

        #[allow(clippy::cast_precision_loss)]
        set_open_subscriptions(active.len() as f64);

        changes
    }

    fn spawn_priming_fetch(&self, product_id: ProductId, phase: Arc<PhaseCell>) {
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match api.fetch_snapshot(&product_id).await {
                Ok(snapshot) => {
                    record_fetch_result(ApiResult::Ok);
                    if store.seed(snapshot) {
                        phase.mark_streaming();
                    }
                }
                Err(e) => {
                    // Entry keeps whatever it had; a later frame can still seed it
                    record_fetch_result(ApiResult::Error);
                    tracing::warn!(product_id = %product_id, error = %e, "snapshot fetch failed");
                }
            }
        });
    }

    /// Manually recompute one product's price.
    ///
    /// No-op returning `false` when a recompute for this product is already
    /// in flight or the product is not tracked. The `recomputing` flag is
    /// cleared on every exit path; on failure the previous snapshot is left
    /// untouched.
    pub async fn recompute(&self, product_id: &ProductId) -> bool {
        let Some(guard) = self.store.begin_recompute(product_id) else {
            tracing::debug!(product_id = %product_id, "recompute skipped (in flight or untracked)");
            return false;
        };

        match self.api.recompute(product_id, self.margin_percent).await {
            Ok(snapshot) => {
                record_recompute_result(ApiResult::Ok);
                self.store.seed(snapshot);
            }
            Err(e) => {
                record_recompute_result(ApiResult::Error);
                tracing::warn!(product_id = %product_id, error = %e, "recompute failed");
            }
        }

        drop(guard);
        true
    }

    /// Fire-and-forget variant of [`recompute`](Self::recompute).
    pub fn trigger_recompute(self: &Arc<Self>, product_id: ProductId) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.recompute(&product_id).await;
        });
    }

    /// Current display price in rupees for one product.
    #[must_use]
    pub fn price(&self, product_id: &ProductId) -> Option<Decimal> {
        self.store.display_rupees(product_id)
    }

    /// Current store entry for one product.
    #[must_use]
    pub fn entry(&self, product_id: &ProductId) -> Option<PriceStoreEntry> {
        self.store.entry(product_id)
    }

    /// Mapping of every tracked product with a known price to rupees.
    #[must_use]
    pub fn prices(&self) -> HashMap<ProductId, Decimal> {
        self.store.rupees_map()
    }

    /// Lifecycle phase for one product, `None` when unwanted.
    #[must_use]
    pub fn phase(&self, product_id: &ProductId) -> Option<SyncPhase> {
        self.active.lock().get(product_id).map(|s| s.phase.get())
    }

    /// Products with an open subscription.
    #[must_use]
    pub fn active_products(&self) -> HashSet<ProductId> {
        self.active.lock().keys().cloned().collect()
    }

    /// Close every subscription and evict all entries.
    pub fn shutdown(&self) {
        let _ = self.set_interest(&HashSet::new());
    }
}

// =============================================================================
// Tests
// =============================================================================
