//! Declared-Interest Diffing
//!
//! The multiplexer accepts the full set of products a consumer surface
//! currently cares about and diffs it against the set of open
//! subscriptions. There is no explicit reference counting: the requested
//! set is always fully known at diff time, so sharing falls out of keying
//! by product rather than by consumer.

use std::collections::HashSet;

use super::price::ProductId;

/// Subscriptions to open and close after an interest change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestChanges {
    /// Products that need a new subscription (`requested − active`).
    pub open: HashSet<ProductId>,
    /// Products whose subscription must be torn down (`active − requested`).
    pub close: HashSet<ProductId>,
}

impl InterestChanges {
    /// Compute the delta between the active and the requested set.
    ///
    /// Supplying the same set twice in a row yields empty changes, so
    /// re-declaring identical interest performs no operations.
    #[must_use]
    pub fn between(active: &HashSet<ProductId>, requested: &HashSet<ProductId>) -> Self {
        Self {
            open: requested.difference(active).cloned().collect(),
            close: active.difference(requested).cloned().collect(),
        }
    }

    /// Check if there are any changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.close.is_empty()
    }
}
