//! Mortgage amount shared between the viability calculator and the offer
//! comparison.
//!
//! The viability side publishes the mortgage amount after every successful
//! recompute. The comparison side holds a [`MortgageAmountWatcher`] and picks
//! up each new amount exactly once.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::debug;

use crate::DEFAULT_LOAN_AMOUNT;

/// Single-writer store for the latest mortgage amount.
#[derive(Debug, Clone)]
pub struct SharedMortgageAmount {
    sender: Arc<watch::Sender<Decimal>>,
}

impl SharedMortgageAmount {
    pub fn new(initial: Decimal) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Stores `amount`, notifying watchers only if it differs from the
    /// current value. Returns whether anything changed.
    pub fn publish(
        &self,
        amount: Decimal,
    ) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == amount {
                false
            } else {
                *current = amount;
                true
            }
        });
        if changed {
            debug!(%amount, "published mortgage amount");
        }
        changed
    }

    pub fn current(&self) -> Decimal {
        *self.sender.borrow()
    }

    /// New watcher that has already seen the current amount.
    pub fn watch(&self) -> MortgageAmountWatcher {
        MortgageAmountWatcher {
            receiver: self.sender.subscribe(),
        }
    }

    /// New watcher that still has the current amount to pick up.
    pub fn watch_pending(&self) -> MortgageAmountWatcher {
        let mut receiver = self.sender.subscribe();
        receiver.mark_changed();
        MortgageAmountWatcher { receiver }
    }
}

impl Default for SharedMortgageAmount {
    fn default() -> Self {
        Self::new(DEFAULT_LOAN_AMOUNT)
    }
}

#[derive(Debug, Clone)]
pub struct MortgageAmountWatcher {
    receiver: watch::Receiver<Decimal>,
}

impl MortgageAmountWatcher {
    /// The published amount if it changed since the last call, else `None`.
    pub fn changed_amount(&mut self) -> Option<Decimal> {
        match self.receiver.has_changed() {
            Ok(true) => Some(*self.receiver.borrow_and_update()),
            _ => None,
        }
    }

    /// The unseen published amount, left unseen.
    pub fn pending_amount(&self) -> Option<Decimal> {
        match self.receiver.has_changed() {
            Ok(true) => Some(*self.receiver.borrow()),
            _ => None,
        }
    }

    /// Marks `amount` as handled. A newer amount published in the meantime
    /// stays pending.
    pub fn mark_seen(
        &mut self,
        amount: Decimal,
    ) {
        let latest = *self.receiver.borrow_and_update();
        if latest != amount {
            self.receiver.mark_changed();
        }
    }

    /// Latest amount without marking it seen.
    pub fn current(&self) -> Decimal {
        *self.receiver.borrow()
    }
}
