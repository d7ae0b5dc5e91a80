//! Storage capacity accounting for temporary file stores.
//!
//! A [`Capacity`] is the total number of bytes a store may hand out across all of
//! its live buffers. Each buffer holds a [`Reservation`] that grows as the buffer
//! grows and returns its amount to the shared capacity when dropped.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Shared remaining capacity of a temporary file store.
#[derive(Clone)]
pub struct Capacity(Arc<AtomicU64>);

impl Capacity {
    /// Creates a new capacity tracker with the given amount of bytes.
    pub fn new(amount: u64) -> Capacity {
        Capacity(Arc::new(AtomicU64::new(amount)))
    }

    /// Unlimited capacity.
    pub fn unlimited() -> Capacity {
        Capacity::new(u64::MAX)
    }

    /// Returns the remaining amount.
    ///
    /// **Note**: This method is primarily intended for diagnostic purposes. The returned
    /// value may be outdated in a concurrent environment.
    pub fn remaining(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Creates an empty reservation against this capacity.
    pub fn reserve_empty(&self) -> Reservation {
        Reservation {
            capacity: self.clone(),
            amount: 0,
        }
    }

    fn take(&self, amount: u64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                remaining.checked_sub(amount)
            })
            .is_ok()
    }

    fn release(&self, amount: u64) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |remaining| {
                Some(remaining.saturating_add(amount))
            });
    }
}

/// The portion of a [`Capacity`] held by one buffer.
///
/// The held amount is returned to the capacity when the reservation is dropped.
pub struct Reservation {
    capacity: Capacity,
    amount: u64,
}

impl Reservation {
    /// Currently held amount.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Grows the reservation by the given amount.
    pub fn grow(&mut self, additional: u64) -> Result<(), CapacityExceeded> {
        if self.capacity.take(additional) {
            self.amount += additional;
            Ok(())
        } else {
            Err(CapacityExceeded {
                requested: additional,
                remaining: self.capacity.remaining(),
            })
        }
    }

    /// Grows the reservation so that it holds at least `amount`.
    pub fn ensure_at_least(&mut self, amount: u64) -> Result<(), CapacityExceeded> {
        if amount > self.amount {
            self.grow(amount - self.amount)?;
        }
        Ok(())
    }

    /// Shrinks the reservation down to `amount`, releasing the difference.
    pub fn shrink_to(&mut self, amount: u64) {
        if amount < self.amount {
            self.capacity.release(self.amount - amount);
            self.amount = amount;
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.amount != 0 {
            self.capacity.release(self.amount);
        }
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

/// An error that occurs when a store runs out of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapacityExceeded {
    pub requested: u64,
    pub remaining: u64,
}

impl std::fmt::Display for CapacityExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "temporary store capacity exceeded: requested {}, remaining {}",
            self.requested, self.remaining
        )
    }
}

impl std::error::Error for CapacityExceeded {}

impl From<CapacityExceeded> for std::io::Error {
    fn from(e: CapacityExceeded) -> Self {
        std::io::Error::other(e)
    }
}
