//! Spill policies: when to move resident elements to disk, and how many.
//!
//! A policy is consulted before every append with the current resident buffer and the
//! incoming element, and answers with the number of elements to spill from the front
//! of the buffer. The spill (if any) happens before the incoming element is added.

use std::collections::VecDeque;

use crate::record::Record;

/// Decides how many resident elements to spill before each append.
pub trait SpillPolicy<T>: Send {
    /// Returns the number of elements to spill from the front of `resident` before
    /// `incoming` is appended. Zero means no spill.
    fn spill_count(&mut self, resident: &VecDeque<T>, incoming: &T) -> usize;

    /// Called after a prefix of the buffer was spilled, with the elements that remain.
    fn on_spilled(&mut self, resident: &VecDeque<T>);

    /// Called after `element` was appended to the resident buffer.
    fn on_appended(&mut self, element: &T);
}

/// Keeps the total footprint of the resident buffer under a byte budget.
///
/// The running total (`approx_bytes`) is maintained incrementally from each appended
/// element's [`Record::footprint`]. Once it exceeds half the budget, it is periodically
/// recomputed exactly by rescanning the whole buffer. The interval between rescans is
/// `budget / average_footprint / 4` appends, which places the next rescan roughly a
/// quarter of the way toward the expected overflow and keeps the rescan cost
/// amortized.
///
/// When appending an element would push the total over the budget, the entire buffer
/// is spilled. An element whose own footprint exceeds the budget is still accepted
/// into an empty buffer and spilled by the next append.
#[derive(Debug, Clone)]
pub struct FootprintBudget {
    budget: u64,
    approx_bytes: u64,
    recheck_countdown: u64,
}

impl FootprintBudget {
    pub fn new(budget: u64) -> FootprintBudget {
        FootprintBudget {
            budget,
            approx_bytes: 0,
            recheck_countdown: 0,
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Current estimate of the resident buffer footprint.
    pub fn approx_bytes(&self) -> u64 {
        self.approx_bytes
    }

    /// Appends remaining until the next exact recompute, once over half the budget.
    pub fn recheck_countdown(&self) -> u64 {
        self.recheck_countdown
    }

    fn recompute<T: Record>(&mut self, resident: &VecDeque<T>) {
        self.approx_bytes = total_footprint(resident);
        let average = self.approx_bytes / resident.len().max(1) as u64;
        self.recheck_countdown = if average == 0 {
            0
        } else {
            self.budget / average / 4
        };
        log::trace!(
            "Recomputed resident footprint: {} bytes in {} elements, next recheck in {}",
            self.approx_bytes,
            resident.len(),
            self.recheck_countdown
        );
    }
}

impl<T: Record> SpillPolicy<T> for FootprintBudget {
    fn spill_count(&mut self, resident: &VecDeque<T>, incoming: &T) -> usize {
        if self.approx_bytes > self.budget / 2 {
            if self.recheck_countdown == 0 {
                self.recompute(resident);
            } else {
                self.recheck_countdown -= 1;
            }
        }

        let incoming = incoming.footprint() as u64;
        if !resident.is_empty() && self.approx_bytes.saturating_add(incoming) > self.budget {
            self.recheck_countdown = 0;
            resident.len()
        } else {
            0
        }
    }

    fn on_spilled(&mut self, resident: &VecDeque<T>) {
        self.approx_bytes = total_footprint(resident);
        self.recheck_countdown = 0;
    }

    fn on_appended(&mut self, element: &T) {
        self.approx_bytes = self.approx_bytes.saturating_add(element.footprint() as u64);
    }
}

fn total_footprint<T: Record>(elements: &VecDeque<T>) -> u64 {
    elements
        .iter()
        .map(|e| e.footprint() as u64)
        .fold(0u64, u64::saturating_add)
}

/// Keeps at most `max_resident` elements in memory, regardless of their size.
///
/// Appending to a full buffer spills just enough elements from the front to make room.
#[derive(Debug, Clone)]
pub struct ResidentCountLimit {
    max_resident: usize,
}

impl ResidentCountLimit {
    pub fn new(max_resident: usize) -> ResidentCountLimit {
        ResidentCountLimit { max_resident }
    }

    pub fn max_resident(&self) -> usize {
        self.max_resident
    }
}

impl<T> SpillPolicy<T> for ResidentCountLimit {
    fn spill_count(&mut self, resident: &VecDeque<T>, _incoming: &T) -> usize {
        (resident.len() + 1).saturating_sub(self.max_resident)
    }

    fn on_spilled(&mut self, _resident: &VecDeque<T>) {}

    fn on_appended(&mut self, _element: &T) {}
}
