//! Construction options of a [`DiskArray`](crate::DiskArray).

use diskarray_common::{Result, verify_arg};

use crate::{
    policy::{FootprintBudget, ResidentCountLimit, SpillPolicy},
    record::Record,
};

/// Default resident footprint budget, in bytes.
pub const DEFAULT_MEMORY_BUDGET: u64 = 20_000_000;

/// The bound on the resident buffer that triggers spilling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLimit {
    /// Keep the summed [`Record::footprint`] of resident elements under this many bytes.
    Bytes(u64),
    /// Keep at most this many elements resident.
    Elements(usize),
}

impl Default for MemoryLimit {
    fn default() -> Self {
        MemoryLimit::Bytes(DEFAULT_MEMORY_BUDGET)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiskArrayOptions {
    pub memory_limit: MemoryLimit,
    /// Number of elements to reserve room for in the resident buffer up front.
    pub capacity_hint: usize,
}

impl DiskArrayOptions {
    pub fn new() -> DiskArrayOptions {
        Default::default()
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_limit = MemoryLimit::Bytes(bytes);
        self
    }

    pub fn with_max_resident(mut self, elements: usize) -> Self {
        self.memory_limit = MemoryLimit::Elements(elements);
        self
    }

    pub fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.memory_limit {
            MemoryLimit::Bytes(bytes) => verify_arg!(memory_limit, bytes > 0),
            MemoryLimit::Elements(elements) => verify_arg!(memory_limit, elements > 0),
        }
        Ok(())
    }

    pub(crate) fn make_policy<T: Record>(&self) -> Box<dyn SpillPolicy<T>> {
        match self.memory_limit {
            MemoryLimit::Bytes(bytes) => Box::new(FootprintBudget::new(bytes)),
            MemoryLimit::Elements(elements) => Box::new(ResidentCountLimit::new(elements)),
        }
    }
}
