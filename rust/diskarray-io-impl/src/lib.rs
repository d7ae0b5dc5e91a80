//! Common implementations of the `diskarray-io` abstractions.

pub mod capacity;
mod names;
pub mod temp_file_store;
