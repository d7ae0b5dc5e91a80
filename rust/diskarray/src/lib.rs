//! An out-of-core growable sequence.
//!
//! [`DiskArray`] behaves like an append-only in-memory vector, but once the resident
//! elements exceed a memory limit, the oldest ones are spilled to a pair of temporary
//! files. Reads by position keep working across the memory/disk boundary: resident
//! elements are returned by reference and spilled ones are reconstructed from disk.
//!
//! **NOTE**: This crate is a spillover buffer for the lifetime of one process. It does
//! not provide deletion, compaction, concurrent writers, durability or recovery of the
//! spilled files after a crash.
//!
//! # Core Concepts
//!
//! ## Records
//!
//! Element types implement [`Record`]: they serialize themselves to a byte sink,
//! deserialize from exactly those bytes, and report an approximate in-memory
//! footprint. Adapters are provided for protobuf messages ([`ProtoRecord`]) and for
//! `bincode` values ([`BincodeRecord`]). `Vec<u8>` and `String` are records as is.
//!
//! ## On-Disk Layout
//!
//! Each array owns two files allocated from a [`TemporaryFileStore`]:
//!
//! - **Data file**: the serialized records concatenated in append order, with no
//!   header, footer or inline framing.
//! - **Index file**: a flat array of native-endian `u64` data file offsets, holding
//!   the start of every spilled record followed by one end sentinel. See
//!   [`offset_index`] for the exact framing.
//!
//! Record `k` is read by fetching index entries `k` and `k + 1` and then exactly that
//! byte range of the data file, without scanning.
//!
//! ## Spill Policies
//!
//! A [`SpillPolicy`] decides before each append how many elements to spill from the
//! front of the resident buffer:
//!
//! - **[`FootprintBudget`]**: keeps the summed footprint under a byte budget, spilling
//!   the whole buffer when the next element would cross it. The running total is
//!   periodically rechecked against an exact rescan, on an amortized schedule.
//! - **[`ResidentCountLimit`]**: keeps a fixed maximum number of resident elements.
//!
//! Both are selected through [`DiskArrayOptions`] with a [`MemoryLimit`].
//!
//! ## Element Handles
//!
//! [`DiskArray::get`] returns an [`ElementRef`], which is either borrowed from the
//! resident buffer or owns a freshly deserialized element.
//!
//! # Example
//!
//! ```
//! use diskarray::{DiskArray, DiskArrayOptions};
//! use diskarray_io_impl::temp_file_store;
//!
//! let store = temp_file_store::create_in_memory(1 << 20).unwrap();
//! let options = DiskArrayOptions::new().with_max_resident(2);
//! let mut array = DiskArray::new(store.as_ref(), options).unwrap();
//! for word in ["alpha", "beta", "gamma"] {
//!     array.push(word.to_string()).unwrap();
//! }
//! assert_eq!(array.spilled_len(), 1);
//! assert!(array.get(0).unwrap().is_owned());
//! assert_eq!(*array.get(2).unwrap(), "gamma");
//! ```

mod disk_array;
pub mod handle;
pub mod offset_index;
pub mod options;
pub mod policy;
pub mod record;
mod spill_store;

pub use diskarray_common::{Error, ErrorKind, Result};
pub use diskarray_io::TemporaryFileStore;
pub use disk_array::{DiskArray, Iter, SpillStats};
pub use handle::ElementRef;
pub use options::{DEFAULT_MEMORY_BUDGET, DiskArrayOptions, MemoryLimit};
pub use policy::{FootprintBudget, ResidentCountLimit, SpillPolicy};
pub use record::{BincodeRecord, ProtoRecord, Record};
