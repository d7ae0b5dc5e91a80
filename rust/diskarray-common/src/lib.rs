//! Core definitions (error types and validation helpers), relied upon by all diskarray-* crates.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind, StdErrorBoxed};
pub use result::Result;
