//! qdynn Core Types
//!
//! Shared value types and the upstream descriptor parser used by the
//! packet relay. No I/O and no async; everything here is testable in
//! isolation.

mod error;
mod upstream;

pub use error::*;
pub use upstream::*;
