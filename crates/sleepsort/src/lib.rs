#![doc = include_str!("../README.md")]

mod cancellation;
mod concurrent;
mod error;
mod result;
mod sequential;
mod simple;
mod sleepsort;
mod stream;

pub use crate::cancellation::*;
pub use crate::concurrent::*;
pub use crate::error::*;
pub use crate::result::*;
pub use crate::sequential::*;
pub use crate::simple::*;
pub use crate::sleepsort::*;
pub use crate::stream::*;

/// A single sortable value.
///
/// Each value is slept on for `value * multiplier` time units, so the type is
/// unsigned by construction.
pub type Item = u64;
