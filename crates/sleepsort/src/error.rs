//! Failure taxonomy for a streamed sort.
//!
//! Sleeping and signaling cannot fail on their own, so the only failures are
//! terminal classifications attached to the last [`crate::StreamedResult`] of
//! a sequence:
//!
//! - `SortFailed`: every configured round finished without two consecutive
//!   rounds agreeing.
//! - `Cancelled`: an interrupt or caller stop arrived while rounds were still
//!   in flight. Takes priority over `SortFailed`.

/// A result type carrying a sort [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Terminal failure of a streamed sort.
#[derive(Clone, Copy, thiserror::Error, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// All rounds were exhausted without convergence.
    #[error("sort failed")]
    SortFailed,

    /// The sort was interrupted before it could converge.
    #[error("cancelled")]
    Cancelled,
}
