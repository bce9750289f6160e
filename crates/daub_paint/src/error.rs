//! Painting error types

use thiserror::Error;

use crate::PaintingState;

/// Errors raised by painting lifecycle operations.
///
/// Lifecycle misuse is a programming error on the caller's side; operations
/// abort instead of corrupting state.
#[derive(Error, Debug)]
pub enum PaintError {
    /// A lifecycle operation was attempted from a state that forbids it
    #[error("cannot {op} while painting is {state:?}")]
    InvalidState {
        op: &'static str,
        state: PaintingState,
    },
}
