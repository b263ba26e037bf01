use thiserror::Error;

/// Resource-level failures from constructing or operating on a [`Bit`](crate::bit::Bit)
/// or [`BitDB`](crate::bitdb::BitDB).
///
/// Programmer errors (non-positive lengths, out-of-range indices, mismatched
/// operand lengths) are checked with an unconditional `assert!`/`assert_eq!`
/// and panic even in release builds, matching the `assert()` preconditions
/// in the original C library; only failures that a caller can reasonably
/// recover from at runtime — an undersized adopted buffer — are represented
/// here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },
}
