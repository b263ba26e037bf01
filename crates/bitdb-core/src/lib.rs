//! Core types for a fixed-capacity, batched bitset engine: a single dense
//! bitset (`Bit`), a packed batch of bitsets (`BitDB`), pairwise set-algebra
//! operators, and the serial reference kernel for batched popcount
//! matrices.

#![forbid(unsafe_code)]

mod backend;
mod bit;
mod bitdb;
mod error;
mod kernel;
mod popcount;
mod setops;

pub use backend::{BackendOptions, CpuBackend};
pub use bit::{buffer_size, nwords, Bit, Storage};
pub use bitdb::BitDB;
pub use error::Error;
pub use kernel::{count_matrix_serial, count_matrix_serial_into};
pub use popcount::{hardware as popcount_hardware, wwg as popcount_wwg, PopcountBackend};
pub use setops::{combine, combine_count, combine_into, Operator};

pub type Result<T> = std::result::Result<T, Error>;
