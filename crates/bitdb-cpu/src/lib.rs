//! CPU batched pairwise kernels: a rayon-threaded backend plus dispatch
//! helpers that select between it and `bitdb-core`'s serial reference
//! kernel via [`bitdb_core::CpuBackend`].

#![forbid(unsafe_code)]

pub mod dispatch;
pub mod parallel;

pub use dispatch::count_matrix;
pub use parallel::Error;
