//! OpenCL-backed batched pairwise kernel for `bitdb-core`.

pub mod batched;
pub mod bench;
pub mod buffers;
pub mod context;
pub mod kernel;
pub mod residency;

pub use batched::{count_matrix, count_matrix_into, count_matrix_resident};
pub use context::{DeviceInfo, GpuContext, GpuError};
pub use kernel::GpuProgram;
pub use residency::{BufferId, DeviceRegistry};
