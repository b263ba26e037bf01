//! OpenCL kernel compilation.

use crate::context::{GpuContext, GpuError};
use ocl::Program;

/// Kernel source embedded at compile time.
pub mod sources {
    pub const BITDB: &str = include_str!("../kernels/bitdb.cl");
}

/// Compiled OpenCL program exposing the batched count-matrix kernel.
pub struct GpuProgram {
    program: Program,
}

impl GpuProgram {
    /// Compile a program from arbitrary source.
    pub fn from_source(ctx: &GpuContext, source: &str) -> Result<Self, GpuError> {
        let program = Program::builder()
            .src(source)
            .devices(ctx.device())
            .cmplr_opt("-cl-std=CL1.2")
            .build(ctx.context())?;

        Ok(Self { program })
    }

    /// Compile the batched count-matrix kernel.
    pub fn bitdb(ctx: &GpuContext) -> Result<Self, GpuError> {
        Self::from_source(ctx, sources::BITDB)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}
