//! GPU buffer management for the batched count-matrix kernel.

use crate::context::{GpuContext, GpuError};
use ocl::{Buffer, MemFlags};

/// Device-side buffers for one `count_matrix` dispatch: the two packed
/// batches of bitset words and the output count matrix.
pub struct GpuBuffers {
    pub a: Buffer<u64>,
    pub b: Buffer<u64>,
    pub counts: Buffer<i32>,
    words_per_slot: usize,
    n: usize,
    m: usize,
}

impl GpuBuffers {
    /// Allocates device buffers sized for an `n`-row by `m`-column matrix
    /// over bitsets that are `words_per_slot` 64-bit words wide.
    pub fn new(ctx: &GpuContext, words_per_slot: usize, n: usize, m: usize) -> Result<Self, GpuError> {
        let queue = ctx.queue();

        let a = Buffer::<u64>::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().read_only())
            .len(words_per_slot * n)
            .build()?;

        let b = Buffer::<u64>::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().read_only())
            .len(words_per_slot * m)
            .build()?;

        let counts = Buffer::<i32>::builder()
            .queue(queue.clone())
            .flags(MemFlags::new().write_only())
            .len(n * m)
            .build()?;

        Ok(Self {
            a,
            b,
            counts,
            words_per_slot,
            n,
            m,
        })
    }

    pub fn upload_a(&self, words: &[u64]) -> Result<(), GpuError> {
        self.a.write(words).enq()?;
        Ok(())
    }

    pub fn upload_b(&self, words: &[u64]) -> Result<(), GpuError> {
        self.b.write(words).enq()?;
        Ok(())
    }

    pub fn read_counts(&self) -> Result<Vec<i32>, GpuError> {
        let mut out = vec![0i32; self.n * self.m];
        self.counts.read(&mut out).enq()?;
        Ok(out)
    }

    pub fn words_per_slot(&self) -> usize {
        self.words_per_slot
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn m(&self) -> usize {
        self.m
    }
}
