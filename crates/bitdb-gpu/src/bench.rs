//! GPU microbenchmark runner for the batched count-matrix kernel.
//!
//! Measures kernel execution time via OpenCL event profiling timestamps,
//! the same warmup-then-timed-iterations approach used to benchmark the
//! rest of this workspace's OpenCL kernels.

use crate::buffers::GpuBuffers;
use crate::context::{DeviceInfo, GpuContext, GpuError};
use crate::kernel::GpuProgram;
use bitdb_core::{BitDB, Operator};
use ocl::enums::ProfilingInfo;
use ocl::{Event, Kernel};

/// Benchmark configuration.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Bitset width, in bits, for both operand batches.
    pub length: usize,
    /// Number of bitsets in the first batch (matrix rows).
    pub n: usize,
    /// Number of bitsets in the second batch (matrix columns).
    pub m: usize,
    /// Number of timed iterations.
    pub iters: u32,
    /// Number of warmup iterations before timing.
    pub warmup: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            length: 65536,
            n: 256,
            m: 256,
            iters: 50,
            warmup: 5,
        }
    }
}

/// Per-operator timing stats.
#[derive(Debug, Clone, Default)]
pub struct ComponentStats {
    pub total_ns: u64,
    pub count: u32,
}

/// Results from benchmarking a single device across all four operators.
#[derive(Debug, Clone)]
pub struct DeviceBenchStats {
    pub device_info: DeviceInfo,
    pub union: ComponentStats,
    pub inter: ComponentStats,
    pub diff: ComponentStats,
    pub minus: ComponentStats,
}

impl DeviceBenchStats {
    pub fn total_ns(&self) -> u64 {
        self.union.total_ns + self.inter.total_ns + self.diff.total_ns + self.minus.total_ns
    }
}

fn sample_db(length: usize, nelem: usize, seed: usize) -> BitDB<'static> {
    let mut db = BitDB::new(length, nelem);
    for i in 0..nelem {
        let mut b = bitdb_core::Bit::new(length);
        for n in (0..length).step_by(seed + i + 2) {
            b.bset(n);
        }
        db.put_at(i, &b);
    }
    db
}

fn op_code(op: Operator) -> i32 {
    match op {
        Operator::Union => 0,
        Operator::Inter => 1,
        Operator::Diff => 2,
        Operator::Minus => 3,
    }
}

/// Run the benchmark on a specific device.
pub fn run_bench_on_device(device_index: usize, cfg: &BenchConfig) -> Result<DeviceBenchStats, GpuError> {
    let ctx = GpuContext::with_device_profiling(device_index)?;
    let device_info = ctx.info().clone();
    let program = GpuProgram::bitdb(&ctx)?;

    let a = sample_db(cfg.length, cfg.n, 1);
    let b = sample_db(cfg.length, cfg.m, 4);
    let words_per_slot = bitdb_core::nwords(cfg.length);

    let buffers = GpuBuffers::new(&ctx, words_per_slot, cfg.n, cfg.m)?;
    buffers.upload_a(a.words())?;
    buffers.upload_b(b.words())?;
    ctx.queue().finish()?;

    let local = ctx.recommended_work_group_size().min(cfg.m.max(1));

    let mut build_kernel = |op: Operator| -> Result<Kernel, GpuError> {
        Ok(Kernel::builder()
            .program(program.program())
            .name("bitdb_count_matrix")
            .queue(ctx.queue().clone())
            .global_work_size([cfg.n * local, 1, 1])
            .local_work_size([local, 1, 1])
            .arg(&buffers.a)
            .arg(&buffers.b)
            .arg(&buffers.counts)
            .arg(words_per_slot as u32)
            .arg(cfg.n as u32)
            .arg(cfg.m as u32)
            .arg(op_code(op))
            .build()?)
    };

    let union = run_kernel_bench(&build_kernel(Operator::Union)?, cfg)?;
    let inter = run_kernel_bench(&build_kernel(Operator::Inter)?, cfg)?;
    let diff = run_kernel_bench(&build_kernel(Operator::Diff)?, cfg)?;
    let minus = run_kernel_bench(&build_kernel(Operator::Minus)?, cfg)?;

    Ok(DeviceBenchStats {
        device_info,
        union,
        inter,
        diff,
        minus,
    })
}

fn extract_profiling_ns(event: &Event, info: ProfilingInfo) -> Result<u64, GpuError> {
    use ocl::enums::ProfilingInfoResult;
    match event.profiling_info(info)? {
        ProfilingInfoResult::Queued(ns)
        | ProfilingInfoResult::Submit(ns)
        | ProfilingInfoResult::Start(ns)
        | ProfilingInfoResult::End(ns) => Ok(ns),
    }
}

fn run_kernel_bench(kernel: &Kernel, cfg: &BenchConfig) -> Result<ComponentStats, GpuError> {
    for _ in 0..cfg.warmup {
        let mut event = Event::empty();
        unsafe {
            kernel.cmd().enew(&mut event).enq()?;
        }
        event.wait_for().map_err(ocl::Error::from)?;
    }

    let mut total_ns = 0u64;
    for _ in 0..cfg.iters {
        let mut event = Event::empty();
        unsafe {
            kernel.cmd().enew(&mut event).enq()?;
        }
        event.wait_for().map_err(ocl::Error::from)?;

        let start = extract_profiling_ns(&event, ProfilingInfo::Start)?;
        let end = extract_profiling_ns(&event, ProfilingInfo::End)?;
        if start == 0 || end == 0 || end <= start {
            return Err(GpuError::Other(
                "profiling timestamps invalid; is CL_QUEUE_PROFILING_ENABLE set?".into(),
            ));
        }
        total_ns += end - start;
    }

    Ok(ComponentStats {
        total_ns,
        count: cfg.iters,
    })
}

/// Print benchmark results for multiple devices.
pub fn print_bench_results(results: &[DeviceBenchStats], cfg: &BenchConfig) {
    println!(
        "\nGPU count-matrix microbench, length={}, n={}, m={}, iters={}\n",
        cfg.length, cfg.n, cfg.m, cfg.iters
    );
    for stats in results {
        print_device_table(stats);
        println!();
    }
}

fn print_device_table(stats: &DeviceBenchStats) {
    println!(
        "Device {}: {} - {}",
        stats.device_info.global_idx,
        stats.device_info.vendor.trim(),
        stats.device_info.device_name.trim()
    );

    let total = stats.total_ns() as f64;
    let components: [(&str, &ComponentStats); 4] = [
        ("union", &stats.union),
        ("inter", &stats.inter),
        ("diff", &stats.diff),
        ("minus", &stats.minus),
    ];

    for (name, cs) in components {
        let ms = cs.total_ns as f64 / 1_000_000.0;
        let pct = if total > 0.0 { cs.total_ns as f64 / total * 100.0 } else { 0.0 };
        let avg_ms = cs.total_ns as f64 / cs.count.max(1) as f64 / 1_000_000.0;
        println!(
            "{:<8} {:>8.1} ms ({:>5.1}%)  avg {:>8.3} ms",
            format!("{name}:"),
            ms,
            pct,
            avg_ms
        );
    }
    println!("{:<8} {:>8.1} ms", "total:", total / 1_000_000.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::try_ctx;

    #[test]
    fn bench_runs_and_produces_positive_timings() {
        if try_ctx().is_none() {
            return;
        }
        let cfg = BenchConfig {
            length: 2048,
            n: 8,
            m: 8,
            iters: 2,
            warmup: 1,
        };
        let stats = run_bench_on_device(0, &cfg).expect("benchmark run");
        assert!(stats.total_ns() > 0);
    }
}
