use anyhow::{bail, Context, Result};
use bitdb_core::{BackendOptions, Bit, BitDB, CpuBackend, Operator};
use bitdb_gpu::{GpuContext, GpuProgram};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "bitdb", about = "Batched bitset set-algebra benchmark and demo")]
struct Args {
    /// List all available OpenCL devices and exit
    #[arg(long = "list-devices", default_value_t = false)]
    list_devices: bool,

    /// Bitset width in bits for both operand batches
    #[arg(short = 'l', long = "length", default_value_t = 65536)]
    length: usize,

    /// Number of bitsets in the first batch (matrix rows)
    #[arg(short = 'n', long = "rows", default_value_t = 256)]
    n: usize,

    /// Number of bitsets in the second batch (matrix columns)
    #[arg(short = 'm', long = "cols", default_value_t = 256)]
    m: usize,

    /// Pairwise operator to apply
    #[arg(short = 'o', long = "op", value_enum, default_value_t = OpArg::Union)]
    op: OpArg,

    /// Backend to run
    #[arg(short = 'b', long = "backend", value_enum, default_value_t = BackendArg::All)]
    backend: BackendArg,

    /// Number of CPU threads for the threaded backend (<= 0 means default)
    #[arg(long = "cpu-threads", default_value_t = -1)]
    cpu_threads: i32,

    /// OpenCL device index to use
    #[arg(long = "device", default_value_t = 0)]
    device: usize,

    /// Fraction of bits set per bitset, in [0.0, 1.0]
    #[arg(long = "density", default_value_t = 0.1)]
    density: f64,

    /// Random seed for generating sample data
    #[arg(long = "seed", default_value_t = 1)]
    seed: u64,

    /// Run the GPU microbenchmark instead of a single count-matrix pass
    #[arg(long = "bench", default_value_t = false)]
    bench: bool,

    /// Number of timed iterations for --bench
    #[arg(long = "bench-iters", default_value_t = 50)]
    bench_iters: u32,

    /// Warmup iterations for --bench
    #[arg(long = "bench-warmup", default_value_t = 5)]
    bench_warmup: u32,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OpArg {
    Union,
    Inter,
    Diff,
    Minus,
}

impl From<OpArg> for Operator {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Union => Operator::Union,
            OpArg::Inter => Operator::Inter,
            OpArg::Diff => Operator::Diff,
            OpArg::Minus => Operator::Minus,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum BackendArg {
    Serial,
    Threaded,
    Gpu,
    All,
}

fn random_db(length: usize, nelem: usize, density: f64, seed: u64) -> BitDB<'static> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut db = BitDB::new(length, nelem);
    for i in 0..nelem {
        let mut b = Bit::new(length);
        for n in 0..length {
            if rng.gen_bool(density) {
                b.bset(n);
            }
        }
        db.put_at(i, &b);
    }
    db
}

fn list_devices() -> Result<()> {
    let devices = GpuContext::enumerate_devices().context("enumerating OpenCL devices")?;
    if devices.is_empty() {
        println!("No OpenCL GPU devices found.");
        return Ok(());
    }
    for info in devices {
        println!("{info}");
    }
    Ok(())
}

fn run_backend(
    backend: BackendArg,
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    args: &Args,
) -> Result<()> {
    let opts = BackendOptions {
        num_cpu_threads: args.cpu_threads,
        device_id: args.device as i32,
        ..BackendOptions::default()
    };

    match backend {
        BackendArg::Serial => {
            let start = Instant::now();
            let counts = bitdb_core::count_matrix_serial(op, a, b);
            report("serial", start.elapsed(), &counts);
        }
        BackendArg::Threaded => {
            let start = Instant::now();
            let counts = bitdb_cpu::dispatch::count_matrix(op, a, b, CpuBackend::Threaded, &opts)?;
            report("threaded", start.elapsed(), &counts);
        }
        BackendArg::Gpu => {
            let ctx = GpuContext::with_device(opts.device_id as usize)
                .context("creating GPU context")?;
            let program = GpuProgram::bitdb(&ctx).context("compiling kernel")?;
            let start = Instant::now();
            let counts = bitdb_gpu::count_matrix(&ctx, &program, op, a, b)?;
            report("gpu", start.elapsed(), &counts);
        }
        BackendArg::All => {
            run_backend(BackendArg::Serial, op, a, b, args)?;
            run_backend(BackendArg::Threaded, op, a, b, args)?;
            match GpuContext::with_device(opts.device_id as usize) {
                Ok(_) => run_backend(BackendArg::Gpu, op, a, b, args)?,
                Err(e) => eprintln!("skipping gpu backend: {e}"),
            }
        }
    }
    Ok(())
}

fn report(label: &str, elapsed: std::time::Duration, counts: &[i32]) {
    let sum: i64 = counts.iter().map(|&c| c as i64).sum();
    println!(
        "{label:<9} {:>8.3} ms   cells={:<8} sum={}",
        elapsed.as_secs_f64() * 1000.0,
        counts.len(),
        sum
    );
}

fn run_bench(args: &Args) -> Result<()> {
    let devices = GpuContext::enumerate_devices().context("enumerating OpenCL devices")?;
    if devices.is_empty() {
        bail!("no OpenCL GPU devices found");
    }

    let cfg = bitdb_gpu::bench::BenchConfig {
        length: args.length,
        n: args.n,
        m: args.m,
        iters: args.bench_iters,
        warmup: args.bench_warmup,
    };

    let pb = ProgressBar::new(devices.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} devices benchmarked")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut results = Vec::new();
    for info in &devices {
        let stats = bitdb_gpu::bench::run_bench_on_device(info.global_idx, &cfg)
            .with_context(|| format!("benchmarking device {}", info.global_idx))?;
        results.push(stats);
        pb.inc(1);
    }
    pb.finish_and_clear();

    bitdb_gpu::bench::print_bench_results(&results, &cfg);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    if args.bench {
        return run_bench(&args);
    }

    if args.n == 0 || args.m == 0 {
        bail!("--rows and --cols must be at least 1");
    }
    if !(0.0..=1.0).contains(&args.density) {
        bail!("--density must be in [0.0, 1.0]");
    }

    eprintln!(
        "length={} rows={} cols={} op={:?} density={}",
        args.length, args.n, args.m, args.op, args.density
    );

    let a = random_db(args.length, args.n, args.density, args.seed);
    let b = random_db(args.length, args.m, args.density, args.seed.wrapping_add(1));

    run_backend(args.backend, args.op.into(), &a, &b, &args)
}
