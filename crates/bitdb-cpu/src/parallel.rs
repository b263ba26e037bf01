//! Rayon-driven batched pairwise kernel.
//!
//! Computes the same N×M count matrix as
//! [`bitdb_core::count_matrix_serial`], but walks the flattened `(i, j)`
//! grid through a rayon thread pool instead of two nested loops. Flattening
//! the grid into a single `0..N*M` range and letting rayon's work-stealing
//! scheduler distribute chunks across threads is this crate's equivalent
//! of an OpenMP `collapse(2) schedule(guided)` loop: no single thread is
//! pinned to a fixed slice of rows, so uneven per-cell cost still balances
//! across threads.

#![forbid(unsafe_code)]

use bitdb_core::{BackendOptions, BitDB, Operator};
use rayon::prelude::*;
use rayon::ThreadPoolBuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

fn build_pool(num_cpu_threads: i32) -> Result<rayon::ThreadPool, Error> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if num_cpu_threads > 0 {
        builder = builder.num_threads(num_cpu_threads as usize);
    }
    Ok(builder.build()?)
}

/// Row-major N×M matrix, `counts[i * m + j] == count(op(a[i], b[j]))`,
/// computed across `opts.num_cpu_threads` rayon worker threads
/// (`<= 0` meaning rayon's default parallelism).
pub fn count_matrix(
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    opts: &BackendOptions,
) -> Result<Vec<i32>, Error> {
    let mut counts = vec![0i32; a.nelem() * b.nelem()];
    count_matrix_into(op, a, b, opts, &mut counts)?;
    Ok(counts)
}

/// Same as [`count_matrix`], writing into a caller-supplied buffer of
/// length `a.nelem() * b.nelem()` instead of allocating.
pub fn count_matrix_into(
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    opts: &BackendOptions,
    counts: &mut [i32],
) -> Result<(), Error> {
    assert_eq!(a.length(), b.length(), "batch length mismatch");
    let (n, m) = (a.nelem(), b.nelem());
    assert!(counts.len() >= n * m, "counts buffer too small");

    let pool = build_pool(opts.num_cpu_threads)?;
    pool.install(|| {
        counts[..n * m].par_iter_mut().enumerate().for_each(|(k, slot)| {
            let i = k / m;
            let j = k % m;
            let ai = a.get_from(i);
            let bj = b.get_from(j);
            *slot = bitdb_core::combine_count(op, Some(&ai), Some(&bj)) as i32;
        });
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitdb_core::Bit;

    fn sample_db(length: usize, nelem: usize, seed: usize) -> BitDB<'static> {
        let mut db = BitDB::new(length, nelem);
        for i in 0..nelem {
            let mut b = Bit::new(length);
            for n in (0..length).step_by(seed + i + 2) {
                b.bset(n);
            }
            db.put_at(i, &b);
        }
        db
    }

    #[test]
    fn threaded_matrix_matches_serial_reference_for_every_operator() {
        let a = sample_db(2048, 6, 1);
        let b = sample_db(2048, 5, 4);
        let opts = BackendOptions::default();

        for op in [Operator::Union, Operator::Inter, Operator::Diff, Operator::Minus] {
            let serial = bitdb_core::count_matrix_serial(op, &a, &b);
            let threaded = count_matrix(op, &a, &b, &opts).unwrap();
            assert_eq!(serial, threaded, "mismatch for {op:?}");
        }
    }

    #[test]
    fn explicit_thread_count_agrees_with_default() {
        let a = sample_db(1024, 4, 2);
        let b = sample_db(1024, 4, 3);
        let mut opts = BackendOptions::default();
        opts.num_cpu_threads = 2;
        let with_two = count_matrix(Operator::Union, &a, &b, &opts).unwrap();

        opts.num_cpu_threads = -1;
        let default_pool = count_matrix(Operator::Union, &a, &b, &opts).unwrap();
        assert_eq!(with_two, default_pool);
    }

    #[test]
    fn into_variant_matches_allocating_variant() {
        let a = sample_db(512, 3, 1);
        let b = sample_db(512, 3, 2);
        let opts = BackendOptions::default();
        let allocated = count_matrix(Operator::Minus, &a, &b, &opts).unwrap();
        let mut buf = vec![0i32; 9];
        count_matrix_into(Operator::Minus, &a, &b, &opts, &mut buf).unwrap();
        assert_eq!(allocated, buf);
    }
}
