//! Picks between the serial and rayon-threaded kernels.
//!
//! The original C library generated one entry point per backend per
//! operator. Since "serial" and "threaded" share one Rust signature that
//! differs only in which code path runs, this crate folds that axis into
//! a [`CpuBackend`] selector argument instead of doubling the function
//! count.

use bitdb_core::{BackendOptions, BitDB, CpuBackend, Operator};

use crate::parallel;

/// Row-major N×M count matrix for `op` applied to every `(a[i], b[j])`
/// pair, computed serially or across a rayon thread pool per
/// `opts`/`backend`.
pub fn count_matrix(
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    backend: CpuBackend,
    opts: &BackendOptions,
) -> Result<Vec<i32>, parallel::Error> {
    match backend {
        CpuBackend::Serial => Ok(bitdb_core::count_matrix_serial(op, a, b)),
        CpuBackend::Threaded => parallel::count_matrix(op, a, b, opts),
    }
}

/// Same as [`count_matrix`], writing into a caller-supplied buffer instead
/// of allocating.
pub fn count_matrix_into(
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    backend: CpuBackend,
    opts: &BackendOptions,
    counts: &mut [i32],
) -> Result<(), parallel::Error> {
    match backend {
        CpuBackend::Serial => {
            bitdb_core::count_matrix_serial_into(op, a, b, counts);
            Ok(())
        }
        CpuBackend::Threaded => parallel::count_matrix_into(op, a, b, opts, counts),
    }
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
    fn serial_and_threaded_backends_agree() {
        let a = sample_db(1024, 4, 1);
        let b = sample_db(1024, 3, 2);
        let opts = BackendOptions::default();

        let serial = count_matrix(Operator::Inter, &a, &b, CpuBackend::Serial, &opts).unwrap();
        let threaded = count_matrix(Operator::Inter, &a, &b, CpuBackend::Threaded, &opts).unwrap();
        assert_eq!(serial, threaded);
    }
}
