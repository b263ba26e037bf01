//! Serial (single-thread) batched pairwise kernel.
//!
//! Computes the N×M count matrix between two [`BitDB`] batches: cell
//! `(i, j)` is `count(op(a[i], b[j]))`. This is the reference
//! implementation both the threaded (`bitdb-cpu`) and GPU (`bitdb-gpu`)
//! backends are checked against for bit-exact agreement.

use crate::bitdb::BitDB;
use crate::setops::{combine_count, Operator};

/// Row-major N×M matrix, `counts[i * m + j] == count(op(a[i], b[j]))`.
pub fn count_matrix_serial(op: Operator, a: &BitDB<'_>, b: &BitDB<'_>) -> Vec<i32> {
    assert_eq!(a.length(), b.length(), "batch length mismatch");
    let (n, m) = (a.nelem(), b.nelem());
    let mut counts = vec![0i32; n * m];
    for i in 0..n {
        let ai = a.get_from(i);
        for j in 0..m {
            let bj = b.get_from(j);
            counts[i * m + j] = combine_count(op, Some(&ai), Some(&bj)) as i32;
        }
    }
    counts
}

/// Same as [`count_matrix_serial`] but writes into a caller-supplied
/// `counts` buffer of length `a.nelem() * b.nelem()`, without allocating a
/// new `Vec`.
pub fn count_matrix_serial_into(op: Operator, a: &BitDB<'_>, b: &BitDB<'_>, counts: &mut [i32]) {
    assert_eq!(a.length(), b.length(), "batch length mismatch");
    let (n, m) = (a.nelem(), b.nelem());
    assert!(counts.len() >= n * m, "counts buffer too small");
    for i in 0..n {
        let ai = a.get_from(i);
        for j in 0..m {
            let bj = b.get_from(j);
            counts[i * m + j] = combine_count(op, Some(&ai), Some(&bj)) as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit::Bit;

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
    fn matrix_matches_pairwise_combine_count() {
        let a = sample_db(256, 3, 1);
        let b = sample_db(256, 4, 5);
        for op in [Operator::Union, Operator::Inter, Operator::Diff, Operator::Minus] {
            let counts = count_matrix_serial(op, &a, &b);
            for i in 0..3 {
                for j in 0..4 {
                    let ai = a.get_from(i);
                    let bj = b.get_from(j);
                    let expected = combine_count(op, Some(&ai), Some(&bj)) as i32;
                    assert_eq!(counts[i * 4 + j], expected);
                }
            }
        }
    }

    #[test]
    fn into_variant_matches_allocating_variant() {
        let a = sample_db(512, 2, 2);
        let b = sample_db(512, 2, 3);
        let allocated = count_matrix_serial(Operator::Union, &a, &b);
        let mut buf = vec![0i32; 4];
        count_matrix_serial_into(Operator::Union, &a, &b, &mut buf);
        assert_eq!(allocated, buf);
    }
}
