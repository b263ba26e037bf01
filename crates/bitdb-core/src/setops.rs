//! Pairwise set-algebra operators.
//!
//! The original C library generated four nearly-identical functions per
//! operation from a macro. Here a single [`Operator`] enum parameterizes one
//! generic implementation, used by [`Bit`]-level operations, the batched
//! kernels in `bitdb-cpu`, and (transliterated into OpenCL) the GPU kernel.

use crate::bit::Bit;

/// A pairwise bitwise operator.
///
/// Naming follows the original library's vocabulary: `union` is OR,
/// `inter` is AND, `diff`/`minus` are XOR and AND-NOT respectively (see the
/// null-operand table below, which is what actually distinguishes `diff`
/// from `minus` when one operand is absent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Union,
    Inter,
    Diff,
    Minus,
}

impl Operator {
    fn apply_words(self, a: u64, b: u64) -> u64 {
        match self {
            Operator::Union => a | b,
            Operator::Inter => a & b,
            Operator::Diff => a ^ b,
            Operator::Minus => a & !b,
        }
    }

    /// Result of this operator when one operand is absent ("empty set").
    ///
    /// This table is the crux of the original library's null-operand
    /// convention: `diff` and `minus` treat a missing operand differently
    /// depending on which side is missing, while `union`/`inter` are
    /// symmetric in the present operand.
    fn with_absent(self, present: &Bit<'_>, present_is_first: bool) -> Bit<'static> {
        let mut out = Bit::new(present.length());
        match (self, present_is_first) {
            (Operator::Union, _) => copy_into(&mut out, present),
            (Operator::Inter, _) => {}
            (Operator::Diff, _) => copy_into(&mut out, present),
            (Operator::Minus, true) => copy_into(&mut out, present),
            (Operator::Minus, false) => {}
        }
        out
    }
}

fn copy_into(dst: &mut Bit<'_>, src: &Bit<'_>) {
    dst.words_mut().copy_from_slice(src.words());
}

/// Applies `op` to `(s, t)`, allocating a new result bitset.
///
/// At least one of `s`, `t` must be present; both absent is a programmer
/// error (checked, not recoverable), matching the `assert(s || t)`
/// precondition in the original macros.
pub fn combine(op: Operator, s: Option<&Bit<'_>>, t: Option<&Bit<'_>>) -> Bit<'static> {
    match (s, t) {
        (Some(s), Some(t)) => {
            assert_eq!(s.length(), t.length(), "operand length mismatch");
            let mut out = Bit::new(s.length());
            for ((o, a), b) in out.words_mut().iter_mut().zip(s.words()).zip(t.words()) {
                *o = op.apply_words(*a, *b);
            }
            out
        }
        (Some(s), None) => op.with_absent(s, true),
        (None, Some(t)) => op.with_absent(t, false),
        (None, None) => panic!("both operands of a pairwise operation are empty"),
    }
}

/// Applies `op` to `(s, t)` and writes the result into `dst` in place,
/// without allocating. `dst` must already have the correct length.
pub fn combine_into(op: Operator, dst: &mut Bit<'_>, s: Option<&Bit<'_>>, t: Option<&Bit<'_>>) {
    match (s, t) {
        (Some(s), Some(t)) => {
            assert_eq!(dst.length(), s.length(), "destination length does not match operand");
            assert_eq!(dst.length(), t.length(), "destination length does not match operand");
            for ((o, a), b) in dst.words_mut().iter_mut().zip(s.words()).zip(t.words()) {
                *o = op.apply_words(*a, *b);
            }
        }
        (Some(s), None) => store_absent(op, dst, s, true),
        (None, Some(t)) => store_absent(op, dst, t, false),
        (None, None) => panic!("both operands of a pairwise operation are empty"),
    }
}

fn store_absent(op: Operator, dst: &mut Bit<'_>, present: &Bit<'_>, present_is_first: bool) {
    let copy = matches!(
        (op, present_is_first),
        (Operator::Union, _) | (Operator::Diff, _) | (Operator::Minus, true)
    );
    if copy {
        copy_into(dst, present);
    } else {
        for w in dst.words_mut() {
            *w = 0;
        }
    }
}

/// Applies `op` to `(s, t)` and returns only the popcount of the result,
/// without materializing the result bitset.
pub fn combine_count(op: Operator, s: Option<&Bit<'_>>, t: Option<&Bit<'_>>) -> u32 {
    match (s, t) {
        (Some(s), Some(t)) => s
            .words()
            .iter()
            .zip(t.words())
            .map(|(a, b)| op.apply_words(*a, *b).count_ones())
            .sum(),
        (Some(s), None) => match op {
            Operator::Union | Operator::Diff | Operator::Minus => s.count(),
            Operator::Inter => 0,
        },
        (None, Some(t)) => match op {
            Operator::Union | Operator::Diff => t.count(),
            Operator::Inter | Operator::Minus => 0,
        },
        (None, None) => panic!("both operands of a pairwise operation are empty"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(length: usize, set: &[usize]) -> Bit<'static> {
        let mut b = Bit::new(length);
        for &n in set {
            b.bset(n);
        }
        b
    }

    #[test]
    fn inter_and_union_match_expected_bits() {
        let a = bits(64, &[0, 1, 2, 10]);
        let b = bits(64, &[1, 2, 3]);

        let inter = combine(Operator::Inter, Some(&a), Some(&b));
        assert_eq!(inter.count(), 2);
        assert!(inter.get(1) && inter.get(2));

        let union = combine(Operator::Union, Some(&a), Some(&b));
        assert_eq!(union.count(), 5);
    }

    #[test]
    fn diff_is_symmetric_xor() {
        let a = bits(64, &[0, 1]);
        let b = bits(64, &[1, 2]);
        let d1 = combine(Operator::Diff, Some(&a), Some(&b));
        let d2 = combine(Operator::Diff, Some(&b), Some(&a));
        assert!(d1.eq(&d2));
        assert_eq!(d1.count(), 2);
    }

    #[test]
    fn minus_is_asymmetric() {
        let a = bits(64, &[0, 1, 2]);
        let b = bits(64, &[1]);
        let ab = combine(Operator::Minus, Some(&a), Some(&b));
        let ba = combine(Operator::Minus, Some(&b), Some(&a));
        assert_eq!(ab.count(), 2);
        assert_eq!(ba.count(), 0);
    }

    #[test]
    fn null_operand_table_matches_convention() {
        let s = bits(64, &[0, 1, 2]);

        assert_eq!(combine(Operator::Union, Some(&s), None).count(), s.count());
        assert_eq!(combine(Operator::Union, None, Some(&s)).count(), s.count());

        assert_eq!(combine(Operator::Inter, Some(&s), None).count(), 0);
        assert_eq!(combine(Operator::Inter, None, Some(&s)).count(), 0);

        assert_eq!(combine(Operator::Diff, Some(&s), None).count(), s.count());
        assert_eq!(combine(Operator::Diff, None, Some(&s)).count(), s.count());

        assert_eq!(combine(Operator::Minus, Some(&s), None).count(), s.count());
        assert_eq!(combine(Operator::Minus, None, Some(&s)).count(), 0);
    }

    #[test]
    #[should_panic]
    fn both_absent_panics() {
        combine(Operator::Union, None, None);
    }

    #[test]
    fn combine_count_matches_materialized_result_for_every_operator() {
        let a = bits(128, &[0, 5, 64, 100]);
        let b = bits(128, &[5, 64, 127]);
        for op in [Operator::Union, Operator::Inter, Operator::Diff, Operator::Minus] {
            let materialized = combine(op, Some(&a), Some(&b)).count();
            assert_eq!(combine_count(op, Some(&a), Some(&b)), materialized);

            let with_absent_first = combine(op, Some(&a), None).count();
            assert_eq!(combine_count(op, Some(&a), None), with_absent_first);

            let with_absent_second = combine(op, None, Some(&b)).count();
            assert_eq!(combine_count(op, None, Some(&b)), with_absent_second);
        }
    }

    #[test]
    fn combine_into_matches_combine() {
        let a = bits(192, &[0, 64, 128, 191]);
        let b = bits(192, &[1, 64, 129]);
        for op in [Operator::Union, Operator::Inter, Operator::Diff, Operator::Minus] {
            let expected = combine(op, Some(&a), Some(&b));
            let mut dst = Bit::new(192);
            combine_into(op, &mut dst, Some(&a), Some(&b));
            assert!(dst.eq(&expected));
        }
    }
}
