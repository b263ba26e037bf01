//! GPU-backed batched count-matrix kernel.
//!
//! Each call here is one of the allocating/store, per-operator entry
//! points from `bitdb_core::Operator`. Every operator dispatches to its
//! own kernel invocation; the allocating `union`/`diff`/`minus` count
//! variants do not fall through to `inter`'s code path the way the
//! original C library's did.

use bitdb_core::{BackendOptions, BitDB, Operator};
use ocl::{Buffer, Kernel};

use crate::buffers::GpuBuffers;
use crate::context::{GpuContext, GpuError};
use crate::kernel::GpuProgram;
use crate::residency::{BufferId, DeviceRegistry};

fn op_code(op: Operator) -> i32 {
    match op {
        Operator::Union => 0,
        Operator::Inter => 1,
        Operator::Diff => 2,
        Operator::Minus => 3,
    }
}

#[allow(clippy::too_many_arguments)]
fn launch(
    ctx: &GpuContext,
    program: &GpuProgram,
    a: &Buffer<u64>,
    b: &Buffer<u64>,
    counts: &Buffer<i32>,
    words_per_slot: usize,
    n: usize,
    m: usize,
    op: Operator,
) -> Result<(), GpuError> {
    let local = ctx.recommended_work_group_size().min(m.max(1));

    let kernel = Kernel::builder()
        .program(program.program())
        .name("bitdb_count_matrix")
        .queue(ctx.queue().clone())
        .global_work_size([n * local, 1, 1])
        .local_work_size([local, 1, 1])
        .arg(a)
        .arg(b)
        .arg(counts)
        .arg(words_per_slot as u32)
        .arg(n as u32)
        .arg(m as u32)
        .arg(op_code(op))
        .build()?;

    unsafe {
        kernel.enq()?;
    }
    ctx.queue().finish()?;
    Ok(())
}

/// Row-major N×M count matrix for `op` applied to every `(a[i], b[j])`
/// pair, computed on the device described by `ctx`. Allocates fresh device
/// buffers for this one call; see [`count_matrix_resident`] to reuse
/// buffers across repeated calls per `opts`'s residency flags.
pub fn count_matrix(
    ctx: &GpuContext,
    program: &GpuProgram,
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
) -> Result<Vec<i32>, GpuError> {
    assert_eq!(a.length(), b.length(), "batch length mismatch");
    let words_per_slot = bitdb_core::nwords(a.length());
    let buffers = GpuBuffers::new(ctx, words_per_slot, a.nelem(), b.nelem())?;
    buffers.upload_a(a.words())?;
    buffers.upload_b(b.words())?;
    launch(
        ctx,
        program,
        &buffers.a,
        &buffers.b,
        &buffers.counts,
        words_per_slot,
        a.nelem(),
        b.nelem(),
        op,
    )?;
    buffers.read_counts()
}

/// Same as [`count_matrix`], writing into a caller-supplied buffer of
/// length `a.nelem() * b.nelem()` instead of allocating a new `Vec`.
pub fn count_matrix_into(
    ctx: &GpuContext,
    program: &GpuProgram,
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    counts: &mut [i32],
) -> Result<(), GpuError> {
    let result = count_matrix(ctx, program, op, a, b)?;
    assert!(counts.len() >= result.len(), "counts buffer too small");
    counts[..result.len()].copy_from_slice(&result);
    Ok(())
}

/// Like [`count_matrix`], but keeps the `a`/`b` operand buffers resident
/// across calls according to `opts`'s `upd_*_operand`/`release_*` flags,
/// identified by `a_id`/`b_id`. A caller issuing many kernel calls over the
/// same operands should reuse the same ids and set `upd_*_operand = false`
/// once the operand is already uploaded.
pub fn count_matrix_resident(
    ctx: &GpuContext,
    program: &GpuProgram,
    registry: &mut DeviceRegistry,
    a_id: BufferId,
    b_id: BufferId,
    op: Operator,
    a: &BitDB<'_>,
    b: &BitDB<'_>,
    opts: &BackendOptions,
) -> Result<Vec<i32>, GpuError> {
    assert_eq!(a.length(), b.length(), "batch length mismatch");
    let words_per_slot = bitdb_core::nwords(a.length());

    if opts.upd_1st_operand {
        registry.refresh(ctx, a_id, a.words())?;
    } else {
        registry.present(ctx, a_id, a.words())?;
    }
    if opts.upd_2nd_operand {
        registry.refresh(ctx, b_id, b.words())?;
    } else {
        registry.present(ctx, b_id, b.words())?;
    }

    let a_buf = registry.get(a_id).expect("just made resident").clone();
    let b_buf = registry.get(b_id).expect("just made resident").clone();

    let counts_buf = Buffer::<i32>::builder()
        .queue(ctx.queue().clone())
        .flags(ocl::MemFlags::new().write_only())
        .len(a.nelem() * b.nelem())
        .build()?;

    launch(
        ctx,
        program,
        &a_buf,
        &b_buf,
        &counts_buf,
        words_per_slot,
        a.nelem(),
        b.nelem(),
        op,
    )?;
    let mut counts = vec![0i32; a.nelem() * b.nelem()];
    counts_buf.read(&mut counts).enq()?;

    if opts.release_1st_operand {
        registry.release(a_id);
    }
    if opts.release_2nd_operand {
        registry.release(b_id);
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::try_ctx;
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
    fn gpu_matrix_matches_serial_reference_for_every_operator() {
        let Some(ctx) = try_ctx() else { return };
        let program = GpuProgram::bitdb(&ctx).expect("kernel compiles");

        let a = sample_db(2048, 4, 1);
        let b = sample_db(2048, 3, 4);

        for op in [Operator::Union, Operator::Inter, Operator::Diff, Operator::Minus] {
            let expected = bitdb_core::count_matrix_serial(op, &a, &b);
            let got = count_matrix(&ctx, &program, op, &a, &b).expect("kernel launch");
            assert_eq!(got, expected, "mismatch for {op:?}");
        }
    }

    #[test]
    fn resident_dispatch_matches_one_shot_dispatch() {
        let Some(ctx) = try_ctx() else { return };
        let program = GpuProgram::bitdb(&ctx).expect("kernel compiles");

        let a = sample_db(1024, 3, 2);
        let b = sample_db(1024, 3, 3);
        let one_shot = count_matrix(&ctx, &program, Operator::Union, &a, &b).unwrap();

        let mut registry = DeviceRegistry::new();
        let a_id = BufferId::new();
        let b_id = BufferId::new();
        let opts = BackendOptions {
            upd_1st_operand: true,
            upd_2nd_operand: true,
            release_1st_operand: true,
            release_2nd_operand: true,
            ..BackendOptions::default()
        };
        let resident = count_matrix_resident(
            &ctx, &program, &mut registry, a_id, b_id, Operator::Union, &a, &b, &opts,
        )
        .unwrap();

        assert_eq!(one_shot, resident);
        assert!(!registry.is_present(a_id));
        assert!(!registry.is_present(b_id));
    }
}
