//! Configuration shared by every batched-kernel backend.

/// Which CPU execution strategy a batched kernel should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuBackend {
    Serial,
    #[default]
    Threaded,
}

/// Knobs controlling how a batched pairwise kernel runs and how its GPU
/// operand buffers persist across calls.
///
/// `device_id` selects the OpenCL device for GPU backends (`<= 0` means
/// device 0). `num_cpu_threads <= 0` means "use the implementation's
/// maximum", the same convention the original OpenMP code used for
/// `omp_get_max_threads`. The residency flags mirror the GPU data-residency
/// protocol: a caller batching many kernel calls over the same operands can
/// keep them resident on the device by setting the `upd_*`/`release_*`
/// flags appropriately instead of re-uploading every call. There is no
/// `release_counts` flag: the count matrix is the call's own return value,
/// never cached across calls, so there is nothing for such a flag to
/// release.
#[derive(Debug, Clone, Copy)]
pub struct BackendOptions {
    pub device_id: i32,
    pub num_cpu_threads: i32,
    pub upd_1st_operand: bool,
    pub upd_2nd_operand: bool,
    pub release_1st_operand: bool,
    pub release_2nd_operand: bool,
}

impl Default for BackendOptions {
    /// Neutral defaults, as documented for unknown/unset fields: `false`
    /// for every boolean, `0` for `device_id`, `0` for `num_cpu_threads`
    /// (which per its own convention also means "use the implementation's
    /// maximum"). A caller sequencing several GPU calls over the same
    /// operands opts into residency explicitly by setting the
    /// `upd_*`/`release_*` flags rather than having it assumed.
    fn default() -> Self {
        BackendOptions {
            device_id: 0,
            num_cpu_threads: 0,
            upd_1st_operand: false,
            upd_2nd_operand: false,
            release_1st_operand: false,
            release_2nd_operand: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_the_documented_neutral_values() {
        let opts = BackendOptions::default();
        assert_eq!(opts.device_id, 0);
        assert_eq!(opts.num_cpu_threads, 0);
        assert!(!opts.upd_1st_operand && !opts.upd_2nd_operand);
        assert!(!opts.release_1st_operand && !opts.release_2nd_operand);
    }
}
