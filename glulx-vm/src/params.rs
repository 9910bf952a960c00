//! Tunable interpreter parameters.

/// Knobs a host may adjust before booting a machine.
///
/// Everything here has a sensible default; the header of the loaded image
/// supplies the rest of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmParams {
    /// Stack size in bytes, overriding the header's request when set.
    pub stack_size: Option<u32>,
    /// How many undo snapshots to retain.
    pub undo_depth: usize,
}

impl Default for VmParams {
    fn default() -> Self {
        Self {
            stack_size: None,
            undo_depth: 6,
        }
    }
}
