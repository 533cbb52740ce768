//! Thin wrapper over backend pass-instance checkpoints.
//!
//! The backend owns the checkpoint graph; the core only creates checkpoints and adds
//! happens-before edges. Every edge the core inserts connects a usage span to itself
//! (begin before end) or orders one whole span before another span's begin, and the
//! "before" side is always the span created last. Ordering along creation time is
//! strictly monotonic, so no inserted edge can close a cycle.

use crate::handle::Checkpoint;
use crate::handle::ContextHandle;
use crate::traits::RenderBackend;

/// The pair of checkpoints delimiting one response's lifetime on the GPU timeline.
///
/// The pass instance that receives the response schedules itself after `begin` and
/// signals `end` when its GPU work is finished.
#[derive(Copy, Clone, Debug)]
pub struct UsageSpan {
    pub begin: Checkpoint,
    pub end: Checkpoint,
}

impl UsageSpan {
    /// Creates both checkpoints and the implicit begin-before-end edge.
    pub fn create(backend: &dyn RenderBackend, context: ContextHandle) -> UsageSpan {
        let begin = backend.create_checkpoint(context);
        let end = backend.create_checkpoint(context);
        backend.add_checkpoint_dependency(end, begin);
        UsageSpan { begin, end }
    }
}

/// Orders `earlier_end` strictly before `later_begin` on the GPU timeline.
pub(crate) fn sequence_before(
    backend: &dyn RenderBackend,
    earlier_end: Checkpoint,
    later_begin: Checkpoint,
) {
    backend.add_checkpoint_dependency(later_begin, earlier_end);
}
