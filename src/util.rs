//! Small shared helpers.

/// Log target used by every component of the resource management core, so that
/// graph-related output can be filtered as one category.
pub(crate) const LOG_TARGET: &str = "render_foundation_graph";

/// Order-dependent hash mixing.
///
/// The usual golden-ratio combiner, widened to 64 bits. Used to fold image
/// description fields and frame buffer attachment lists into a single bucket key.
pub(crate) fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}
