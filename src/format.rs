//! Pixel formats for transient render targets.

/// Formats the core accepts for transient images.
///
/// Vulkan-style naming. Only formats that make sense as render pass attachments are
/// listed; sampled-only exotics (compressed formats and the like) have no business in
/// a transient target cache.
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Format {
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM_PACK32,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
    S8_UINT,
}

impl Format {
    /// True when the format carries a depth or stencil aspect.
    pub fn is_depth_stencil(self) -> bool {
        match self {
            Format::D16_UNORM
            | Format::D32_SFLOAT
            | Format::D24_UNORM_S8_UINT
            | Format::D32_SFLOAT_S8_UINT
            | Format::S8_UINT => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Format;

    #[test]
    fn depth_stencil_classification() {
        assert!(Format::D32_SFLOAT.is_depth_stencil());
        assert!(Format::D24_UNORM_S8_UINT.is_depth_stencil());
        assert!(Format::S8_UINT.is_depth_stencil());
        assert!(!Format::R8G8B8A8_UNORM.is_depth_stencil());
        assert!(!Format::R16G16B16A16_SFLOAT.is_depth_stencil());
    }
}
