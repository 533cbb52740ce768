//! The backend capability interface.

use crate::framebuffer::FramebufferDescription;
use crate::handle::Checkpoint;
use crate::handle::ContextHandle;
use crate::handle::DeviceId;
use crate::handle::FrameBufferHandle;
use crate::handle::ImageHandle;
use crate::image::ImageDescription;

/// Kind of GPU behind a device id, used to prioritise during automatic selection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeviceType {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

/// Static information about a device enumerated by the backend.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
}

/// Trait implemented by render backends.
///
/// This is the complete set of backend operations the resource management core relies
/// on: the frame lifecycle, image and frame buffer creation/destruction, and
/// pass-instance checkpoints. The core takes the backend as a trait object at
/// construction and never depends on a concrete implementation, so a null backend is
/// enough to drive the whole thing in tests.
///
/// Creation calls return `None` on failure; the core logs and propagates. All calls
/// are expected not to block the caller; a backend that blocks simply stretches the
/// time the request lock is held.
pub trait RenderBackend: Send + Sync {
    // --- frame lifecycle -------------------------------------------------------------

    /// Devices available for selection.
    fn enumerate_devices(&self) -> Vec<DeviceInfo>;

    /// Selects the device subsequent frames will run on. Returns false when the device
    /// cannot be used.
    fn select_device(&self, device: DeviceId) -> bool;

    /// Information about the currently selected device, if any.
    fn selected_device_info(&self) -> Option<DeviceInfo>;

    /// The render context resource creation goes through. Only valid once a device has
    /// been selected.
    fn render_context(&self) -> ContextHandle;

    /// Advances the backend to the next frame. Returns false when the frame could not
    /// be scheduled, for example while the swapchain is being rebuilt.
    fn begin_next_frame(&self, context: ContextHandle) -> bool;

    // --- resources -------------------------------------------------------------------

    fn create_image(
        &self,
        context: ContextHandle,
        description: &ImageDescription,
    ) -> Option<ImageHandle>;

    fn destroy_image(&self, image: ImageHandle);

    fn create_frame_buffer(
        &self,
        context: ContextHandle,
        description: &FramebufferDescription<'_>,
    ) -> Option<FrameBufferHandle>;

    fn destroy_frame_buffer(&self, frame_buffer: FrameBufferHandle);

    // --- checkpoints -----------------------------------------------------------------

    /// Creates a checkpoint on the GPU timeline of `context`.
    fn create_checkpoint(&self, context: ContextHandle) -> Checkpoint;

    /// Records that `checkpoint` must not be reached before `depends_on`.
    fn add_checkpoint_dependency(&self, checkpoint: Checkpoint, depends_on: Checkpoint);
}
