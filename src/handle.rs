//! Opaque handles to backend-owned objects.
//!
//! The core stores, compares and hashes these values; it never looks inside them.
//! A handle is only meaningful to the backend that issued it, and destroying the
//! underlying object is always the backend's job.

/// Device image created through [RenderBackend::create_image](crate::RenderBackend::create_image).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ImageHandle(pub u64);

/// Frame buffer created through [RenderBackend::create_frame_buffer](crate::RenderBackend::create_frame_buffer).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FrameBufferHandle(pub u64);

/// A render pass registered with the backend. The core never creates passes, it only
/// keys frame buffers by them.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PassHandle(pub u64);

/// A synchronisation point on the GPU timeline. Edges between checkpoints express
/// happens-before; the backend owns the adjacency data.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Checkpoint(pub u64);

/// The backend render context resource creation goes through.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ContextHandle(pub u64);

/// Identifier of a device enumerated by the backend.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeviceId(pub u64);
