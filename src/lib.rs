//! Transient resource management for a render graph.
//!
//! Once per frame, pass instances describe what they need (transient images, frame
//! buffers binding those images to a pass, and ordering constraints against other pass
//! instances) and the core answers with concrete device resources plus a pair of
//! checkpoints bounding the pass on the GPU timeline. Behind the single
//! [request](RenderGraph::request) call sit four cooperating pieces:
//!
//! * an image cache that aliases transient render targets between passes whenever
//!   reuse cannot introduce a data hazard, deliberately trading speculative GPU
//!   parallelism for memory;
//! * a frame buffer cache with one-frame mark-and-sweep eviction;
//! * a thin wrapper over backend checkpoints encoding happens-before ordering;
//! * a per-frame arena that owns every response and dies at the frame boundary.
//!
//! The [FrameScheduler] drives the whole thing: it selects a device if the
//! application did not, advances the backend to the next frame, and evicts whatever
//! the previous frame left untouched. The GPU backend itself stays behind the
//! [RenderBackend] trait object; the core never allocates device memory, never
//! records commands, and never decides which passes exist.

pub mod arena;
pub mod checkpoint;
pub mod format;
pub mod framebuffer;
pub mod graph;
pub mod handle;
pub mod image;
pub mod scheduler;
pub mod traits;
mod util;

pub use self::arena::FrameArena;
pub use self::checkpoint::UsageSpan;
pub use self::format::Format;
pub use self::framebuffer::AttachmentRequest;
pub use self::framebuffer::FramebufferAttachment;
pub use self::framebuffer::FramebufferDescription;
pub use self::framebuffer::FramebufferRequest;
pub use self::graph::GraphResponse;
pub use self::graph::RenderGraph;
pub use self::graph::ResourceRequest;
pub use self::handle::Checkpoint;
pub use self::handle::ContextHandle;
pub use self::handle::DeviceId;
pub use self::handle::FrameBufferHandle;
pub use self::handle::ImageHandle;
pub use self::handle::PassHandle;
pub use self::image::ImageDescription;
pub use self::image::ImageRequest;
pub use self::image::ImageUsageFlags;
pub use self::scheduler::FrameScheduler;
pub use self::scheduler::RenderContext;
pub use self::traits::DeviceInfo;
pub use self::traits::DeviceType;
pub use self::traits::RenderBackend;
