//! The resource management core: the `request` entry point and per-frame collection.

use crate::arena::FrameArena;
use crate::checkpoint;
use crate::checkpoint::UsageSpan;
use crate::framebuffer::FramebufferAttachment;
use crate::framebuffer::FramebufferCache;
use crate::framebuffer::FramebufferRequest;
use crate::handle::Checkpoint;
use crate::handle::ContextHandle;
use crate::handle::FrameBufferHandle;
use crate::handle::ImageHandle;
use crate::image::Dependant;
use crate::image::ImageCache;
use crate::image::ImageRequest;
use crate::traits::RenderBackend;
use crate::util::LOG_TARGET;
use config::Config;
use log::error;
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::Mutex;

const DEFAULT_ARENA_CAPACITY: u64 = 256;
const DEFAULT_CACHE_CAPACITY: u64 = 64;

/// Frame-unique identity of a response.
///
/// Cache records compare serials instead of addresses, so they can refer to responses
/// without keeping borrows into the per-frame arena alive.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct ResponseSerial(u64);

impl ResponseSerial {
    #[cfg(test)]
    pub(crate) fn for_tests(value: u64) -> ResponseSerial {
        ResponseSerial(value)
    }
}

/// Everything a pass instance gets back from [RenderGraph::request].
///
/// The borrow is valid until the next end-of-frame collection; nothing in here may be
/// stashed across frames.
#[derive(Debug)]
pub struct GraphResponse {
    serial: ResponseSerial,
    span: UsageSpan,
    images: SmallVec<[ImageHandle; 4]>,
    frame_buffers: SmallVec<[FrameBufferHandle; 2]>,
}

impl GraphResponse {
    /// Checkpoint the pass instance must schedule itself after.
    pub fn usage_begin(&self) -> Checkpoint {
        self.span.begin
    }

    /// Checkpoint the pass instance signals when its GPU work is done.
    pub fn usage_end(&self) -> Checkpoint {
        self.span.end
    }

    /// Device images, one per entry of the request's image array, in order.
    pub fn images(&self) -> &[ImageHandle] {
        &self.images
    }

    /// Frame buffers, one per entry of the request's frame buffer array, in order.
    pub fn frame_buffers(&self) -> &[FrameBufferHandle] {
        &self.frame_buffers
    }

    pub(crate) fn serial(&self) -> ResponseSerial {
        self.serial
    }
}

/// A pass instance's transient resource needs for the current frame.
pub struct ResourceRequest<'a, 'g> {
    pub context: ContextHandle,
    pub images: &'a [ImageRequest],
    pub frame_buffers: &'a [FramebufferRequest<'a>],
    /// Responses of passes that consume this pass's output. The new response is
    /// ordered strictly before every dependant on the GPU timeline, which is why
    /// consumers request their resources first and producers last.
    pub dependants: &'a [&'g GraphResponse],
}

struct Caches {
    images: ImageCache,
    frame_buffers: FramebufferCache,
    next_serial: u64,
}

/// Per-frame transient resource manager.
///
/// Pass instances call [request](RenderGraph::request) any time between two frame
/// schedules; the scheduler calls [collect_unused](RenderGraph::collect_unused) once
/// per frame. All mutable state sits behind a single lock held for the entirety of
/// each request: requests are short and cheap, and one coarse lock removes a whole
/// class of ordering bugs that fine-grained locking would invite.
pub struct RenderGraph {
    backend: Arc<dyn RenderBackend>,
    caches: Mutex<Caches>,
    arena: FrameArena<GraphResponse>,
}

impl RenderGraph {
    pub fn new(backend: Arc<dyn RenderBackend>) -> RenderGraph {
        RenderGraph::with_config(backend, &Config::default())
    }

    /// Tuning knobs read from `cfg`: `graph.arena_capacity` (responses the per-frame
    /// arena holds before growing) and `graph.cache_capacity` (initial bucket count of
    /// both caches).
    pub fn with_config(backend: Arc<dyn RenderBackend>, cfg: &Config) -> RenderGraph {
        let arena_capacity = cfg
            .get::<u64>("graph.arena_capacity")
            .unwrap_or(DEFAULT_ARENA_CAPACITY) as usize;
        let cache_capacity = cfg
            .get::<u64>("graph.cache_capacity")
            .unwrap_or(DEFAULT_CACHE_CAPACITY) as usize;

        RenderGraph {
            backend,
            caches: Mutex::new(Caches {
                images: ImageCache::with_capacity(cache_capacity),
                frame_buffers: FramebufferCache::with_capacity(cache_capacity),
                next_serial: 0,
            }),
            arena: FrameArena::with_capacity(arena_capacity),
        }
    }

    /// Resolves a pass instance's transient resource needs.
    ///
    /// On success the response borrow stays valid until the next
    /// [collect_unused](RenderGraph::collect_unused). `None` means validation or a
    /// backend allocation failed; the error has been logged and the caller decides
    /// whether to skip the pass. Work already done for a failing request (checkpoint
    /// edges, usage records) is not rolled back: the response is never published, so
    /// nothing can reach it, and the arena reset reclaims it with the frame.
    ///
    /// Concurrent callers serialise on the internal lock for the whole call.
    pub fn request<'g>(&'g self, request: &ResourceRequest<'_, 'g>) -> Option<&'g GraphResponse> {
        let mut caches = self.caches.lock().unwrap();
        let caches = &mut *caches;
        let backend = self.backend.as_ref();

        let serial = ResponseSerial(caches.next_serial);
        caches.next_serial += 1;

        let span = UsageSpan::create(backend, request.context);
        for dependant in request.dependants {
            checkpoint::sequence_before(backend, span.end, dependant.usage_begin());
        }

        let dependants: SmallVec<[Dependant; 4]> = request
            .dependants
            .iter()
            .map(|dependant| Dependant {
                serial: dependant.serial(),
                usage_end: dependant.usage_end(),
            })
            .collect();

        let response = self.arena.alloc(GraphResponse {
            serial,
            span,
            images: SmallVec::new(),
            frame_buffers: SmallVec::new(),
        });

        for image_request in request.images {
            let image = caches.images.acquire(
                backend,
                request.context,
                image_request,
                serial,
                span,
                &dependants,
            )?;
            response.images.push(image);
        }

        for frame_buffer_request in request.frame_buffers {
            let mut attachments: SmallVec<[FramebufferAttachment; 8]> = SmallVec::new();
            for attachment in frame_buffer_request.attachments {
                match response.images.get(attachment.image_index) {
                    Some(&image) => attachments.push(FramebufferAttachment {
                        image,
                        layer: attachment.layer,
                    }),
                    None => {
                        error!(
                            target: LOG_TARGET,
                            "Frame buffer attachment references image index {} outside of the \
                             request.",
                            attachment.image_index
                        );
                        return None;
                    }
                }
            }

            let frame_buffer = caches.frame_buffers.acquire(
                backend,
                request.context,
                frame_buffer_request.pass,
                &attachments,
            )?;
            response.frame_buffers.push(frame_buffer);
        }

        Some(response)
    }

    /// End-of-frame collection: destroys cache entries untouched this frame and
    /// releases every per-frame allocation.
    ///
    /// Takes `&mut self` because it invalidates all response borrows handed out since
    /// the previous collection.
    pub fn collect_unused(&mut self) {
        let caches = self.caches.get_mut().unwrap();
        caches.images.sweep(self.backend.as_ref());
        caches.frame_buffers.sweep(self.backend.as_ref());
        self.arena.reset();
    }

    /// Number of device images currently pooled.
    pub fn cached_image_count(&self) -> usize {
        self.caches.lock().unwrap().images.len()
    }

    /// Number of frame buffers currently cached.
    pub fn cached_frame_buffer_count(&self) -> usize {
        self.caches.lock().unwrap().frame_buffers.len()
    }

    /// Number of responses allocated since the last collection.
    pub fn live_response_count(&self) -> usize {
        self.arena.len()
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        if let Ok(caches) = self.caches.get_mut() {
            caches.images.clear(self.backend.as_ref());
            caches.frame_buffers.clear(self.backend.as_ref());
        }
    }
}
