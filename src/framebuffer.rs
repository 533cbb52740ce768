//! Frame buffer cache.
//!
//! Frame buffers are cheap to keep and expensive to churn, so they survive across
//! frames as long as the exact same (pass, attachments) combination keeps being
//! requested. A single mark bit per node drives eviction: set on every hit or
//! creation, cleared by the sweep, and a node found cleared at sweep time is gone.

use crate::handle::ContextHandle;
use crate::handle::FrameBufferHandle;
use crate::handle::ImageHandle;
use crate::handle::PassHandle;
use crate::traits::RenderBackend;
use crate::util::hash_combine;
use crate::util::LOG_TARGET;
use fxhash::FxBuildHasher;
use fxhash::FxHashMap;
use log::debug;
use log::error;
use smallvec::SmallVec;

const CACHED_FRAME_BUFFER_TRACKING_NAME: &str = "render_graph_cached_frame_buffer";

/// A single (image, layer) binding inside a frame buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FramebufferAttachment {
    pub image: ImageHandle,
    pub layer: u32,
}

/// Everything the backend needs to build a frame buffer.
#[derive(Copy, Clone, Debug)]
pub struct FramebufferDescription<'a> {
    pub pass: PassHandle,
    pub attachments: &'a [FramebufferAttachment],
    /// Name forwarded to backend tooling.
    pub tracking_name: &'static str,
}

/// One frame buffer request inside a [ResourceRequest](crate::ResourceRequest):
/// the pass it will be bound to plus attachments referring to image slots of the
/// same request.
#[derive(Copy, Clone, Debug)]
pub struct FramebufferRequest<'a> {
    pub pass: PassHandle,
    pub attachments: &'a [AttachmentRequest],
}

/// Reference to an image slot of the enclosing request.
#[derive(Copy, Clone, Debug)]
pub struct AttachmentRequest {
    pub image_index: usize,
    pub layer: u32,
}

fn frame_buffer_hash(pass: PassHandle, attachments: &[FramebufferAttachment]) -> u64 {
    let mut hash = pass.0;
    for attachment in attachments {
        hash = hash_combine(
            hash,
            hash_combine(attachment.image.0, u64::from(attachment.layer)),
        );
    }
    hash
}

struct FramebufferCacheNode {
    frame_buffer: FrameBufferHandle,
    pass: PassHandle,
    attachments: SmallVec<[FramebufferAttachment; 4]>,
    used_in_current_frame: bool,
}

/// Hash-indexed set of frame buffers keyed by pass and resolved attachments.
pub(crate) struct FramebufferCache {
    buckets: FxHashMap<u64, SmallVec<[FramebufferCacheNode; 1]>>,
    len: usize,
}

impl FramebufferCache {
    pub(crate) fn with_capacity(capacity: usize) -> FramebufferCache {
        FramebufferCache {
            buckets: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns the cached frame buffer for (pass, attachments), creating it on a miss,
    /// and marks it used for the current frame.
    ///
    /// Attachments are concrete image handles here: when aliasing resolved an
    /// attachment to a different image than last frame, the lookup naturally misses
    /// and a fresh frame buffer is built against the new image.
    pub(crate) fn acquire(
        &mut self,
        backend: &dyn RenderBackend,
        context: ContextHandle,
        pass: PassHandle,
        attachments: &[FramebufferAttachment],
    ) -> Option<FrameBufferHandle> {
        let hash = frame_buffer_hash(pass, attachments);
        let bucket = self.buckets.entry(hash).or_insert_with(SmallVec::new);

        let found = bucket
            .iter()
            .position(|node| node.pass == pass && node.attachments[..] == *attachments);

        let position = match found {
            Some(position) => position,
            None => {
                let description = FramebufferDescription {
                    pass,
                    attachments,
                    tracking_name: CACHED_FRAME_BUFFER_TRACKING_NAME,
                };

                let frame_buffer = match backend.create_frame_buffer(context, &description) {
                    Some(frame_buffer) => frame_buffer,
                    None => {
                        error!(
                            target: LOG_TARGET,
                            "Failed to create new frame buffer for render graph."
                        );
                        return None;
                    }
                };

                debug!(
                    target: LOG_TARGET,
                    "Allocating new cached frame buffer for pass {:?} with {} attachment(s)",
                    pass,
                    attachments.len()
                );

                self.len += 1;
                bucket.push(FramebufferCacheNode {
                    frame_buffer,
                    pass,
                    attachments: SmallVec::from_slice(attachments),
                    used_in_current_frame: false,
                });
                bucket.len() - 1
            }
        };

        let node = &mut bucket[position];
        node.used_in_current_frame = true;
        Some(node.frame_buffer)
    }

    /// End-of-frame sweep: destroys nodes that were not requested this frame and
    /// clears the mark on the rest.
    pub(crate) fn sweep(&mut self, backend: &dyn RenderBackend) {
        let len = &mut self.len;
        self.buckets.retain(|_, bucket| {
            bucket.retain(|node| {
                if node.used_in_current_frame {
                    node.used_in_current_frame = false;
                    true
                } else {
                    backend.destroy_frame_buffer(node.frame_buffer);
                    *len -= 1;
                    false
                }
            });
            !bucket.is_empty()
        });
    }

    /// Destroys every cached frame buffer. Final teardown only.
    pub(crate) fn clear(&mut self, backend: &dyn RenderBackend) {
        for (_, bucket) in self.buckets.drain() {
            for node in bucket {
                backend.destroy_frame_buffer(node.frame_buffer);
            }
        }
        self.len = 0;
    }
}
