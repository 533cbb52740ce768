//! Transient image cache and aliasing.
//!
//! Images live here across frames; who used them is re-recorded every frame. A node
//! that went a whole frame without a usage is destroyed by the end-of-frame sweep.

use crate::checkpoint;
use crate::checkpoint::UsageSpan;
use crate::format::Format;
use crate::graph::ResponseSerial;
use crate::handle::Checkpoint;
use crate::handle::ContextHandle;
use crate::handle::ImageHandle;
use crate::traits::RenderBackend;
use crate::util::hash_combine;
use crate::util::LOG_TARGET;
use bitflags::bitflags;
use fxhash::FxBuildHasher;
use fxhash::FxHashMap;
use log::debug;
use log::error;
use smallvec::SmallVec;

/// Name attached to every image the cache creates, so captures and validation layers
/// can tell pooled render targets from application resources.
const CACHED_IMAGE_TRACKING_NAME: &str = "render_graph_cached_image";

bitflags! {
    /// Capabilities requested for a transient image.
    pub struct ImageUsageFlags: u32 {
        /// The image can be attached to a frame buffer. Every transient image must
        /// carry this; the cache manages render targets and nothing else.
        const RENDER_TARGET = 0b01;
        /// The image can be bound for sampling by a later pass.
        const SAMPLED = 0b10;
    }
}

/// Description of a transient image.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ImageDescription {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Array layer count.
    pub layers: u32,
    /// Must be 1: mip chains make no sense for transient render targets.
    pub mips: u32,
    pub usage: ImageUsageFlags,
    /// Name forwarded to backend tooling. Replaced with a stable pool name when the
    /// cache creates the image.
    pub tracking_name: &'static str,
}

impl ImageDescription {
    /// Single-layer 2D render target.
    pub fn render_target_2d(format: Format, width: u32, height: u32) -> ImageDescription {
        ImageDescription {
            format,
            width,
            height,
            depth: 1,
            layers: 1,
            mips: 1,
            usage: ImageUsageFlags::RENDER_TARGET,
            tracking_name: "",
        }
    }

    /// Same target, also sampled by a later pass.
    pub fn sampled_render_target_2d(format: Format, width: u32, height: u32) -> ImageDescription {
        let mut description = ImageDescription::render_target_2d(format, width, height);
        description.usage |= ImageUsageFlags::SAMPLED;
        description
    }
}

/// One image request inside a [ResourceRequest](crate::ResourceRequest).
#[derive(Copy, Clone, Debug)]
pub struct ImageRequest {
    pub description: ImageDescription,
    /// The image is produced and consumed entirely inside the requesting pass, like an
    /// on-chip depth buffer. Internal images skip the cross-pass hazard screen and
    /// register no users, which lets the cache alias them aggressively.
    pub internal: bool,
}

impl ImageRequest {
    pub fn new(description: ImageDescription) -> ImageRequest {
        ImageRequest {
            description,
            internal: false,
        }
    }

    pub fn internal(description: ImageDescription) -> ImageRequest {
        ImageRequest {
            description,
            internal: true,
        }
    }
}

/// A dependant of the response currently being resolved, reduced to what the cache
/// needs: its identity for the hazard screen and its end checkpoint for injected
/// sequencing edges.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Dependant {
    pub serial: ResponseSerial,
    pub usage_end: Checkpoint,
}

/// Bucket key for image lookups. Only fields that must match exactly participate;
/// sample capability stays out because a more capable cached image may serve a less
/// demanding request.
pub(crate) fn description_hash(description: &ImageDescription) -> u64 {
    // Formats fit in a byte, so the layer count can sit right above without masking
    // anything relevant out of the key.
    let attributes = (description.format as u64) | (u64::from(description.layers) << 1);
    let sizes = hash_combine(
        u64::from(description.width),
        hash_combine(u64::from(description.height), u64::from(description.depth)),
    );
    hash_combine(attributes, sizes)
}

/// Usage of a cache node recorded during the current frame.
struct ImageUsage {
    /// Response the image was handed to.
    producer: ResponseSerial,
    /// That response's begin checkpoint, the target of injected sequencing edges when
    /// the node is aliased again later in the frame.
    producer_begin: Checkpoint,
    /// Responses that consume what the producer renders. Empty for internal requests.
    users: SmallVec<[ResponseSerial; 4]>,
}

/// A device image owned by the cache, with this frame's usage records.
struct ImageCacheNode {
    image: ImageHandle,
    description: ImageDescription,
    /// Most recent usage last. Cleared by the end-of-frame sweep.
    usages: Vec<ImageUsage>,
}

impl ImageCacheNode {
    fn matches(&self, description: &ImageDescription) -> bool {
        self.description.format == description.format
            && self.description.width == description.width
            && self.description.height == description.height
            && self.description.depth == description.depth
            && self.description.layers == description.layers
            && (!description.usage.contains(ImageUsageFlags::SAMPLED)
                || self.description.usage.contains(ImageUsageFlags::SAMPLED))
    }

    /// One request can carry several images with identical descriptions (two G-buffer
    /// textures, say) and they must resolve to distinct device images. An image
    /// acquired for the response being built is always the node's most recent usage,
    /// so checking the last record is enough.
    fn produced_for(&self, producer: ResponseSerial) -> bool {
        self.usages
            .last()
            .map_or(false, |usage| usage.producer == producer)
    }

    /// Hazard screen: the image must not be re-aliased into a request that depends on
    /// a response already touching it this frame, in either the producer or the user
    /// role, because that dependant will still read the node's current contents.
    fn collides_with(&self, dependants: &[Dependant]) -> bool {
        self.usages.iter().any(|usage| {
            dependants.iter().any(|dependant| {
                usage.producer == dependant.serial || usage.users.contains(&dependant.serial)
            })
        })
    }
}

/// Hash-indexed set of pooled render targets.
pub(crate) struct ImageCache {
    buckets: FxHashMap<u64, SmallVec<[ImageCacheNode; 1]>>,
    len: usize,
}

impl ImageCache {
    pub(crate) fn with_capacity(capacity: usize) -> ImageCache {
        ImageCache {
            buckets: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
            len: 0,
        }
    }

    /// Number of device images currently pooled.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Returns an image satisfying `request`, reusing a pooled one when that cannot
    /// introduce a data hazard, and records the usage for this frame.
    ///
    /// `producer_span` is the span of the response being resolved. On reuse of a node
    /// that already has a usage this frame, sequencing edges are injected so the prior
    /// producer's work starts only after the new contents are no longer needed.
    pub(crate) fn acquire(
        &mut self,
        backend: &dyn RenderBackend,
        context: ContextHandle,
        request: &ImageRequest,
        producer: ResponseSerial,
        producer_span: UsageSpan,
        dependants: &[Dependant],
    ) -> Option<ImageHandle> {
        if request.description.mips > 1 {
            error!(
                target: LOG_TARGET,
                "Received image request with mips, makes no sense for render target allocation."
            );
            return None;
        }

        if !request
            .description
            .usage
            .contains(ImageUsageFlags::RENDER_TARGET)
        {
            error!(
                target: LOG_TARGET,
                "Received image request without render target usage, makes no sense for render \
                 target allocation."
            );
            return None;
        }

        let hash = description_hash(&request.description);
        let bucket = self.buckets.entry(hash).or_insert_with(SmallVec::new);

        let found = bucket.iter().position(|node| {
            node.matches(&request.description)
                && !node.produced_for(producer)
                && (request.internal || !node.collides_with(dependants))
        });

        let position = match found {
            Some(position) => position,
            None => {
                let mut description = request.description;
                description.tracking_name = CACHED_IMAGE_TRACKING_NAME;

                let image = match backend.create_image(context, &description) {
                    Some(image) => image,
                    None => {
                        error!(target: LOG_TARGET, "Failed to create new image for render graph.");
                        return None;
                    }
                };

                debug!(
                    target: LOG_TARGET,
                    "Allocating new cached image {:?} {}x{}x{} (layers: {}, usage: {:?})",
                    description.format,
                    description.width,
                    description.height,
                    description.depth,
                    description.layers,
                    description.usage
                );

                self.len += 1;
                bucket.push(ImageCacheNode {
                    image,
                    description,
                    usages: Vec::new(),
                });
                bucket.len() - 1
            }
        };

        let node = &mut bucket[position];

        // The usage is recorded even though a later image of the same request may still
        // fail. A record left behind by a failed request is harmless: the response is
        // never published, so the record is an inert entry with checkpoints nothing
        // depends on, and the sweep collects it with everything else.
        let users: SmallVec<[ResponseSerial; 4]> = if request.internal {
            SmallVec::new()
        } else {
            dependants.iter().map(|dependant| dependant.serial).collect()
        };

        // Reusing a node that already has a producer this frame means deliberately
        // giving up parallelism. Left alone, independent passes (think per-viewport
        // shadow maps in a split screen) would stay maximally parallel on the GPU
        // timeline, each with its own image. The chance that the GPU actually profits
        // from that breadth is slim, while the memory cost is very real, so the cache
        // sequences the prior producer after the new contents are consumed and reuses
        // its storage.
        if let Some(prior) = node.usages.last() {
            debug_assert!(
                prior.producer != producer,
                "a node just used for this response must have been rejected by the lookup"
            );

            if users.is_empty() {
                checkpoint::sequence_before(backend, producer_span.end, prior.producer_begin);
            } else {
                for dependant in dependants {
                    checkpoint::sequence_before(backend, dependant.usage_end, prior.producer_begin);
                }
            }
        }

        node.usages.push(ImageUsage {
            producer,
            producer_begin: producer_span.begin,
            users,
        });

        Some(node.image)
    }

    /// End-of-frame sweep: nodes that accrued no usage this frame are destroyed,
    /// survivors drop their usage lists for the next frame.
    pub(crate) fn sweep(&mut self, backend: &dyn RenderBackend) {
        let len = &mut self.len;
        self.buckets.retain(|_, bucket| {
            bucket.retain(|node| {
                if node.usages.is_empty() {
                    backend.destroy_image(node.image);
                    *len -= 1;
                    false
                } else {
                    node.usages.clear();
                    true
                }
            });
            !bucket.is_empty()
        });
    }

    /// Destroys every pooled image. Final teardown only.
    pub(crate) fn clear(&mut self, backend: &dyn RenderBackend) {
        for (_, bucket) in self.buckets.drain() {
            for node in bucket {
                backend.destroy_image(node.image);
            }
        }
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    fn depth_description() -> ImageDescription {
        ImageDescription::render_target_2d(Format::D32_SFLOAT, 2048, 2048)
    }

    #[test]
    fn hash_ignores_sample_capability() {
        let plain = depth_description();
        let mut sampled = plain;
        sampled.usage |= ImageUsageFlags::SAMPLED;
        assert_eq!(description_hash(&plain), description_hash(&sampled));
    }

    #[test]
    fn hash_separates_sizes_and_layers() {
        let base = depth_description();

        let mut narrow = base;
        narrow.width = 1024;
        assert_ne!(description_hash(&base), description_hash(&narrow));

        let mut layered = base;
        layered.layers = 4;
        assert_ne!(description_hash(&base), description_hash(&layered));
    }

    fn node(description: ImageDescription) -> ImageCacheNode {
        ImageCacheNode {
            image: ImageHandle(1),
            description,
            usages: Vec::new(),
        }
    }

    #[test]
    fn sampled_node_serves_plain_request_but_not_vice_versa() {
        let plain = depth_description();
        let mut sampled = plain;
        sampled.usage |= ImageUsageFlags::SAMPLED;

        assert!(node(sampled).matches(&plain));
        assert!(!node(plain).matches(&sampled));
    }

    #[test]
    fn only_most_recent_usage_counts_as_self_collision() {
        let mut n = node(depth_description());
        let first = ResponseSerial::for_tests(1);
        let second = ResponseSerial::for_tests(2);

        n.usages.push(ImageUsage {
            producer: first,
            producer_begin: Checkpoint(10),
            users: SmallVec::new(),
        });
        n.usages.push(ImageUsage {
            producer: second,
            producer_begin: Checkpoint(20),
            users: SmallVec::new(),
        });

        assert!(n.produced_for(second));
        assert!(!n.produced_for(first));
    }

    #[test]
    fn hazard_screen_sees_both_roles() {
        let mut n = node(depth_description());
        let producer = ResponseSerial::for_tests(1);
        let user = ResponseSerial::for_tests(2);
        let unrelated = ResponseSerial::for_tests(3);

        let mut users = SmallVec::new();
        users.push(user);
        n.usages.push(ImageUsage {
            producer,
            producer_begin: Checkpoint(10),
            users,
        });

        let dependant = |serial| Dependant {
            serial,
            usage_end: Checkpoint(99),
        };

        assert!(n.collides_with(&[dependant(producer)]));
        assert!(n.collides_with(&[dependant(user)]));
        assert!(!n.collides_with(&[dependant(unrelated)]));
    }
}
