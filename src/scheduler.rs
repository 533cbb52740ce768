//! Frame scheduling: device selection, frame advancement and cache collection.

use crate::graph::RenderGraph;
use crate::handle::ContextHandle;
use crate::traits::DeviceInfo;
use crate::traits::DeviceType;
use crate::traits::RenderBackend;
use crate::util::LOG_TARGET;
use log::warn;
use std::sync::Arc;

/// Render context state shared with everything that records render work.
///
/// Owned by the scheduler and rewritten once per frame, outside of the parallel
/// section of the frame, so pass code can read it without synchronisation.
#[derive(Clone, Debug, Default)]
pub struct RenderContext {
    /// Backend context every resource creation goes through. `None` until the first
    /// frame was scheduled.
    pub context: Option<ContextHandle>,
    /// Device picked either by the application or by automatic selection.
    pub selected_device: Option<DeviceInfo>,
    /// Whether the backend accepted the current frame. When false, pass code should
    /// skip recording entirely and try again next frame.
    pub frame_scheduled: bool,
}

/// The once-per-frame driver of the resource management core.
pub struct FrameScheduler {
    backend: Arc<dyn RenderBackend>,
    context: RenderContext,
}

impl FrameScheduler {
    pub fn new(backend: Arc<dyn RenderBackend>) -> FrameScheduler {
        FrameScheduler {
            backend,
            context: RenderContext::default(),
        }
    }

    /// The context state as of the last [schedule_frame](FrameScheduler::schedule_frame).
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Runs the per-frame sequence: make sure a device is selected, advance the
    /// backend to the next frame, then let the graph drop whatever last frame did not
    /// touch.
    ///
    /// Must run while no pass is using `graph`; the collection invalidates every
    /// response handed out during the previous frame.
    pub fn schedule_frame(&mut self, graph: &mut RenderGraph) {
        self.ensure_device_selected();

        let context = self.backend.render_context();
        self.context.context = Some(context);
        self.context.frame_scheduled = self.backend.begin_next_frame(context);

        graph.collect_unused();
    }

    /// Picks a device when the application has not done so itself, preferring a
    /// discrete GPU and falling back to the first enumerated one.
    ///
    /// Panics when no device exists or selection fails: nothing downstream of the
    /// scheduler can run without a device, so there is no point limping on.
    fn ensure_device_selected(&mut self) {
        if self.backend.selected_device_info().is_none() {
            warn!(
                target: LOG_TARGET,
                "Device selection wasn't done prior to frame scheduling. Automatically selecting \
                 device, prioritizing discrete one."
            );

            let devices = self.backend.enumerate_devices();
            let device = devices
                .iter()
                .find(|device| device.device_type == DeviceType::DiscreteGpu)
                .or_else(|| devices.first());

            let device = match device {
                Some(device) => device,
                None => panic!("Unable to find suitable device for render frame scheduling."),
            };

            warn!(target: LOG_TARGET, "Selecting device \"{}\".", device.name);
            if !self.backend.select_device(device.id) {
                panic!("Failed to select appropriate device for render.");
            }
        }

        self.context.selected_device = self.backend.selected_device_info();
    }
}
