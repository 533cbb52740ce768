#![allow(dead_code)]

//! Recording backend used by the behavioral tests.
//!
//! Hands out fresh handles for everything and keeps a journal of creations,
//! destructions and checkpoint edges so tests can assert on what the core actually
//! asked the backend to do.

use render_graph::Checkpoint;
use render_graph::ContextHandle;
use render_graph::DeviceId;
use render_graph::DeviceInfo;
use render_graph::DeviceType;
use render_graph::FrameBufferHandle;
use render_graph::FramebufferAttachment;
use render_graph::FramebufferDescription;
use render_graph::ImageDescription;
use render_graph::ImageHandle;
use render_graph::PassHandle;
use render_graph::RenderBackend;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

pub const CONTEXT: ContextHandle = ContextHandle(1);

#[derive(Default)]
pub struct TestState {
    pub created_images: Vec<(ImageHandle, ImageDescription)>,
    pub destroyed_images: Vec<ImageHandle>,
    pub created_frame_buffers: Vec<(FrameBufferHandle, PassHandle, Vec<FramebufferAttachment>)>,
    pub destroyed_frame_buffers: Vec<FrameBufferHandle>,
    pub checkpoints: Vec<Checkpoint>,
    /// (checkpoint, depends_on) pairs in insertion order.
    pub edges: Vec<(Checkpoint, Checkpoint)>,
    pub selected_device: Option<DeviceId>,
    pub frames_begun: u64,
}

pub struct TestBackend {
    devices: Vec<DeviceInfo>,
    next_handle: AtomicU64,
    pub fail_image_creation: AtomicBool,
    pub fail_frame_buffer_creation: AtomicBool,
    pub fail_device_selection: AtomicBool,
    pub fail_next_frame: AtomicBool,
    pub state: Mutex<TestState>,
}

impl TestBackend {
    /// Backend with a single discrete GPU, which is all most tests need.
    pub fn new() -> TestBackend {
        TestBackend::with_devices(vec![DeviceInfo {
            id: DeviceId(1),
            name: String::from("test-discrete"),
            device_type: DeviceType::DiscreteGpu,
        }])
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> TestBackend {
        TestBackend {
            devices,
            next_handle: AtomicU64::new(1),
            fail_image_creation: AtomicBool::new(false),
            fail_frame_buffer_creation: AtomicBool::new(false),
            fail_device_selection: AtomicBool::new(false),
            fail_next_frame: AtomicBool::new(false),
            state: Mutex::new(TestState::default()),
        }
    }

    fn fresh_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub fn has_edge(&self, checkpoint: Checkpoint, depends_on: Checkpoint) -> bool {
        self.state
            .lock()
            .unwrap()
            .edges
            .contains(&(checkpoint, depends_on))
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().unwrap().edges.len()
    }

    pub fn created_image_count(&self) -> usize {
        self.state.lock().unwrap().created_images.len()
    }

    pub fn destroyed_image_count(&self) -> usize {
        self.state.lock().unwrap().destroyed_images.len()
    }
}

impl RenderBackend for TestBackend {
    fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }

    fn select_device(&self, device: DeviceId) -> bool {
        if self.fail_device_selection.load(Ordering::Relaxed) {
            return false;
        }
        if self.devices.iter().any(|info| info.id == device) {
            self.state.lock().unwrap().selected_device = Some(device);
            true
        } else {
            false
        }
    }

    fn selected_device_info(&self) -> Option<DeviceInfo> {
        let selected = self.state.lock().unwrap().selected_device?;
        self.devices.iter().find(|info| info.id == selected).cloned()
    }

    fn render_context(&self) -> ContextHandle {
        CONTEXT
    }

    fn begin_next_frame(&self, _context: ContextHandle) -> bool {
        self.state.lock().unwrap().frames_begun += 1;
        !self.fail_next_frame.load(Ordering::Relaxed)
    }

    fn create_image(
        &self,
        _context: ContextHandle,
        description: &ImageDescription,
    ) -> Option<ImageHandle> {
        if self.fail_image_creation.load(Ordering::Relaxed) {
            return None;
        }
        let image = ImageHandle(self.fresh_handle());
        self.state
            .lock()
            .unwrap()
            .created_images
            .push((image, *description));
        Some(image)
    }

    fn destroy_image(&self, image: ImageHandle) {
        self.state.lock().unwrap().destroyed_images.push(image);
    }

    fn create_frame_buffer(
        &self,
        _context: ContextHandle,
        description: &FramebufferDescription<'_>,
    ) -> Option<FrameBufferHandle> {
        if self.fail_frame_buffer_creation.load(Ordering::Relaxed) {
            return None;
        }
        let frame_buffer = FrameBufferHandle(self.fresh_handle());
        self.state.lock().unwrap().created_frame_buffers.push((
            frame_buffer,
            description.pass,
            description.attachments.to_vec(),
        ));
        Some(frame_buffer)
    }

    fn destroy_frame_buffer(&self, frame_buffer: FrameBufferHandle) {
        self.state
            .lock()
            .unwrap()
            .destroyed_frame_buffers
            .push(frame_buffer);
    }

    fn create_checkpoint(&self, _context: ContextHandle) -> Checkpoint {
        let checkpoint = Checkpoint(self.fresh_handle());
        self.state.lock().unwrap().checkpoints.push(checkpoint);
        checkpoint
    }

    fn add_checkpoint_dependency(&self, checkpoint: Checkpoint, depends_on: Checkpoint) {
        self.state
            .lock()
            .unwrap()
            .edges
            .push((checkpoint, depends_on));
    }
}
