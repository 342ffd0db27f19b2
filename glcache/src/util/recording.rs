//! Headless backend that records every call it receives.
//!
//! Used by the test suites, and usable by downstream crates that want to assert on
//! the exact call stream their render loop produces without a GPU.

use glam::Vec4;
use glcache_types::{
    BlendMode, BufferTarget, CullMode, DepthFunc, FramebufferTarget, PolygonOffset, RawBufferHandle,
    RawFramebufferHandle, RawHandle, RawProgramHandle, RawTextureHandle, RawVertexArrayHandle, Rect, TextureTarget,
    VertexElement,
};

use crate::backend::{BackendLimits, GraphicsBackend};

/// One call received by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateTexture(RawTextureHandle),
    CreateBuffer(RawBufferHandle),
    CreateProgram(RawProgramHandle),
    CreateVertexArray(RawVertexArrayHandle),
    CreateFramebuffer(RawFramebufferHandle),
    DeleteTexture(RawTextureHandle),
    DeleteBuffer(RawBufferHandle),
    DeleteProgram(RawProgramHandle),
    DeleteVertexArray(RawVertexArrayHandle),
    DeleteFramebuffer(RawFramebufferHandle),
    ActiveTexture(u32),
    BindTexture(TextureTarget, RawTextureHandle),
    BindBuffer(BufferTarget, RawBufferHandle),
    BindVertexArray(RawVertexArrayHandle),
    UseProgram(RawProgramHandle),
    BindFramebuffer(FramebufferTarget, RawFramebufferHandle),
    VertexAttribEnabled(u32, bool),
    VertexAttribPointer {
        element: VertexElement,
        stride: u32,
        base_offset: u64,
    },
    BlendEnabled(bool),
    BlendMode(BlendMode),
    CullMode(CullMode),
    DepthTestEnabled(bool),
    DepthFunc(DepthFunc),
    DepthMask(bool),
    PolygonOffsetFillEnabled(bool),
    PolygonOffset(PolygonOffset),
    Wireframe(bool),
    ScissorTestEnabled(bool),
    Scissor(Rect),
    Viewport(Rect),
    ClearColor(Vec4),
}

impl BackendCall {
    /// Whether the call changes binding or toggle state, as opposed to allocating
    /// or releasing an object.
    pub fn is_state_change(&self) -> bool {
        !matches!(
            self,
            Self::CreateTexture(_)
                | Self::CreateBuffer(_)
                | Self::CreateProgram(_)
                | Self::CreateVertexArray(_)
                | Self::CreateFramebuffer(_)
                | Self::DeleteTexture(_)
                | Self::DeleteBuffer(_)
                | Self::DeleteProgram(_)
                | Self::DeleteVertexArray(_)
                | Self::DeleteFramebuffer(_)
        )
    }
}

/// Per-kind name allocator. Released names are handed out again, most recent first,
/// the way drivers recycle object names.
#[derive(Debug, Default)]
struct NamePool {
    max_allocated: u32,
    freelist: Vec<u32>,
}

impl NamePool {
    fn allocate<T>(&mut self) -> RawHandle<T> {
        let idx = self.freelist.pop().unwrap_or_else(|| {
            self.max_allocated += 1;
            self.max_allocated
        });
        RawHandle::new(idx)
    }

    fn release<T>(&mut self, handle: RawHandle<T>) {
        debug_assert!(handle.is_valid(), "Released the invalid handle");
        debug_assert!(
            !self.freelist.contains(&handle.idx),
            "Handle {} released twice",
            handle.idx
        );
        self.freelist.push(handle.idx);
    }
}

/// A [`GraphicsBackend`] with no GPU behind it.
#[derive(Debug)]
pub struct RecordingBackend {
    limits: BackendLimits,
    calls: Vec<BackendCall>,
    textures: NamePool,
    buffers: NamePool,
    programs: NamePool,
    vertex_arrays: NamePool,
    framebuffers: NamePool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_limits(BackendLimits {
            texture_units: 16,
            vertex_attributes: 16,
        })
    }

    pub fn with_limits(limits: BackendLimits) -> Self {
        Self {
            limits,
            calls: Vec::new(),
            textures: NamePool::default(),
            buffers: NamePool::default(),
            programs: NamePool::default(),
            vertex_arrays: NamePool::default(),
            framebuffers: NamePool::default(),
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drains the recorded calls.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls that changed binding or toggle state.
    pub fn state_change_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_state_change()).count()
    }

    fn record(&mut self, call: BackendCall) {
        self.calls.push(call);
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn limits(&self) -> BackendLimits {
        self.limits
    }

    fn create_texture(&mut self) -> RawTextureHandle {
        let handle = self.textures.allocate();
        self.record(BackendCall::CreateTexture(handle));
        handle
    }

    fn create_buffer(&mut self) -> RawBufferHandle {
        let handle = self.buffers.allocate();
        self.record(BackendCall::CreateBuffer(handle));
        handle
    }

    fn create_program(&mut self) -> RawProgramHandle {
        let handle = self.programs.allocate();
        self.record(BackendCall::CreateProgram(handle));
        handle
    }

    fn create_vertex_array(&mut self) -> RawVertexArrayHandle {
        let handle = self.vertex_arrays.allocate();
        self.record(BackendCall::CreateVertexArray(handle));
        handle
    }

    fn create_framebuffer(&mut self) -> RawFramebufferHandle {
        let handle = self.framebuffers.allocate();
        self.record(BackendCall::CreateFramebuffer(handle));
        handle
    }

    fn delete_texture(&mut self, handle: RawTextureHandle) {
        self.textures.release(handle);
        self.record(BackendCall::DeleteTexture(handle));
    }

    fn delete_buffer(&mut self, handle: RawBufferHandle) {
        self.buffers.release(handle);
        self.record(BackendCall::DeleteBuffer(handle));
    }

    fn delete_program(&mut self, handle: RawProgramHandle) {
        self.programs.release(handle);
        self.record(BackendCall::DeleteProgram(handle));
    }

    fn delete_vertex_array(&mut self, handle: RawVertexArrayHandle) {
        self.vertex_arrays.release(handle);
        self.record(BackendCall::DeleteVertexArray(handle));
    }

    fn delete_framebuffer(&mut self, handle: RawFramebufferHandle) {
        self.framebuffers.release(handle);
        self.record(BackendCall::DeleteFramebuffer(handle));
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(BackendCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: TextureTarget, handle: RawTextureHandle) {
        self.record(BackendCall::BindTexture(target, handle));
    }

    fn bind_buffer(&mut self, target: BufferTarget, handle: RawBufferHandle) {
        self.record(BackendCall::BindBuffer(target, handle));
    }

    fn bind_vertex_array(&mut self, handle: RawVertexArrayHandle) {
        self.record(BackendCall::BindVertexArray(handle));
    }

    fn use_program(&mut self, handle: RawProgramHandle) {
        self.record(BackendCall::UseProgram(handle));
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, handle: RawFramebufferHandle) {
        self.record(BackendCall::BindFramebuffer(target, handle));
    }

    fn set_vertex_attrib_enabled(&mut self, location: u32, enabled: bool) {
        self.record(BackendCall::VertexAttribEnabled(location, enabled));
    }

    fn vertex_attrib_pointer(&mut self, element: &VertexElement, stride: u32, base_offset: u64) {
        self.record(BackendCall::VertexAttribPointer {
            element: *element,
            stride,
            base_offset,
        });
    }

    fn set_blend_enabled(&mut self, enabled: bool) {
        self.record(BackendCall::BlendEnabled(enabled));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.record(BackendCall::BlendMode(mode));
    }

    fn set_cull_mode(&mut self, mode: CullMode) {
        self.record(BackendCall::CullMode(mode));
    }

    fn set_depth_test_enabled(&mut self, enabled: bool) {
        self.record(BackendCall::DepthTestEnabled(enabled));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.record(BackendCall::DepthFunc(func));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.record(BackendCall::DepthMask(enabled));
    }

    fn set_polygon_offset_fill_enabled(&mut self, enabled: bool) {
        self.record(BackendCall::PolygonOffsetFillEnabled(enabled));
    }

    fn set_polygon_offset(&mut self, offset: PolygonOffset) {
        self.record(BackendCall::PolygonOffset(offset));
    }

    fn set_wireframe(&mut self, enabled: bool) {
        self.record(BackendCall::Wireframe(enabled));
    }

    fn set_scissor_test_enabled(&mut self, enabled: bool) {
        self.record(BackendCall::ScissorTestEnabled(enabled));
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.record(BackendCall::Scissor(rect));
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.record(BackendCall::Viewport(rect));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.record(BackendCall::ClearColor(color));
    }
}
