use glam::Vec4;
use glcache_types::{
    BlendMode, BufferTarget, CullMode, DepthFunc, FramebufferTarget, PolygonOffset, RawBufferHandle,
    RawFramebufferHandle, RawProgramHandle, RawTextureHandle, RawVertexArrayHandle, Rect, TextureTarget,
    VertexElement,
};

/// Limits the context reports for the binding slots the state cache tracks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BackendLimits {
    pub texture_units: u32,
    pub vertex_attributes: u32,
}

/// The raw, stateful graphics API.
///
/// Every method maps to a single call on the underlying context. Implementations
/// must not cache anything themselves; [`StateCache`](crate::StateCache) decides
/// which calls are necessary and owns the only copy of the believed state.
///
/// Handle allocation may recycle values of released handles, exactly like a real
/// driver does. A `create_*` method returning the invalid handle (zero) signals
/// allocation failure.
pub trait GraphicsBackend {
    fn limits(&self) -> BackendLimits;

    fn create_texture(&mut self) -> RawTextureHandle;
    fn create_buffer(&mut self) -> RawBufferHandle;
    fn create_program(&mut self) -> RawProgramHandle;
    fn create_vertex_array(&mut self) -> RawVertexArrayHandle;
    fn create_framebuffer(&mut self) -> RawFramebufferHandle;

    fn delete_texture(&mut self, handle: RawTextureHandle);
    fn delete_buffer(&mut self, handle: RawBufferHandle);
    fn delete_program(&mut self, handle: RawProgramHandle);
    fn delete_vertex_array(&mut self, handle: RawVertexArrayHandle);
    fn delete_framebuffer(&mut self, handle: RawFramebufferHandle);

    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, target: TextureTarget, handle: RawTextureHandle);
    fn bind_buffer(&mut self, target: BufferTarget, handle: RawBufferHandle);
    fn bind_vertex_array(&mut self, handle: RawVertexArrayHandle);
    fn use_program(&mut self, handle: RawProgramHandle);
    fn bind_framebuffer(&mut self, target: FramebufferTarget, handle: RawFramebufferHandle);

    fn set_vertex_attrib_enabled(&mut self, location: u32, enabled: bool);
    /// Points `element` into the currently bound vertex buffer, `base_offset` bytes in.
    fn vertex_attrib_pointer(&mut self, element: &VertexElement, stride: u32, base_offset: u64);

    fn set_blend_enabled(&mut self, enabled: bool);
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn set_cull_mode(&mut self, mode: CullMode);
    fn set_depth_test_enabled(&mut self, enabled: bool);
    fn set_depth_func(&mut self, func: DepthFunc);
    fn set_depth_mask(&mut self, enabled: bool);
    fn set_polygon_offset_fill_enabled(&mut self, enabled: bool);
    fn set_polygon_offset(&mut self, offset: PolygonOffset);
    fn set_wireframe(&mut self, enabled: bool);
    fn set_scissor_test_enabled(&mut self, enabled: bool);
    fn set_scissor(&mut self, rect: Rect);
    fn set_viewport(&mut self, rect: Rect);
    fn set_clear_color(&mut self, color: Vec4);
}
