use glam::Vec4;
use glcache_types::{
    BlendMode, BufferTarget, CullMode, DepthFunc, PolygonOffset, RawBufferHandle, RawFramebufferHandle,
    RawProgramHandle, RawTextureHandle, RawVertexArrayHandle, Rect, TextureTarget, VertexDeclaration,
};

/// Largest number of texture units the cache tracks, whatever the context reports.
pub const MAX_TEXTURE_UNITS: usize = 32;
/// Largest number of vertex attribute locations the cache tracks.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// What is bound to a single texture unit.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    pub handle: RawTextureHandle,
    pub target: TextureTarget,
}

/// The buffer and layout the current attribute pointers were specified from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexPointerSource {
    pub buffer: RawBufferHandle,
    pub declaration: VertexDeclaration,
}

/// State that belongs to a vertex array object rather than to the context.
///
/// Binding another vertex array swaps this whole block out, so it is cached per
/// vertex array by the [`StateCache`](super::StateCache).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VertexInputState {
    /// Index buffer binding. Owned by the vertex array.
    pub index_buffer: RawBufferHandle,
    /// Bit `n` is set when attribute location `n` is enabled.
    pub enabled_attributes: u32,
    /// `None` when the current pointers are unknown or were specified with a base
    /// offset, which forces the next setup to re-specify them.
    pub pointers: Option<VertexPointerSource>,
}

impl VertexInputState {
    pub fn is_attribute_enabled(&self, location: u32) -> bool {
        self.enabled_attributes & (1 << location) != 0
    }

    pub(crate) fn set_attribute_enabled(&mut self, location: u32, enabled: bool) {
        if enabled {
            self.enabled_attributes |= 1 << location;
        } else {
            self.enabled_attributes &= !(1 << location);
        }
    }

    pub(crate) fn buffer_deleted(&mut self, handle: RawBufferHandle, index: bool) {
        if index && self.index_buffer == handle {
            self.index_buffer = RawBufferHandle::INVALID;
        }
        if !index && matches!(self.pointers, Some(ref p) if p.buffer == handle) {
            self.pointers = None;
        }
    }
}

/// Everything the context is believed to have bound or enabled.
///
/// Obtained through [`StateCache::current_state`](super::StateCache::current_state).
/// Equality is exact: two snapshots compare equal only if every slot and toggle
/// matches.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedState {
    pub active_texture_unit: u32,
    pub textures: [TextureBinding; MAX_TEXTURE_UNITS],
    pub vertex_buffer: RawBufferHandle,
    pub uniform_buffer: RawBufferHandle,
    pub vertex_array: RawVertexArrayHandle,
    /// Input state of `vertex_array`.
    pub vertex_input: VertexInputState,
    pub program: RawProgramHandle,
    pub draw_framebuffer: RawFramebufferHandle,
    pub read_framebuffer: RawFramebufferHandle,

    pub blend: bool,
    pub blend_mode: BlendMode,
    pub depth_test: bool,
    pub depth_func: DepthFunc,
    pub depth_mask: bool,
    pub cull_mode: CullMode,
    pub polygon_offset_fill: bool,
    pub polygon_offset: PolygonOffset,
    pub wireframe: bool,
    pub clip: bool,
    pub clip_rect: Rect,
    pub viewport: Rect,
    pub clear_color: Vec4,
}

impl CachedState {
    pub fn texture(&self, unit: u32) -> TextureBinding {
        self.textures[unit as usize]
    }

    pub fn buffer(&self, target: BufferTarget) -> RawBufferHandle {
        match target {
            BufferTarget::Vertex => self.vertex_buffer,
            BufferTarget::Index => self.vertex_input.index_buffer,
            BufferTarget::Uniform => self.uniform_buffer,
        }
    }

    pub(crate) fn buffer_mut(&mut self, target: BufferTarget) -> &mut RawBufferHandle {
        match target {
            BufferTarget::Vertex => &mut self.vertex_buffer,
            BufferTarget::Index => &mut self.vertex_input.index_buffer,
            BufferTarget::Uniform => &mut self.uniform_buffer,
        }
    }

    pub(crate) fn texture_deleted(&mut self, handle: RawTextureHandle) {
        for binding in self.textures.iter_mut().filter(|b| b.handle == handle) {
            binding.handle = RawTextureHandle::INVALID;
        }
    }

    pub(crate) fn vertex_buffer_deleted(&mut self, handle: RawBufferHandle) {
        if self.vertex_buffer == handle {
            self.vertex_buffer = RawBufferHandle::INVALID;
        }
        self.vertex_input.buffer_deleted(handle, false);
    }

    pub(crate) fn index_buffer_deleted(&mut self, handle: RawBufferHandle) {
        self.vertex_input.buffer_deleted(handle, true);
    }

    pub(crate) fn uniform_buffer_deleted(&mut self, handle: RawBufferHandle) {
        if self.uniform_buffer == handle {
            self.uniform_buffer = RawBufferHandle::INVALID;
        }
    }

    pub(crate) fn program_deleted(&mut self, handle: RawProgramHandle) {
        if self.program == handle {
            self.program = RawProgramHandle::INVALID;
        }
    }

    /// Only for snapshots. The live state also needs the default vertex array's
    /// input state, which the [`StateCache`](super::StateCache) keeps.
    pub(crate) fn vertex_array_deleted(&mut self, handle: RawVertexArrayHandle) {
        if self.vertex_array == handle {
            self.vertex_array = RawVertexArrayHandle::INVALID;
            self.vertex_input = VertexInputState::default();
        }
    }

    pub(crate) fn framebuffer_deleted(&mut self, handle: RawFramebufferHandle) {
        if self.draw_framebuffer == handle {
            self.draw_framebuffer = RawFramebufferHandle::INVALID;
        }
        if self.read_framebuffer == handle {
            self.read_framebuffer = RawFramebufferHandle::INVALID;
        }
    }
}

impl Default for CachedState {
    fn default() -> Self {
        Self {
            active_texture_unit: 0,
            textures: [TextureBinding::default(); MAX_TEXTURE_UNITS],
            vertex_buffer: RawBufferHandle::INVALID,
            uniform_buffer: RawBufferHandle::INVALID,
            vertex_array: RawVertexArrayHandle::INVALID,
            vertex_input: VertexInputState::default(),
            program: RawProgramHandle::INVALID,
            draw_framebuffer: RawFramebufferHandle::INVALID,
            read_framebuffer: RawFramebufferHandle::INVALID,
            blend: false,
            blend_mode: BlendMode::default(),
            depth_test: false,
            depth_func: DepthFunc::default(),
            depth_mask: true,
            cull_mode: CullMode::default(),
            polygon_offset_fill: false,
            polygon_offset: PolygonOffset::default(),
            wireframe: false,
            clip: false,
            clip_rect: Rect::default(),
            viewport: Rect::default(),
            clear_color: Vec4::ZERO,
        }
    }
}
