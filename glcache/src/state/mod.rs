//! Binding-state cache.
//!
//! [`StateCache`] is the single source of truth for what the graphics context
//! currently has bound and enabled. Every setter compares against the cached value,
//! issues the backend call only when the value differs (or when forced), and then
//! records the new value. As long as nothing else touches the context, the cache
//! and the context never drift apart.
//!
//! The cache is single threaded: it lives on the thread that owns the context and
//! is mutated through `&mut self`.

use std::mem;

use glam::Vec4;
use glcache_types::{
    BlendMode, BufferTarget, CullMode, DepthFunc, FramebufferTarget, PolygonOffset, RawBufferHandle,
    RawFramebufferHandle, RawProgramHandle, RawTextureHandle, RawVertexArrayHandle, Rect, TextureTarget,
    VertexDeclaration,
};

use crate::{
    backend::{BackendLimits, GraphicsBackend},
    options::ContextOptions,
    util::typedefs::FastHashMap,
};

mod cached;
mod preserve;

pub use cached::*;
pub use preserve::PreservedState;

/// Issues `$call` and records the value if it differs from the cached field or the
/// update is forced. Evaluates to whether the backend was called.
macro_rules! apply_if_changed {
    ($self:ident, $force:expr, $field:ident, $value:expr, $call:ident) => {{
        let value = $value;
        if $force || $self.cached.$field != value {
            $self.backend.$call(value);
            $self.cached.$field = value;
            true
        } else {
            false
        }
    }};
}

/// Iterates the set bits of an attribute mask.
fn mask_locations(mask: u32) -> impl Iterator<Item = u32> {
    (0..u32::BITS).filter(move |location| mask & (1 << location) != 0)
}

/// Mirror of the context's binding slots and toggles.
pub struct StateCache<B> {
    backend: B,
    limits: BackendLimits,
    cached: CachedState,
    /// Input state of every vertex array that is not currently bound.
    parked_inputs: FastHashMap<RawVertexArrayHandle, VertexInputState>,
    /// Snapshots taken by open preserved-state scopes, innermost last.
    preserved: Vec<CachedState>,
}

impl<B: GraphicsBackend> StateCache<B> {
    /// Wraps a backend whose context is in its default state.
    ///
    /// No calls are issued. If the context may have been touched already, call
    /// [`reset`](Self::reset) before using the cache.
    pub fn new(backend: B, options: &ContextOptions) -> Self {
        let reported = backend.limits();
        let limits = BackendLimits {
            texture_units: clamp_limit(reported.texture_units, options.texture_units, MAX_TEXTURE_UNITS),
            vertex_attributes: clamp_limit(
                reported.vertex_attributes,
                options.vertex_attributes,
                MAX_VERTEX_ATTRIBUTES,
            ),
        };
        log::debug!("State cache limits: {:?} (context reported {:?})", limits, reported);

        Self {
            backend,
            limits,
            cached: CachedState::default(),
            parked_inputs: FastHashMap::default(),
            preserved: Vec::new(),
        }
    }

    pub fn limits(&self) -> BackendLimits {
        self.limits
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend, for draw calls and uploads.
    ///
    /// Anything that changes a binding or toggle tracked here must go through the
    /// cache instead, or the cache stops matching the context. Objects are created
    /// and released through [`GraphicsContext`](crate::GraphicsContext), whose
    /// [`backend_mut`](crate::GraphicsContext::backend_mut) also releases dropped
    /// objects before handing out the backend.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The state the context is believed to be in.
    pub fn current_state(&self) -> &CachedState {
        &self.cached
    }

    pub fn bound_texture(&self, unit: u32) -> TextureBinding {
        self.assert_texture_unit(unit);
        self.cached.texture(unit)
    }

    pub fn bound_buffer(&self, target: BufferTarget) -> RawBufferHandle {
        self.cached.buffer(target)
    }

    pub fn bound_vertex_array(&self) -> RawVertexArrayHandle {
        self.cached.vertex_array
    }

    pub fn bound_program(&self) -> RawProgramHandle {
        self.cached.program
    }

    /// The framebuffer draws currently render into.
    pub fn current_framebuffer(&self) -> RawFramebufferHandle {
        self.cached.draw_framebuffer
    }

    fn assert_texture_unit(&self, unit: u32) {
        assert!(
            unit < self.limits.texture_units,
            "Texture unit {} out of range, the context has {} units",
            unit,
            self.limits.texture_units
        );
    }

    fn assert_vertex_attribute(&self, location: u32) {
        assert!(
            location < self.limits.vertex_attributes,
            "Vertex attribute location {} out of range, the context has {} attributes",
            location,
            self.limits.vertex_attributes
        );
    }

    pub fn set_active_texture_unit(&mut self, unit: u32, force: bool) -> bool {
        self.assert_texture_unit(unit);
        apply_if_changed!(self, force, active_texture_unit, unit, active_texture)
    }

    /// Binds `handle` to `unit`, selecting the unit first if needed.
    pub fn bind_texture(&mut self, unit: u32, handle: RawTextureHandle, target: TextureTarget, force: bool) -> bool {
        self.assert_texture_unit(unit);
        let binding = TextureBinding { handle, target };
        if !force && self.cached.textures[unit as usize] == binding {
            return false;
        }

        self.set_active_texture_unit(unit, false);
        self.backend.bind_texture(target, handle);
        self.cached.textures[unit as usize] = binding;
        true
    }

    /// Binds `handle` to `target`. The index binding belongs to the bound vertex array.
    pub fn bind_buffer(&mut self, target: BufferTarget, handle: RawBufferHandle, force: bool) -> bool {
        if !force && self.cached.buffer(target) == handle {
            return false;
        }

        self.backend.bind_buffer(target, handle);
        *self.cached.buffer_mut(target) = handle;
        true
    }

    /// Binds a vertex array. The index buffer binding and attribute state of the
    /// previous vertex array are remembered and come back when it is rebound.
    pub fn bind_vertex_array(&mut self, handle: RawVertexArrayHandle, force: bool) -> bool {
        if !force && self.cached.vertex_array == handle {
            return false;
        }

        self.backend.bind_vertex_array(handle);
        if self.cached.vertex_array != handle {
            let incoming = self.parked_inputs.remove(&handle).unwrap_or_default();
            let outgoing = mem::replace(&mut self.cached.vertex_input, incoming);
            self.parked_inputs.insert(self.cached.vertex_array, outgoing);
            self.cached.vertex_array = handle;
        }
        true
    }

    pub fn bind_program(&mut self, handle: RawProgramHandle, force: bool) -> bool {
        apply_if_changed!(self, force, program, handle, use_program)
    }

    pub fn bind_framebuffer(&mut self, handle: RawFramebufferHandle, target: FramebufferTarget, force: bool) -> bool {
        let draw_differs = target.includes_draw() && self.cached.draw_framebuffer != handle;
        let read_differs = target.includes_read() && self.cached.read_framebuffer != handle;
        if !force && !draw_differs && !read_differs {
            return false;
        }

        self.backend.bind_framebuffer(target, handle);
        if target.includes_draw() {
            self.cached.draw_framebuffer = handle;
        }
        if target.includes_read() {
            self.cached.read_framebuffer = handle;
        }
        true
    }

    pub fn set_vertex_attrib_enabled(&mut self, location: u32, enabled: bool, force: bool) -> bool {
        self.assert_vertex_attribute(location);
        if !force && self.cached.vertex_input.is_attribute_enabled(location) == enabled {
            return false;
        }

        self.backend.set_vertex_attrib_enabled(location, enabled);
        self.cached.vertex_input.set_attribute_enabled(location, enabled);
        true
    }

    /// Makes the attribute state match `declaration` and points its attributes into
    /// the bound vertex buffer.
    ///
    /// Locations enabled by an earlier layout but absent from this one are disabled
    /// first, then the declared locations are enabled. Pointers are specified when
    /// the buffer or declaration changed since they were last specified, and always
    /// when `base_vertex` is non-zero, since the offset is baked into the pointers.
    pub fn apply_vertex_declaration(&mut self, declaration: &VertexDeclaration, base_vertex: u32, force: bool) -> bool {
        let wanted = declaration.location_mask();
        for element in &declaration.elements {
            self.assert_vertex_attribute(element.location);
        }

        let mut issued = false;

        let to_disable = if force {
            let all = ((1u64 << self.limits.vertex_attributes) - 1) as u32;
            all & !wanted
        } else {
            self.cached.vertex_input.enabled_attributes & !wanted
        };
        for location in mask_locations(to_disable) {
            issued |= self.set_vertex_attrib_enabled(location, false, force);
        }
        for element in &declaration.elements {
            issued |= self.set_vertex_attrib_enabled(element.location, true, force);
        }

        let vertex_buffer = self.cached.vertex_buffer;
        let pointers_current = matches!(
            self.cached.vertex_input.pointers,
            Some(ref source) if source.buffer == vertex_buffer && source.declaration == *declaration
        );
        if force || base_vertex != 0 || !pointers_current {
            let base_offset = u64::from(base_vertex) * u64::from(declaration.stride);
            for element in &declaration.elements {
                self.backend
                    .vertex_attrib_pointer(element, declaration.stride, base_offset);
            }
            issued |= !declaration.elements.is_empty();

            self.cached.vertex_input.pointers = (base_vertex == 0).then(|| VertexPointerSource {
                buffer: vertex_buffer,
                declaration: declaration.clone(),
            });
        }

        issued
    }

    /// Binds a vertex buffer and applies `declaration` to it.
    pub fn bind_vertex_buffer(
        &mut self,
        handle: RawBufferHandle,
        declaration: &VertexDeclaration,
        base_vertex: u32,
        force: bool,
    ) -> bool {
        let bound = self.bind_buffer(BufferTarget::Vertex, handle, force);
        let applied = self.apply_vertex_declaration(declaration, base_vertex, force);
        bound || applied
    }

    pub fn set_blend(&mut self, enabled: bool, mode: BlendMode, force: bool) -> bool {
        apply_if_changed!(self, force, blend, enabled, set_blend_enabled)
            | apply_if_changed!(self, force, blend_mode, mode, set_blend_mode)
    }

    pub fn set_culling(&mut self, mode: CullMode, force: bool) -> bool {
        apply_if_changed!(self, force, cull_mode, mode, set_cull_mode)
    }

    pub fn set_depth_test(&mut self, enabled: bool, force: bool) -> bool {
        apply_if_changed!(self, force, depth_test, enabled, set_depth_test_enabled)
    }

    pub fn set_depth_func(&mut self, func: DepthFunc, force: bool) -> bool {
        apply_if_changed!(self, force, depth_func, func, set_depth_func)
    }

    pub fn set_depth_mask(&mut self, enabled: bool, force: bool) -> bool {
        apply_if_changed!(self, force, depth_mask, enabled, set_depth_mask)
    }

    pub fn set_polygon_offset_fill(&mut self, enabled: bool, offset: PolygonOffset, force: bool) -> bool {
        apply_if_changed!(self, force, polygon_offset_fill, enabled, set_polygon_offset_fill_enabled)
            | apply_if_changed!(self, force, polygon_offset, offset, set_polygon_offset)
    }

    pub fn set_wireframe_rendering(&mut self, enabled: bool, force: bool) -> bool {
        apply_if_changed!(self, force, wireframe, enabled, set_wireframe)
    }

    /// Scissor test and rectangle.
    pub fn set_clip(&mut self, enabled: bool, rect: Rect, force: bool) -> bool {
        apply_if_changed!(self, force, clip, enabled, set_scissor_test_enabled)
            | apply_if_changed!(self, force, clip_rect, rect, set_scissor)
    }

    pub fn set_viewport(&mut self, rect: Rect, force: bool) -> bool {
        apply_if_changed!(self, force, viewport, rect, set_viewport)
    }

    pub fn set_clear_color(&mut self, color: Vec4, force: bool) -> bool {
        apply_if_changed!(self, force, clear_color, color, set_clear_color)
    }

    pub fn program_deleted(&mut self, handle: RawProgramHandle) {
        assert!(handle.is_valid(), "program_deleted called with the invalid handle");
        log::trace!("Program {} deleted", handle.idx);
        self.for_each_state(|state| state.program_deleted(handle));
    }

    pub fn texture_deleted(&mut self, handle: RawTextureHandle) {
        assert!(handle.is_valid(), "texture_deleted called with the invalid handle");
        log::trace!("Texture {} deleted", handle.idx);
        self.for_each_state(|state| state.texture_deleted(handle));
    }

    pub fn vertex_array_deleted(&mut self, handle: RawVertexArrayHandle) {
        assert!(handle.is_valid(), "vertex_array_deleted called with the invalid handle");
        log::trace!("Vertex array {} deleted", handle.idx);
        if self.cached.vertex_array == handle {
            // The context falls back to the default vertex array, with whatever input
            // state it had when it was last bound.
            self.cached.vertex_array = RawVertexArrayHandle::INVALID;
            self.cached.vertex_input = self
                .parked_inputs
                .remove(&RawVertexArrayHandle::INVALID)
                .unwrap_or_default();
        }
        for snapshot in &mut self.preserved {
            snapshot.vertex_array_deleted(handle);
        }
        self.parked_inputs.remove(&handle);
    }

    pub fn vertex_buffer_deleted(&mut self, handle: RawBufferHandle) {
        assert!(handle.is_valid(), "vertex_buffer_deleted called with the invalid handle");
        log::trace!("Vertex buffer {} deleted", handle.idx);
        self.for_each_state(|state| state.vertex_buffer_deleted(handle));
        for input in self.parked_inputs.values_mut() {
            input.buffer_deleted(handle, false);
        }
    }

    pub fn index_buffer_deleted(&mut self, handle: RawBufferHandle) {
        assert!(handle.is_valid(), "index_buffer_deleted called with the invalid handle");
        log::trace!("Index buffer {} deleted", handle.idx);
        self.for_each_state(|state| state.index_buffer_deleted(handle));
        for input in self.parked_inputs.values_mut() {
            input.buffer_deleted(handle, true);
        }
    }

    pub fn uniform_buffer_deleted(&mut self, handle: RawBufferHandle) {
        assert!(handle.is_valid(), "uniform_buffer_deleted called with the invalid handle");
        log::trace!("Uniform buffer {} deleted", handle.idx);
        self.for_each_state(|state| state.uniform_buffer_deleted(handle));
    }

    pub fn framebuffer_deleted(&mut self, handle: RawFramebufferHandle) {
        assert!(handle.is_valid(), "framebuffer_deleted called with the invalid handle");
        log::trace!("Framebuffer {} deleted", handle.idx);
        self.for_each_state(|state| state.framebuffer_deleted(handle));
    }

    /// Deletion hooks apply to the live state and to every open scope's snapshot,
    /// so restoring a scope never rebinds a destroyed handle.
    fn for_each_state(&mut self, mut func: impl FnMut(&mut CachedState)) {
        func(&mut self.cached);
        for snapshot in &mut self.preserved {
            func(snapshot);
        }
    }

    /// Forces the context into the default state. Used after the context is (re)created.
    pub fn reset(&mut self) {
        profiling::scope!("StateCache::reset");
        log::debug!("Resetting graphics context state");

        self.apply_state(&CachedState::default(), true);
        // Vertex arrays don't survive context re-creation.
        self.parked_inputs.clear();
    }

    /// Brings the context to `snapshot`, issuing only the calls that differ.
    pub fn restore(&mut self, snapshot: &CachedState) {
        self.apply_state(snapshot, false);
    }

    /// Opens a preserved-state scope. The returned guard derefs to the cache and
    /// restores the current state when dropped.
    pub fn preserve(&mut self) -> PreservedState<'_, B> {
        self.preserved.push(self.cached.clone());
        let depth = self.preserved.len();
        PreservedState::new(self, depth)
    }

    /// Runs `func` inside a preserved-state scope.
    pub fn with_preserved_state<R>(&mut self, func: impl FnOnce(&mut Self) -> R) -> R {
        let mut guard = self.preserve();
        func(&mut *guard)
    }

    pub(crate) fn pop_preserved(&mut self, depth: usize) {
        debug_assert_eq!(
            self.preserved.len(),
            depth,
            "Preserved-state scopes must be closed in reverse order"
        );
        if let Some(snapshot) = self.preserved.pop() {
            self.restore(&snapshot);
        }
    }

    fn apply_state(&mut self, target: &CachedState, force: bool) {
        // The vertex array goes first, it owns the index buffer and attribute state.
        self.bind_vertex_array(target.vertex_array, force);
        self.bind_buffer(BufferTarget::Index, target.vertex_input.index_buffer, force);
        for location in 0..self.limits.vertex_attributes {
            let enabled = target.vertex_input.is_attribute_enabled(location);
            self.set_vertex_attrib_enabled(location, enabled, force);
        }
        match target.vertex_input.pointers {
            Some(ref source) if force || self.cached.vertex_input.pointers.as_ref() != Some(source) => {
                self.bind_buffer(BufferTarget::Vertex, source.buffer, false);
                for element in &source.declaration.elements {
                    self.backend
                        .vertex_attrib_pointer(element, source.declaration.stride, 0);
                }
                self.cached.vertex_input.pointers = Some(source.clone());
            }
            Some(_) => {}
            None => self.cached.vertex_input.pointers = None,
        }
        self.bind_buffer(BufferTarget::Vertex, target.vertex_buffer, force);
        self.bind_buffer(BufferTarget::Uniform, target.uniform_buffer, force);

        for unit in 0..self.limits.texture_units {
            let binding = target.texture(unit);
            self.bind_texture(unit, binding.handle, binding.target, force);
        }
        self.set_active_texture_unit(target.active_texture_unit, force);

        self.bind_program(target.program, force);
        if target.draw_framebuffer == target.read_framebuffer {
            self.bind_framebuffer(target.draw_framebuffer, FramebufferTarget::Both, force);
        } else {
            self.bind_framebuffer(target.draw_framebuffer, FramebufferTarget::Draw, force);
            self.bind_framebuffer(target.read_framebuffer, FramebufferTarget::Read, force);
        }

        self.set_blend(target.blend, target.blend_mode, force);
        self.set_depth_test(target.depth_test, force);
        self.set_depth_func(target.depth_func, force);
        self.set_depth_mask(target.depth_mask, force);
        self.set_culling(target.cull_mode, force);
        self.set_polygon_offset_fill(target.polygon_offset_fill, target.polygon_offset, force);
        self.set_wireframe_rendering(target.wireframe, force);
        self.set_clip(target.clip, target.clip_rect, force);
        self.set_viewport(target.viewport, force);
        self.set_clear_color(target.clear_color, force);
    }
}

fn clamp_limit(reported: u32, configured: Option<u32>, max: usize) -> u32 {
    let limit = reported.min(max as u32);
    configured.map_or(limit, |configured| configured.min(limit))
}
