use glcache_types::{BufferTarget, RawHandle};

use crate::{
    backend::GraphicsBackend,
    error::ObjectCreationError,
    object::{
        ApiObject, BufferObject, DeletionSender, FramebufferObject, ObjectKind, PendingDeletion, ProgramObject,
        TextureObject, VertexArrayObject,
    },
    options::ContextOptions,
    state::StateCache,
    util::typedefs::{FastHashMap, SsoString},
};

/// Handle namespace an object kind allocates from. All buffer kinds share one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum Namespace {
    Texture,
    Buffer,
    Program,
    VertexArray,
    Framebuffer,
}

impl Namespace {
    fn of(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Texture => Self::Texture,
            ObjectKind::VertexBuffer | ObjectKind::IndexBuffer | ObjectKind::UniformBuffer => Self::Buffer,
            ObjectKind::Program => Self::Program,
            ObjectKind::VertexArray => Self::VertexArray,
            ObjectKind::Framebuffer => Self::Framebuffer,
        }
    }
}

/// One graphics context: its state cache and the objects it created.
///
/// Owned by the thread the context is current on. Objects it hands out may be
/// shared and dropped on any thread; their handles are released the next time
/// the owning thread calls [`maintain`](Self::maintain) or creates an object.
pub struct GraphicsContext<B: GraphicsBackend> {
    state: StateCache<B>,
    deletion_sender: DeletionSender,
    deletion_receiver: flume::Receiver<PendingDeletion>,
    /// Every handle wrapped in a live object, with the kind it was created as.
    live: FastHashMap<(Namespace, u32), ObjectKind>,
}

impl<B: GraphicsBackend> GraphicsContext<B> {
    /// Takes over a freshly created context and forces it into the default state.
    pub fn new(backend: B, options: &ContextOptions) -> Self {
        let (deletion_sender, deletion_receiver) = flume::unbounded();

        let mut state = StateCache::new(backend, options);
        state.reset();

        Self {
            state,
            deletion_sender,
            deletion_receiver,
            live: FastHashMap::default(),
        }
    }

    pub fn state(&self) -> &StateCache<B> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateCache<B> {
        &mut self.state
    }

    /// The backend, for draw calls and uploads, with every dropped object released
    /// first.
    pub fn backend_mut(&mut self) -> &mut B {
        self.maintain();
        self.state.backend_mut()
    }

    pub fn create_texture(&mut self, origin: &str) -> Result<TextureObject, ObjectCreationError> {
        self.maintain();
        let raw = self.state.backend_mut().create_texture();
        self.wrap(raw, ObjectKind::Texture, origin)
    }

    /// Creates a buffer that will be bound to `target`.
    ///
    /// When the buffer is destroyed it is cleared from every buffer slot, so binding
    /// it to other targets as well is fine.
    pub fn create_buffer(&mut self, target: BufferTarget, origin: &str) -> Result<BufferObject, ObjectCreationError> {
        self.maintain();
        let raw = self.state.backend_mut().create_buffer();
        self.wrap(raw, ObjectKind::buffer(target), origin)
    }

    pub fn create_program(&mut self, origin: &str) -> Result<ProgramObject, ObjectCreationError> {
        self.maintain();
        let raw = self.state.backend_mut().create_program();
        self.wrap(raw, ObjectKind::Program, origin)
    }

    pub fn create_vertex_array(&mut self, origin: &str) -> Result<VertexArrayObject, ObjectCreationError> {
        self.maintain();
        let raw = self.state.backend_mut().create_vertex_array();
        self.wrap(raw, ObjectKind::VertexArray, origin)
    }

    pub fn create_framebuffer(&mut self, origin: &str) -> Result<FramebufferObject, ObjectCreationError> {
        self.maintain();
        let raw = self.state.backend_mut().create_framebuffer();
        self.wrap(raw, ObjectKind::Framebuffer, origin)
    }

    fn wrap<T>(&mut self, raw: RawHandle<T>, kind: ObjectKind, origin: &str) -> Result<ApiObject<T>, ObjectCreationError> {
        if !raw.is_valid() {
            return Err(ObjectCreationError::InvalidHandle {
                kind,
                origin: SsoString::from(origin),
            });
        }

        let previous = self.live.insert((Namespace::of(kind), raw.idx), kind);
        debug_assert!(
            previous.is_none(),
            "Backend handed out {:?} {} while an object still owns it",
            kind,
            raw.idx
        );

        log::trace!("Created {:?} {} for {:?}", kind, raw.idx, origin);
        Ok(ApiObject::new(
            raw,
            kind,
            SsoString::from(origin),
            self.deletion_sender.clone(),
        ))
    }

    /// Objects dropped but not yet released.
    pub fn pending_deletions(&self) -> usize {
        self.deletion_receiver.len()
    }

    /// Releases the handles of every dropped object and notifies the state cache.
    ///
    /// Every factory call does this before allocating, so a handle value is never
    /// handed out again while the cache may still report it bound. Call it once per
    /// frame so dropped objects don't hold on to context memory.
    pub fn maintain(&mut self) -> usize {
        profiling::scope!("GraphicsContext::maintain");

        let mut released = 0;
        while let Ok(deletion) = self.deletion_receiver.try_recv() {
            self.finalize(deletion);
            released += 1;
        }
        if released != 0 {
            log::trace!("Released {} objects", released);
        }
        released
    }

    /// Releases one handle and runs its deletion hook, with nothing in between that
    /// could allocate the same value.
    fn finalize(&mut self, PendingDeletion { kind, idx }: PendingDeletion) {
        let owner = self.live.remove(&(Namespace::of(kind), idx));
        debug_assert_eq!(
            owner,
            Some(kind),
            "Finalized {:?} {} which is not live as that kind",
            kind,
            idx
        );

        let state = &mut self.state;
        match kind {
            ObjectKind::Texture => {
                let handle = RawHandle::new(idx);
                state.backend_mut().delete_texture(handle);
                state.texture_deleted(handle);
            }
            ObjectKind::VertexBuffer | ObjectKind::IndexBuffer | ObjectKind::UniformBuffer => {
                let handle = RawHandle::new(idx);
                state.backend_mut().delete_buffer(handle);
                state.vertex_buffer_deleted(handle);
                state.index_buffer_deleted(handle);
                state.uniform_buffer_deleted(handle);
            }
            ObjectKind::Program => {
                let handle = RawHandle::new(idx);
                state.backend_mut().delete_program(handle);
                state.program_deleted(handle);
            }
            ObjectKind::VertexArray => {
                let handle = RawHandle::new(idx);
                state.backend_mut().delete_vertex_array(handle);
                state.vertex_array_deleted(handle);
            }
            ObjectKind::Framebuffer => {
                let handle = RawHandle::new(idx);
                state.backend_mut().delete_framebuffer(handle);
                state.framebuffer_deleted(handle);
            }
        }
    }
}

impl<B: GraphicsBackend> Drop for GraphicsContext<B> {
    fn drop(&mut self) {
        self.maintain();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glcache_types::TextureTarget;

    use super::*;
    use crate::util::recording::{BackendCall, RecordingBackend};

    fn context() -> GraphicsContext<RecordingBackend> {
        let mut ctx = GraphicsContext::new(RecordingBackend::new(), &ContextOptions::default());
        ctx.state_mut().backend_mut().clear_calls();
        ctx
    }

    #[test]
    fn last_drop_releases_and_unbinds() {
        let mut ctx = context();
        let texture = Arc::new(ctx.create_texture("tex/a.png").unwrap());
        let raw = texture.raw();
        ctx.state_mut().bind_texture(0, raw, TextureTarget::D2, false);

        let second_holder = Arc::clone(&texture);
        drop(texture);
        assert_eq!(ctx.maintain(), 0);
        assert_eq!(ctx.state().bound_texture(0).handle, raw);

        drop(second_holder);
        assert_eq!(ctx.pending_deletions(), 1);
        assert_eq!(ctx.maintain(), 1);
        assert_eq!(ctx.state().bound_texture(0).handle, RawHandle::INVALID);
        assert!(ctx
            .state()
            .backend()
            .calls()
            .contains(&BackendCall::DeleteTexture(raw)));
    }

    #[test]
    fn buffer_deletion_leaves_other_buffers() {
        let mut ctx = context();
        let vertex = ctx.create_buffer(BufferTarget::Vertex, "").unwrap();
        let index = ctx.create_buffer(BufferTarget::Index, "").unwrap();
        ctx.state_mut().bind_buffer(BufferTarget::Vertex, vertex.raw(), false);
        ctx.state_mut().bind_buffer(BufferTarget::Index, index.raw(), false);

        drop(index);
        ctx.maintain();
        assert_eq!(ctx.state().bound_buffer(BufferTarget::Index), RawHandle::INVALID);
        assert_eq!(ctx.state().bound_buffer(BufferTarget::Vertex), vertex.raw());
    }

    #[test]
    fn buffer_bound_to_other_targets_is_cleared_everywhere() {
        let mut ctx = context();
        let buffer = ctx.create_buffer(BufferTarget::Vertex, "meshes/rock").unwrap();
        ctx.state_mut().bind_buffer(BufferTarget::Vertex, buffer.raw(), false);
        ctx.state_mut().bind_buffer(BufferTarget::Index, buffer.raw(), false);
        ctx.state_mut().bind_buffer(BufferTarget::Uniform, buffer.raw(), false);

        drop(buffer);
        ctx.maintain();
        for target in [BufferTarget::Vertex, BufferTarget::Index, BufferTarget::Uniform] {
            assert_eq!(ctx.state().bound_buffer(target), RawHandle::INVALID);
        }
    }

    #[test]
    fn backend_access_releases_dropped_objects() {
        let mut ctx = context();
        let texture = ctx.create_texture("tex/a.png").unwrap();
        let raw = texture.raw();
        ctx.state_mut().bind_texture(0, raw, TextureTarget::D2, false);
        drop(texture);

        let recycled = ctx.backend_mut().create_texture();
        assert_eq!(recycled, raw);
        assert_eq!(ctx.pending_deletions(), 0);
        assert_eq!(ctx.state().bound_texture(0).handle, RawHandle::INVALID);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not live")]
    fn finalizing_twice_panics() {
        let mut ctx = context();
        let texture = ctx.create_texture("tex/a.png").unwrap();
        let duplicate = PendingDeletion {
            kind: ObjectKind::Texture,
            idx: texture.raw().idx,
        };
        ctx.deletion_sender.send(duplicate).unwrap();
        drop(texture);

        ctx.maintain();
    }
}
