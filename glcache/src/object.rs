//! Lifetime of context-side objects.
//!
//! An [`ApiObject`] owns one handle. It is shared by wrapping it (or a resource
//! that contains it) in an [`Arc`](std::sync::Arc); the strong count is the
//! object's reference count. When the last holder lets go, `Drop` queues the
//! handle on its context's deletion queue. The context thread later releases the
//! handle and runs the matching [`StateCache`](crate::StateCache) deletion hook
//! in one step, see [`GraphicsContext::maintain`](crate::GraphicsContext::maintain).

use std::fmt::{self, Debug};

use glcache_types::{
    BufferTag, BufferTarget, FramebufferTag, ProgramTag, RawHandle, TextureTag, VertexArrayTag,
};

use crate::util::typedefs::SsoString;

/// What an object is, which decides the release call and deletion hook used for it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Texture,
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    Program,
    VertexArray,
    Framebuffer,
}

impl ObjectKind {
    pub const fn buffer(target: BufferTarget) -> Self {
        match target {
            BufferTarget::Vertex => Self::VertexBuffer,
            BufferTarget::Index => Self::IndexBuffer,
            BufferTarget::Uniform => Self::UniformBuffer,
        }
    }
}

/// A handle whose last owner went away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct PendingDeletion {
    pub kind: ObjectKind,
    pub idx: u32,
}

pub(crate) type DeletionSender = flume::Sender<PendingDeletion>;

/// Owner of a single context-side handle.
pub struct ApiObject<T> {
    raw: RawHandle<T>,
    kind: ObjectKind,
    origin: SsoString,
    deleter: DeletionSender,
}

impl<T> ApiObject<T> {
    pub(crate) fn new(raw: RawHandle<T>, kind: ObjectKind, origin: SsoString, deleter: DeletionSender) -> Self {
        Self {
            raw,
            kind,
            origin,
            deleter,
        }
    }

    /// The non-owning handle, for binding through the state cache.
    pub fn raw(&self) -> RawHandle<T> {
        self.raw
    }

    /// Where this object came from, usually a path. Empty for anonymous objects.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl<T> Drop for ApiObject<T> {
    fn drop(&mut self) {
        let deletion = PendingDeletion {
            kind: self.kind,
            idx: self.raw.idx,
        };
        if self.deleter.send(deletion).is_err() {
            // The context and everything it created are already gone.
            log::trace!("{:?} {} dropped after its context", self.kind, self.raw.idx);
        }
    }
}

impl<T> Debug for ApiObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiObject")
            .field("kind", &self.kind)
            .field("idx", &self.raw.idx)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Owning texture object
pub type TextureObject = ApiObject<TextureTag>;
/// Owning buffer object, of any [`BufferTarget`]
pub type BufferObject = ApiObject<BufferTag>;
/// Owning program object
pub type ProgramObject = ApiObject<ProgramTag>;
/// Owning vertex array object
pub type VertexArrayObject = ApiObject<VertexArrayTag>;
/// Owning framebuffer object
pub type FramebufferObject = ApiObject<FramebufferTag>;
