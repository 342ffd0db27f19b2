//! Binding-state cache and hot-reloading resource cache for stateful graphics
//! contexts.
//!
//! - [`StateCache`] mirrors what the context has bound and enabled and filters out
//!   redundant state changes.
//! - [`GraphicsContext`] creates [`ApiObject`]s and keeps the state cache in sync
//!   when they are destroyed.
//! - [`ResourceCache`] shares loaded resources by origin and reloads them when
//!   their sources change.
//!
//! The raw graphics API sits behind [`GraphicsBackend`].
//! [`RecordingBackend`](util::recording::RecordingBackend) implements it without a
//! GPU.

mod backend;
mod context;
mod error;
mod object;
mod options;
mod resources;
mod state;
pub mod util;

pub use backend::*;
pub use context::GraphicsContext;
pub use error::*;
pub use object::{
    ApiObject, BufferObject, FramebufferObject, ObjectKind, ProgramObject, TextureObject, VertexArrayObject,
};
pub use options::*;
pub use resources::*;
pub use state::*;

/// Handle, binding target, and vertex layout types.
pub use glcache_types as types;
