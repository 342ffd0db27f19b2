#![warn(unsafe_op_in_unsafe_fn)]

//! Type declarations for the glcache state and resource caches.
//!
//! This is reexported in the glcache crate proper and includes all the "surface"
//! api arguments: typed raw handles, binding targets and render state toggles.

use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Reexport of the glam version glcache is using.
pub use glam;
use serde::{Deserialize, Serialize};

mod declaration;
pub use declaration::*;

/// Non-owning handle to a context-side object.
///
/// This is the plain integer the graphics context hands out. The state cache
/// only ever stores and compares these, it never owns the object behind them.
/// A value of zero is the invalid sentinel, meaning "nothing bound".
pub struct RawHandle<T> {
    /// Underlying value of the handle.
    pub idx: u32,
    _phantom: PhantomData<T>,
}

impl<T> RawHandle<T> {
    /// The "unbound" handle.
    pub const INVALID: Self = Self::new(0);

    /// Creates a new handle with the given value
    pub const fn new(idx: u32) -> Self {
        Self {
            idx,
            _phantom: PhantomData,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.idx != 0
    }
}

// Need Debug/Copy/Clone impls that don't require T: Trait.
impl<T> Debug for RawHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawHandle").field("idx", &self.idx).finish()
    }
}

impl<T> Copy for RawHandle<T> {}

impl<T> Clone for RawHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for RawHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T> Eq for RawHandle<T> {}

impl<T> Hash for RawHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}

impl<T> Default for RawHandle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Tag type for differentiating textures on the type level.
#[doc(hidden)]
pub struct TextureTag;
/// Tag type for differentiating buffers on the type level.
#[doc(hidden)]
pub struct BufferTag;
/// Tag type for differentiating shader programs on the type level.
#[doc(hidden)]
pub struct ProgramTag;
/// Tag type for differentiating vertex array objects on the type level.
#[doc(hidden)]
pub struct VertexArrayTag;
/// Tag type for differentiating framebuffers on the type level.
#[doc(hidden)]
pub struct FramebufferTag;

/// Non-owning handle to a texture
pub type RawTextureHandle = RawHandle<TextureTag>;
/// Non-owning handle to a vertex, index or uniform buffer
pub type RawBufferHandle = RawHandle<BufferTag>;
/// Non-owning handle to a linked shader program
pub type RawProgramHandle = RawHandle<ProgramTag>;
/// Non-owning handle to a vertex array object
pub type RawVertexArrayHandle = RawHandle<VertexArrayTag>;
/// Non-owning handle to a framebuffer
pub type RawFramebufferHandle = RawHandle<FramebufferTag>;

/// Dimensionality of a texture bound to a unit.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureTarget {
    #[default]
    D2,
    D2Array,
    D3,
    Cube,
}

/// Buffer binding point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    /// Vertex attribute data (the array buffer).
    Vertex,
    /// Index data (the element array buffer).
    Index,
    Uniform,
}

/// Framebuffer binding point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FramebufferTarget {
    Draw,
    Read,
    /// Binds both the draw and read targets.
    Both,
}

impl FramebufferTarget {
    pub const fn includes_draw(self) -> bool {
        matches!(self, Self::Draw | Self::Both)
    }

    pub const fn includes_read(self) -> bool {
        matches!(self, Self::Read | Self::Both)
    }
}

/// Blend equation presets. Only meaningful while blending is enabled.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// `src * src_alpha + dst * (1 - src_alpha)`
    #[default]
    Alpha,
    /// `src + dst * (1 - src_alpha)`
    Premultiplied,
    /// `src * src_alpha + dst`
    Additive,
    /// `src * dst`
    Multiply,
}

/// Depth comparison function.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Which faces get culled. `None` disables culling entirely.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

/// Integer rectangle in window coordinates, origin at the bottom left.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Depth bias applied to filled polygons.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonOffset {
    pub factor: f32,
    pub units: f32,
}

impl PolygonOffset {
    pub const fn new(factor: f32, units: f32) -> Self {
        Self { factor, units }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_invalid() {
        let handle = RawTextureHandle::default();
        assert_eq!(handle, RawTextureHandle::INVALID);
        assert!(!handle.is_valid());
        assert!(RawTextureHandle::new(3).is_valid());
    }

    #[test]
    fn framebuffer_target_coverage() {
        assert!(FramebufferTarget::Both.includes_draw());
        assert!(FramebufferTarget::Both.includes_read());
        assert!(!FramebufferTarget::Read.includes_draw());
        assert!(!FramebufferTarget::Draw.includes_read());
    }
}
