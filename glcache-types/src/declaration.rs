use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Format of one vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Unorm8x4,
    Uint8x4,
    Uint16x4,
    Snorm16x2,
    Uint32,
}

impl VertexFormat {
    /// Size of one attribute in bytes.
    pub const fn size(self) -> u32 {
        match self {
            Self::Float32 | Self::Unorm8x4 | Self::Uint8x4 | Self::Snorm16x2 | Self::Uint32 => 4,
            Self::Float32x2 | Self::Uint16x4 => 8,
            Self::Float32x3 => 12,
            Self::Float32x4 => 16,
        }
    }
}

/// A single attribute inside an interleaved vertex buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexElement {
    /// Attribute index in the shader.
    pub location: u32,
    pub format: VertexFormat,
    /// Byte offset of the attribute inside one vertex.
    pub offset: u32,
}

/// Layout of an interleaved vertex buffer.
///
/// Applying a declaration enables exactly the attribute locations it lists and
/// disables every other location that was left enabled by a previous layout.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexDeclaration {
    pub stride: u32,
    pub elements: SmallVec<[VertexElement; 8]>,
}

impl VertexDeclaration {
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            elements: SmallVec::new(),
        }
    }

    /// Appends an element at the given offset.
    pub fn with_element(mut self, location: u32, format: VertexFormat, offset: u32) -> Self {
        self.elements.push(VertexElement {
            location,
            format,
            offset,
        });
        self
    }

    /// Builds a tightly packed declaration, computing offsets and stride from the formats.
    pub fn packed(formats: &[(u32, VertexFormat)]) -> Self {
        let mut declaration = Self::new(0);
        for &(location, format) in formats {
            let offset = declaration.stride;
            declaration.stride += format.size();
            declaration.elements.push(VertexElement {
                location,
                format,
                offset,
            });
        }
        declaration
    }

    /// Bitmask of every attribute location this declaration uses.
    pub fn location_mask(&self) -> u32 {
        self.elements.iter().fold(0, |mask, element| {
            assert!(
                element.location < u32::BITS,
                "Vertex attribute location {} does not fit in the attribute mask",
                element.location
            );
            mask | (1 << element.location)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_declaration_offsets() {
        let decl = VertexDeclaration::packed(&[
            (0, VertexFormat::Float32x3),
            (1, VertexFormat::Float32x2),
            (3, VertexFormat::Unorm8x4),
        ]);

        assert_eq!(decl.stride, 24);
        let offsets: Vec<u32> = decl.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, [0, 12, 20]);
        assert_eq!(decl.location_mask(), 0b1011);
    }
}
