//! Vertex structures and the field descriptors effects derive input layouts from.

use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};

/// Meaning of a vertex field, matched against shader input names.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Semantic {
    Position,
    Color,
    TexCoord,
    Normal,
    Tangent,
}

impl Semantic {
    /// Shader input names accepted for this semantic (compared case-insensitively).
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Semantic::Position => &["position", "pos"],
            Semantic::Color => &["color", "colour"],
            Semantic::TexCoord => &["uv", "texcoord", "tex_coord"],
            Semantic::Normal => &["normal"],
            Semantic::Tangent => &["tangent"],
        }
    }

    pub fn matches(self, shader_name: &str) -> bool {
        self.names().iter().any(|n| n.eq_ignore_ascii_case(shader_name))
    }
}

/// One field of a vertex structure: semantic, format, byte offset, step rate.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexElement {
    pub semantic: Semantic,
    pub format: wgpu::VertexFormat,
    pub offset: u64,
    pub step: wgpu::VertexStepMode,
}

impl VertexElement {
    pub const fn per_vertex(semantic: Semantic, format: wgpu::VertexFormat, offset: usize) -> Self {
        Self {
            semantic,
            format,
            offset: offset as u64,
            step: wgpu::VertexStepMode::Vertex,
        }
    }
}

/// A vertex type that can be uploaded to a vertex buffer.
///
/// `ELEMENTS` must describe the `#[repr(C)]` byte layout exactly; effects
/// build their input layouts from it.
pub trait Vertex: Pod {
    const ELEMENTS: &'static [VertexElement];
    const STRIDE: u64 = std::mem::size_of::<Self>() as u64;
}

/// Position + colour vertex used by the colour effect.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexPosCol {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for VertexPosCol {
    const ELEMENTS: &'static [VertexElement] = &[
        VertexElement::per_vertex(
            Semantic::Position,
            wgpu::VertexFormat::Float32x3,
            offset_of!(VertexPosCol, position),
        ),
        VertexElement::per_vertex(
            Semantic::Color,
            wgpu::VertexFormat::Float32x3,
            offset_of!(VertexPosCol, color),
        ),
    ];
}

/// Position + UV vertex with a tangent frame, used by the textured effects.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexPosTex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

impl Vertex for VertexPosTex {
    const ELEMENTS: &'static [VertexElement] = &[
        VertexElement::per_vertex(
            Semantic::Position,
            wgpu::VertexFormat::Float32x3,
            offset_of!(VertexPosTex, position),
        ),
        VertexElement::per_vertex(
            Semantic::TexCoord,
            wgpu::VertexFormat::Float32x2,
            offset_of!(VertexPosTex, uv),
        ),
        VertexElement::per_vertex(
            Semantic::Normal,
            wgpu::VertexFormat::Float32x3,
            offset_of!(VertexPosTex, normal),
        ),
        VertexElement::per_vertex(
            Semantic::Tangent,
            wgpu::VertexFormat::Float32x3,
            offset_of!(VertexPosTex, tangent),
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_elements_fit<V: Vertex>() {
        for element in V::ELEMENTS {
            assert!(
                element.offset + element.format.size() <= V::STRIDE,
                "{:?} overruns the vertex",
                element.semantic
            );
        }
    }

    #[test]
    fn pos_col_layout_matches_struct() {
        assert_eq!(VertexPosCol::STRIDE, 24);
        assert_eq!(VertexPosCol::ELEMENTS[0].offset, 0);
        // 3 x f32 of position precede the colour.
        assert_eq!(VertexPosCol::ELEMENTS[1].offset, 12);
        assert_elements_fit::<VertexPosCol>();
    }

    #[test]
    fn pos_tex_layout_matches_struct() {
        assert_eq!(VertexPosTex::STRIDE, 44);
        let offsets: Vec<u64> = VertexPosTex::ELEMENTS.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20, 32]);
        assert_elements_fit::<VertexPosTex>();
    }

    #[test]
    fn semantic_names_are_case_insensitive() {
        assert!(Semantic::Position.matches("POSITION"));
        assert!(Semantic::TexCoord.matches("TexCoord"));
        assert!(Semantic::TexCoord.matches("uv"));
        assert!(!Semantic::Normal.matches("tangent"));
    }
}
