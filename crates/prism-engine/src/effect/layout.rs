use super::program::ShaderProgram;
use super::technique::Technique;
use super::EffectError;
use crate::mesh::{Semantic, VertexElement};

/// Vertex buffer layout derived from a technique's first-pass vertex signature.
#[derive(Debug, Clone, PartialEq)]
pub struct InputLayout {
    stride: u64,
    step_mode: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
    semantics: Vec<Semantic>,
}

impl InputLayout {
    /// Matches every shader input to one of `elements` by semantic name.
    ///
    /// Inputs without a matching element, or whose WGSL type differs from the
    /// element format, reject the layout. Elements the shader does not read
    /// are left out. `stride` is taken as given.
    pub fn derive(
        program: &ShaderProgram,
        technique: &Technique,
        elements: &[VertexElement],
        stride: u64,
    ) -> Result<Self, EffectError> {
        let reject = |reason: String| EffectError::InputLayout {
            path: program.path().to_path_buf(),
            reason,
        };

        let entry = technique.first_pass().vertex_entry;
        let inputs = program
            .vertex_inputs(entry)
            .ok_or_else(|| reject(format!("'{entry}' is not a vertex entry point")))?;

        let mut attributes = Vec::with_capacity(inputs.len());
        let mut semantics = Vec::with_capacity(inputs.len());
        let mut step_mode = None;

        for input in &inputs {
            let element = elements
                .iter()
                .find(|e| e.semantic.matches(&input.name))
                .ok_or_else(|| {
                    reject(format!(
                        "shader input '{}' (location {}) has no matching vertex element",
                        input.name, input.location
                    ))
                })?;

            match input.format {
                Some(format) if format == element.format => {}
                Some(format) => {
                    return Err(reject(format!(
                        "'{}' is {:?} in the shader but {:?} in the vertex",
                        input.name, format, element.format
                    )));
                }
                None => {
                    return Err(reject(format!(
                        "'{}' has a type that cannot be fed from a vertex buffer",
                        input.name
                    )));
                }
            }

            match step_mode {
                None => step_mode = Some(element.step),
                Some(step) if step != element.step => {
                    return Err(reject("elements mix per-vertex and per-instance data".to_owned()));
                }
                Some(_) => {}
            }

            attributes.push(wgpu::VertexAttribute {
                format: element.format,
                offset: element.offset,
                shader_location: input.location,
            });
            semantics.push(element.semantic);
        }

        Ok(Self {
            stride,
            step_mode: step_mode.unwrap_or(wgpu::VertexStepMode::Vertex),
            attributes,
            semantics,
        })
    }

    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    /// Semantics bound, in shader-location order.
    pub fn semantics(&self) -> &[Semantic] {
        &self.semantics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{bundled_shader, CompileFlags, PassDesc, TechniqueDesc, DEFAULT_TECHNIQUE};
    use crate::mesh::{Vertex, VertexPosCol, VertexPosTex};

    const SINGLE: &[TechniqueDesc] = &[TechniqueDesc {
        name: DEFAULT_TECHNIQUE,
        passes: &[PassDesc::OPAQUE],
    }];

    fn resolve(name: &str) -> (ShaderProgram, Technique) {
        let program = ShaderProgram::load(&bundled_shader(name), CompileFlags::RELEASE).unwrap();
        let technique = Technique::resolve(&program, SINGLE, DEFAULT_TECHNIQUE).unwrap();
        (program, technique)
    }

    #[test]
    fn pos_col_layout_maps_every_field() {
        let (program, technique) = resolve("pos_col.wgsl");
        let layout =
            InputLayout::derive(&program, &technique, VertexPosCol::ELEMENTS, VertexPosCol::STRIDE).unwrap();

        assert_eq!(layout.stride(), 24);
        assert_eq!(
            layout.attributes(),
            &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                    shader_location: 1
                },
            ]
        );
    }

    #[test]
    fn unused_elements_are_skipped() {
        let (program, technique) = resolve("transparent.wgsl");
        let layout =
            InputLayout::derive(&program, &technique, VertexPosTex::ELEMENTS, VertexPosTex::STRIDE).unwrap();

        assert_eq!(layout.semantics(), &[Semantic::Position, Semantic::TexCoord]);
        assert_eq!(layout.attributes()[1].offset, 12);
        assert_eq!(layout.buffer_layout().array_stride, 44);
    }

    #[test]
    fn missing_semantic_is_rejected() {
        let (program, technique) = resolve("shaded.wgsl");
        let err = InputLayout::derive(&program, &technique, VertexPosCol::ELEMENTS, VertexPosCol::STRIDE)
            .unwrap_err();
        assert!(matches!(err, EffectError::InputLayout { .. }));
    }

    #[test]
    fn mismatched_format_is_rejected() {
        let (program, technique) = resolve("pos_col.wgsl");
        let elements = [
            VertexElement::per_vertex(Semantic::Position, wgpu::VertexFormat::Float32x3, 0),
            VertexElement::per_vertex(Semantic::Color, wgpu::VertexFormat::Float32x4, 12),
        ];
        let err = InputLayout::derive(&program, &technique, &elements, 28).unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn mixed_step_modes_are_rejected() {
        let (program, technique) = resolve("pos_col.wgsl");
        let elements = [
            VertexElement::per_vertex(Semantic::Position, wgpu::VertexFormat::Float32x3, 0),
            VertexElement {
                step: wgpu::VertexStepMode::Instance,
                ..VertexElement::per_vertex(Semantic::Color, wgpu::VertexFormat::Float32x3, 12)
            },
        ];
        assert!(InputLayout::derive(&program, &technique, &elements, 24).is_err());
    }
}
