//! CPU-side geometry: OBJ import and a few procedural primitives.
//!
//! All geometry is left-handed with clockwise front faces. OBJ files are
//! authored right-handed, so import mirrors z and swaps the triangle winding.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use thiserror::Error;

use super::vertex::{VertexPosCol, VertexPosTex};

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("failed to load OBJ '{path}': {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("OBJ '{path}' contains no triangles")]
    Empty { path: PathBuf },
}

/// Indexed triangle list.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

impl<V> Default for Geometry<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }
}

impl<V> Geometry<V> {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Where a mesh's geometry comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Obj(PathBuf),
    Cube { size: f32 },
    /// Upright quad facing -z, centred on `center`.
    Quad { width: f32, height: f32, center: Vec3 },
}

impl GeometrySource {
    pub fn load_pos_tex(&self) -> Result<Geometry<VertexPosTex>, GeometryError> {
        match self {
            GeometrySource::Obj(path) => load_obj(path),
            GeometrySource::Cube { size } => Ok(textured_cube(*size)),
            GeometrySource::Quad {
                width,
                height,
                center,
            } => Ok(quad(*width, *height, *center)),
        }
    }

    pub fn load_pos_col(&self) -> Result<Geometry<VertexPosCol>, GeometryError> {
        match self {
            GeometrySource::Cube { size } => Ok(colored_cube(*size)),
            other => other.load_pos_tex().map(|g| colored_by_normal(&g)),
        }
    }
}

/// Loads every model of an OBJ file into a single triangle list.
pub fn load_obj(path: &Path) -> Result<Geometry<VertexPosTex>, GeometryError> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_lines: true,
            ignore_points: true,
            ..Default::default()
        },
    )
    .map_err(|source| GeometryError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let mut geometry = Geometry::default();
    let mut has_normals = true;

    for model in models {
        let mesh = model.mesh;
        let base = geometry.vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        has_normals &= mesh.normals.len() == mesh.positions.len();

        for i in 0..count {
            let position = [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                -mesh.positions[i * 3 + 2],
            ];
            let uv = match mesh.texcoords.get(i * 2..i * 2 + 2) {
                Some(&[u, v]) => [u, 1.0 - v],
                _ => [0.0, 0.0],
            };
            let normal = match mesh.normals.get(i * 3..i * 3 + 3) {
                Some(&[x, y, z]) => [x, y, -z],
                _ => [0.0, 0.0, 0.0],
            };
            geometry.vertices.push(VertexPosTex {
                position,
                uv,
                normal,
                tangent: [0.0; 3],
            });
        }

        for tri in mesh.indices.chunks_exact(3) {
            geometry
                .indices
                .extend_from_slice(&[base + tri[0], base + tri[2], base + tri[1]]);
        }
    }

    if geometry.indices.is_empty() {
        return Err(GeometryError::Empty {
            path: path.to_path_buf(),
        });
    }

    if !has_normals {
        generate_normals(&mut geometry);
    }
    generate_tangents(&mut geometry);

    log::debug!(
        "loaded '{}': {} vertices, {} triangles",
        path.display(),
        geometry.vertices.len(),
        geometry.triangle_count()
    );
    Ok(geometry)
}

fn generate_normals(geometry: &mut Geometry<VertexPosTex>) {
    let mut normals = vec![Vec3::ZERO; geometry.vertices.len()];
    for tri in geometry.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let p = |i: usize| Vec3::from(geometry.vertices[i].position);
        let face = (p(b) - p(a)).cross(p(c) - p(a));
        for i in [a, b, c] {
            normals[i] += face;
        }
    }
    for (vertex, n) in geometry.vertices.iter_mut().zip(normals) {
        vertex.normal = n.normalize_or_zero().into();
    }
}

/// Per-vertex tangents from UV gradients, orthogonalised against the normal.
fn generate_tangents(geometry: &mut Geometry<VertexPosTex>) {
    let mut tangents = vec![Vec3::ZERO; geometry.vertices.len()];

    for tri in geometry.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let v = &geometry.vertices;

        let e1 = Vec3::from(v[b].position) - Vec3::from(v[a].position);
        let e2 = Vec3::from(v[c].position) - Vec3::from(v[a].position);
        let d1 = Vec2::from(v[b].uv) - Vec2::from(v[a].uv);
        let d2 = Vec2::from(v[c].uv) - Vec2::from(v[a].uv);

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let tangent = (e1 * d2.y - e2 * d1.y) / det;
        for i in [a, b, c] {
            tangents[i] += tangent;
        }
    }

    for (vertex, t) in geometry.vertices.iter_mut().zip(tangents) {
        let n = Vec3::from(vertex.normal);
        let t = (t - n * n.dot(t)).normalize_or_zero();
        vertex.tangent = if t == Vec3::ZERO {
            n.any_orthonormal_vector().into()
        } else {
            t.into()
        };
    }
}

/// Face frames of a unit cube: outward normal and the face's "up" direction.
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::NEG_Z, Vec3::Y),
    (Vec3::Z, Vec3::Y),
    (Vec3::X, Vec3::Y),
    (Vec3::NEG_X, Vec3::Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
];

/// Corners of a face seen from outside: top-left, top-right, bottom-right, bottom-left.
fn face_corners(center: Vec3, normal: Vec3, up: Vec3, half_w: f32, half_h: f32) -> [Vec3; 4] {
    let right = normal.cross(up);
    let (r, u) = (right * half_w, up * half_h);
    [center - r + u, center + r + u, center + r - u, center - r - u]
}

/// Two clockwise triangles over a quad starting at `base`.
fn quad_indices(base: u32) -> [u32; 6] {
    [base, base + 1, base + 2, base, base + 2, base + 3]
}

const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

pub fn textured_cube(size: f32) -> Geometry<VertexPosTex> {
    let half = size * 0.5;
    let mut geometry = Geometry::default();

    for (normal, up) in CUBE_FACES {
        let base = geometry.vertices.len() as u32;
        let corners = face_corners(normal * half, normal, up, half, half);
        let tangent = normal.cross(up);
        for (corner, uv) in corners.into_iter().zip(QUAD_UVS) {
            geometry.vertices.push(VertexPosTex {
                position: corner.into(),
                uv,
                normal: normal.into(),
                tangent: tangent.into(),
            });
        }
        geometry.indices.extend_from_slice(&quad_indices(base));
    }
    geometry
}

pub fn colored_cube(size: f32) -> Geometry<VertexPosCol> {
    let half = size * 0.5;
    let mut geometry = Geometry::default();

    for (normal, up) in CUBE_FACES {
        let base = geometry.vertices.len() as u32;
        // Opposite faces share an axis colour; the negative one is darker.
        let color = if normal.min_element() < 0.0 {
            normal.abs() * 0.5
        } else {
            normal
        };
        for corner in face_corners(normal * half, normal, up, half, half) {
            geometry.vertices.push(VertexPosCol {
                position: corner.into(),
                color: color.into(),
            });
        }
        geometry.indices.extend_from_slice(&quad_indices(base));
    }
    geometry
}

pub fn quad(width: f32, height: f32, center: Vec3) -> Geometry<VertexPosTex> {
    let (normal, up) = (Vec3::NEG_Z, Vec3::Y);
    let corners = face_corners(center, normal, up, width * 0.5, height * 0.5);
    let tangent = normal.cross(up);

    Geometry {
        vertices: corners
            .into_iter()
            .zip(QUAD_UVS)
            .map(|(corner, uv)| VertexPosTex {
                position: corner.into(),
                uv,
                normal: normal.into(),
                tangent: tangent.into(),
            })
            .collect(),
        indices: quad_indices(0).to_vec(),
    }
}

fn colored_by_normal(geometry: &Geometry<VertexPosTex>) -> Geometry<VertexPosCol> {
    Geometry {
        vertices: geometry
            .vertices
            .iter()
            .map(|v| VertexPosCol {
                position: v.position,
                color: (Vec3::from(v.normal) * 0.5 + Vec3::splat(0.5)).into(),
            })
            .collect(),
        indices: geometry.indices.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clockwise seen from outside means the LH face normal points away from the centre.
    fn assert_outward_winding(positions: &[Vec3], indices: &[u32]) {
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| positions[i as usize]);
            let face = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face.dot(centroid) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn cubes_have_closed_outward_faces() {
        let textured = textured_cube(2.0);
        assert_eq!(textured.vertices.len(), 24);
        assert_eq!(textured.indices.len(), 36);
        let positions: Vec<Vec3> = textured.vertices.iter().map(|v| v.position.into()).collect();
        assert_outward_winding(&positions, &textured.indices);
        assert!(positions.iter().all(|p| p.abs().max_element() == 1.0));

        let colored = colored_cube(2.0);
        let positions: Vec<Vec3> = colored.vertices.iter().map(|v| v.position.into()).collect();
        assert_outward_winding(&positions, &colored.indices);
    }

    #[test]
    fn cube_tangents_follow_u() {
        let cube = textured_cube(1.0);
        for face in cube.vertices.chunks_exact(4) {
            let (tl, tr) = (Vec3::from(face[0].position), Vec3::from(face[1].position));
            let along_u = (tr - tl).normalize();
            assert!(along_u.abs_diff_eq(face[0].tangent.into(), 1e-6));
        }
    }

    #[test]
    fn quad_faces_the_default_camera() {
        let q = quad(4.0, 2.0, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(q.triangle_count(), 2);
        let p: Vec<Vec3> = q.vertices.iter().map(|v| v.position.into()).collect();
        assert_eq!(p[0], Vec3::new(-2.0, 2.0, 0.0));
        assert_eq!(p[2], Vec3::new(2.0, 0.0, 0.0));
        // Viewed from -z, the first triangle runs clockwise.
        let face = (p[1] - p[0]).cross(p[2] - p[0]);
        assert!(face.z < 0.0);
    }

    #[test]
    fn obj_import_converts_handedness() {
        let path = std::env::temp_dir().join(format!("prism-geometry-{}.obj", std::process::id()));
        std::fs::write(
            &path,
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n",
        )
        .unwrap();

        let geometry = load_obj(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(geometry.indices, vec![0, 2, 1]);
        assert_eq!(geometry.vertices[0].normal, [0.0, 0.0, -1.0]);
        assert_eq!(geometry.vertices[1].uv, [1.0, 1.0]);
        assert_eq!(geometry.vertices[2].uv, [0.0, 0.0]);
        assert!(Vec3::from(geometry.vertices[0].tangent).abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn missing_obj_is_reported() {
        let err = load_obj(Path::new("does/not/exist.obj")).unwrap_err();
        assert!(matches!(err, GeometryError::Obj { .. }));
    }
}
