//! Polygon mesh produced by the mesher and stored in OBJ files.

use glam::DVec3;

/// Indexed polygon mesh.
///
/// Face indices are 0-based into `vertices`. Faces are usually triangles but
/// any arity of three or more is kept as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<DVec3>,
    pub faces: Vec<Vec<u32>>,
}

impl MeshData {
    pub fn new(vertices: Vec<DVec3>, faces: Vec<Vec<u32>>) -> Self {
        Self { vertices, faces }
    }

    /// Creates a mesh from triangles.
    pub fn from_triangles(vertices: Vec<DVec3>, triangles: &[[u32; 3]]) -> Self {
        Self {
            vertices,
            faces: triangles.iter().map(|t| t.to_vec()).collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// A mesh with no vertices is empty, whatever its face list says.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns the first face index that does not name a vertex, if any.
    pub fn first_invalid_index(&self) -> Option<u32> {
        let count = self.vertices.len();
        self.faces
            .iter()
            .flatten()
            .copied()
            .find(|&i| i as usize >= count)
    }
}
