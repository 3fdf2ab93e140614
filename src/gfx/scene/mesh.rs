use cgmath::Vector3;

use super::vertex::Vertex3D;
use crate::gfx::picking::AABB;

/// A named mesh from the loaded scene graph, still on the CPU side
///
/// Vertices are in world space; the model ships with its transforms baked in.
#[derive(Clone, Debug)]
pub struct SceneMesh {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    pub bounds: AABB,
}

impl SceneMesh {
    /// Builds a mesh from flat attribute arrays as produced by OBJ parsers
    ///
    /// Normals are computed from faces when missing or mismatched, and UVs
    /// default to zero. The V axis is flipped so the baked texture samples
    /// with a top-left origin.
    pub fn from_arrays(
        name: impl Into<String>,
        positions: &[f32],
        normals: &[f32],
        texcoords: &[f32],
        indices: Vec<u32>,
    ) -> Self {
        let vertex_count = positions.len() / 3;
        let computed;
        let normals: &[f32] = if normals.len() == positions.len() {
            normals
        } else {
            computed = calculate_face_normals(positions, &indices);
            computed.as_slice()
        };
        let has_uvs = texcoords.len() == vertex_count * 2;

        let vertices: Vec<Vertex3D> = (0..vertex_count)
            .map(|i| Vertex3D {
                position: [positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]],
                normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                uv: if has_uvs {
                    [texcoords[i * 2], 1.0 - texcoords[i * 2 + 1]]
                } else {
                    [0.0, 0.0]
                },
            })
            .collect();

        let points: Vec<[f32; 3]> = vertices.iter().map(|v| v.position).collect();
        let bounds = AABB::from_vertices(&points);

        Self {
            name: name.into(),
            vertices,
            indices,
            bounds,
        }
    }

    /// Center of the bounding box, used as pivot for scaling and rotation
    pub fn pivot(&self) -> Vector3<f32> {
        self.bounds.center()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// World-space triangles, skipping any with out-of-range indices
    pub fn triangles(&self) -> Vec<[Vector3<f32>; 3]> {
        let position = |index: u32| {
            self.vertices
                .get(index as usize)
                .map(|vertex| Vector3::from(vertex.position))
        };
        self.indices
            .chunks_exact(3)
            .filter_map(|face| Some([position(face[0])?, position(face[1])?, position(face[2])?]))
            .collect()
    }
}

/// Averages face normals into per-vertex normals
pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = vec![0.0; positions.len()];
    let position = |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let face_normal = (position(i1) - position(i0)).cross(position(i2) - position(i0));
        for vertex in [i0, i1, i2] {
            normals[vertex * 3] += face_normal.x;
            normals[vertex * 3 + 1] += face_normal.y;
            normals[vertex * 3 + 2] += face_normal.z;
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
        if length > 0.0 {
            normal.iter_mut().for_each(|n| *n /= length);
        }
    }

    normals
}

#[cfg(test)]
pub(crate) fn unit_cube(name: &str, center: Vector3<f32>) -> SceneMesh {
    let mut positions = Vec::new();
    for corner in 0..8 {
        positions.push(center.x + if corner & 1 == 0 { -0.5 } else { 0.5 });
        positions.push(center.y + if corner & 2 == 0 { -0.5 } else { 0.5 });
        positions.push(center.z + if corner & 4 == 0 { -0.5 } else { 0.5 });
    }
    let indices = vec![
        0, 1, 3, 0, 3, 2, 4, 6, 7, 4, 7, 5, 0, 4, 5, 0, 5, 1, 2, 3, 7, 2, 7, 6, 0, 2, 6, 0, 6, 4,
        1, 5, 7, 1, 7, 3,
    ];
    SceneMesh::from_arrays(name, &positions, &[], &[], indices)
}
