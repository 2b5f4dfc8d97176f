//! # Vertex Module
//!
//! Defines the [`Vertex`] layout shared by every mesh and turns scene [`Geometry`] into
//! triangle lists ready for upload.
//!
//! ## Vertex Layout
//!
//! | Location | Field      | Format      | Meaning                                   |
//! |----------|------------|-------------|-------------------------------------------|
//! | 0        | `position` | `Float32x4` | Homogeneous position in the node's space. |
//! | 1        | `color`    | `Float32x4` | Per-vertex shade, multiplied by material. |
//!
//! The shade carries a cheap fixed lighting term (each cuboid face gets its own brightness) so
//! placed objects read as solid without a lighting pass. The material color is applied in the
//! shader from the per-node uniform.

use crate::scene::Geometry;

/// A single vertex as laid out in the vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    position: [f32; 4],
    color: [f32; 4],
}

impl Vertex {
    pub fn new(position: [f32; 3], shade: f32) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color: [shade, shade, shade, 1.0],
        }
    }

    pub fn position(&self) -> [f32; 3] {
        [self.position[0], self.position[1], self.position[2]]
    }

    /// Shader-visible attributes: `0 => position`, `1 => color`.
    pub fn vertex_attributes() -> Vec<wgpu::VertexAttribute> {
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4].to_vec()
    }

    /// Buffer layout for a tightly packed array of vertices.
    pub fn description(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// Triangle-list geometry for one mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn from_geometry(geometry: &Geometry) -> Self {
        match *geometry {
            Geometry::Ring {
                inner_radius,
                outer_radius,
                segments,
            } => Self::ring(inner_radius, outer_radius, segments.max(3)),
            Geometry::Cuboid { size } => Self::cuboid(size),
        }
    }

    /// A flat annulus in the XZ plane. Seam vertices are duplicated so every segment is
    /// independent.
    fn ring(inner_radius: f32, outer_radius: f32, segments: u32) -> Self {
        let mut mesh = Self::default();
        for i in 0..=segments {
            let angle = std::f32::consts::TAU * i as f32 / segments as f32;
            let (sin, cos) = angle.sin_cos();
            mesh.vertices
                .push(Vertex::new([inner_radius * cos, 0.0, inner_radius * sin], 1.0));
            mesh.vertices
                .push(Vertex::new([outer_radius * cos, 0.0, outer_radius * sin], 1.0));
        }
        for i in 0..segments {
            let inner = 2 * i;
            let outer = inner + 1;
            let next_inner = inner + 2;
            let next_outer = inner + 3;
            mesh.indices
                .extend_from_slice(&[inner, next_inner, outer, outer, next_inner, next_outer]);
        }
        mesh
    }

    fn cuboid(size: [f32; 3]) -> Self {
        let [x, y, z] = size.map(|extent| extent * 0.5);
        // (corners, shade) per face; corners wind counter-clockwise seen from outside.
        let faces: [([[f32; 3]; 4], f32); 6] = [
            ([[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]], 0.8),
            ([[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]], 0.7),
            ([[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]], 1.0),
            ([[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]], 0.5),
            ([[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]], 0.9),
            ([[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]], 0.6),
        ];

        let mut mesh = Self::default();
        for (corners, shade) in faces {
            let base = mesh.vertices.len() as u32;
            mesh.vertices
                .extend(corners.iter().map(|corner| Vertex::new(*corner, shade)));
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_flat_and_within_radii() {
        let mesh = MeshData::from_geometry(&Geometry::Ring {
            inner_radius: 0.15,
            outer_radius: 0.2,
            segments: 32,
        });

        assert_eq!(mesh.vertices.len(), 66);
        assert_eq!(mesh.indices.len(), 32 * 6);
        for vertex in &mesh.vertices {
            let [x, y, z] = vertex.position();
            assert_eq!(y, 0.0);
            let radius = (x * x + z * z).sqrt();
            assert!(radius > 0.149 && radius < 0.201);
        }
        assert!(mesh
            .indices
            .iter()
            .all(|index| (*index as usize) < mesh.vertices.len()));
    }

    #[test]
    fn test_ring_clamps_segments() {
        let mesh = MeshData::from_geometry(&Geometry::Ring {
            inner_radius: 0.1,
            outer_radius: 0.2,
            segments: 0,
        });
        assert_eq!(mesh.indices.len(), 3 * 6);
    }

    #[test]
    fn test_cuboid_spans_size() {
        let mesh = MeshData::from_geometry(&Geometry::Cuboid {
            size: [0.2, 0.4, 0.6],
        });

        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        let max = mesh.vertices.iter().fold([0.0_f32; 3], |acc, vertex| {
            let p = vertex.position();
            [acc[0].max(p[0]), acc[1].max(p[1]), acc[2].max(p[2])]
        });
        assert_eq!(max, [0.1, 0.2, 0.3]);
    }
}
