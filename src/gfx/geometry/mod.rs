//! # Procedural Geometry Generation
//!
//! Every studio primitive is generated procedurally; there are no model
//! files to load.
//!
//! ```rust
//! use viewfinder::gfx::geometry::{generate_cuboid, generate_sphere};
//!
//! let stand = generate_cuboid(1.0, 2.0, 1.0);
//! let lamp = generate_sphere(0.5, 32, 16);
//! assert!(lamp.triangle_count() > stand.triangle_count());
//! ```

pub mod primitives;

pub use primitives::*;

use crate::{gfx::scene::vertex::Vertex3D, studio::scene_graph::Shape};

const ROUND_SEGMENTS: u32 = 48;

/// Generated geometry ready for GPU upload
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<[f32; 3]>,
    /// Texture coordinates (u, v)
    pub tex_coords: Vec<[f32; 2]>,
    /// Normal vectors (x, y, z)
    pub normals: Vec<[f32; 3]>,
    /// Triangle indices (counter-clockwise winding)
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry for a scene-graph shape
    pub fn for_shape(shape: &Shape) -> Self {
        match *shape {
            Shape::Cuboid {
                width,
                height,
                depth,
            } => generate_cuboid(width, height, depth),
            Shape::Sphere { radius } => generate_sphere(radius, ROUND_SEGMENTS, ROUND_SEGMENTS / 2),
            Shape::Cylinder { radius, height } => generate_cylinder(radius, height, ROUND_SEGMENTS),
            Shape::Plane { width, height } => generate_plane(width, height, 1, 1),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Interleaves the attribute streams into the renderer's vertex format
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex3D {
                position,
                normal: self.normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: self.tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_produces_geometry() {
        for shape in [
            Shape::Cuboid {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            },
            Shape::Sphere { radius: 0.5 },
            Shape::Cylinder {
                radius: 0.5,
                height: 1.0,
            },
            Shape::Plane {
                width: 20.0,
                height: 10.0,
            },
        ] {
            let data = GeometryData::for_shape(&shape);
            assert!(data.triangle_count() > 0, "{shape:?}");
            assert_eq!(data.to_vertices().len(), data.vertex_count());
        }
    }
}
