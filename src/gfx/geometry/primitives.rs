//! # Primitive Shape Generation
//!
//! Y-up primitive shapes built at their final size, with outward normals,
//! texture coordinates and counter-clockwise front faces.

use super::GeometryData;
use std::f32::consts::PI;

/// Box centred at the origin with the given extents along X, Y and Z
pub fn generate_cuboid(width: f32, height: f32, depth: f32) -> GeometryData {
    let mut data = GeometryData::new();
    let half = [width * 0.5, height * 0.5, depth * 0.5];

    // (normal, u axis, v axis) with u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    for (normal, u, v) in faces {
        let base = data.vertices.len() as u32;
        for (su, sv) in corners {
            let position = [0, 1, 2].map(|k| (normal[k] + su * u[k] + sv * v[k]) * half[k]);
            data.vertices.push(position);
            data.normals.push(normal);
            data.tex_coords.push([(su + 1.0) * 0.5, (1.0 - sv) * 0.5]);
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// UV sphere centred at the origin
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
pub fn generate_sphere(radius: f32, longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = [sin_theta * cos_phi, cos_theta, sin_theta * sin_phi];
            data.vertices.push(normal.map(|c| c * radius));
            data.normals.push(normal);
            data.tex_coords
                .push([long as f32 / long_segs as f32, lat as f32 / lat_segs as f32]);
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices.extend_from_slice(&[first, first + 1, second]);
            data.indices.extend_from_slice(&[second, first + 1, second + 1]);
        }
    }

    data
}

/// Plane in the local XY plane facing +Z
///
/// Rotate it into place with the primitive transform, e.g. -90 degrees
/// about X for a floor.
pub fn generate_plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let w_segs = width_segments.max(1);
    let h_segs = height_segments.max(1);

    for y in 0..=h_segs {
        let v = y as f32 / h_segs as f32;
        let pos_y = (v - 0.5) * height;

        for x in 0..=w_segs {
            let u = x as f32 / w_segs as f32;
            let pos_x = (u - 0.5) * width;

            data.vertices.push([pos_x, pos_y, 0.0]);
            data.normals.push([0.0, 0.0, 1.0]);
            data.tex_coords.push([u, 1.0 - v]);
        }
    }

    for y in 0..h_segs {
        for x in 0..w_segs {
            let i = y * (w_segs + 1) + x;
            let next_row = i + w_segs + 1;

            data.indices.extend_from_slice(&[i, i + 1, next_row]);
            data.indices.extend_from_slice(&[i + 1, next_row + 1, next_row]);
        }
    }

    data
}

/// Capped cylinder along Y, centred at the origin
pub fn generate_cylinder(radius: f32, height: f32, segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let segs = segments.max(3);
    let half_height = height * 0.5;
    let ring = |i: u32| {
        let angle = i as f32 * 2.0 * PI / segs as f32;
        angle.sin_cos()
    };

    // Side: interleaved bottom/top vertices
    for i in 0..=segs {
        let (sin_a, cos_a) = ring(i);
        let u = i as f32 / segs as f32;

        data.vertices.push([radius * cos_a, -half_height, radius * sin_a]);
        data.normals.push([cos_a, 0.0, sin_a]);
        data.tex_coords.push([u, 1.0]);

        data.vertices.push([radius * cos_a, half_height, radius * sin_a]);
        data.normals.push([cos_a, 0.0, sin_a]);
        data.tex_coords.push([u, 0.0]);
    }

    for i in 0..segs {
        let bottom = i * 2;
        let top = bottom + 1;
        let bottom_next = bottom + 2;
        let top_next = bottom + 3;

        data.indices.extend_from_slice(&[bottom, top, bottom_next]);
        data.indices.extend_from_slice(&[top, top_next, bottom_next]);
    }

    // Caps get their own rim vertices so their normals stay flat
    for (y, normal_y) in [(-half_height, -1.0), (half_height, 1.0)] {
        let center = data.vertices.len() as u32;
        data.vertices.push([0.0, y, 0.0]);
        data.normals.push([0.0, normal_y, 0.0]);
        data.tex_coords.push([0.5, 0.5]);

        for i in 0..=segs {
            let (sin_a, cos_a) = ring(i);
            data.vertices.push([radius * cos_a, y, radius * sin_a]);
            data.normals.push([0.0, normal_y, 0.0]);
            data.tex_coords.push([0.5 + cos_a * 0.5, 0.5 + sin_a * 0.5]);
        }

        for i in 0..segs {
            let current = center + 1 + i;
            let next = current + 1;
            if normal_y > 0.0 {
                data.indices.extend_from_slice(&[center, next, current]);
            } else {
                data.indices.extend_from_slice(&[center, current, next]);
            }
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Every triangle's winding must agree with its vertex normals
    fn assert_front_faces_outward(data: &GeometryData) {
        for tri in data.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| tri[k] as usize);
            let face = cross(
                sub(data.vertices[b], data.vertices[a]),
                sub(data.vertices[c], data.vertices[a]),
            );
            let n = [0, 1, 2].map(|k| data.normals[a][k] + data.normals[b][k] + data.normals[c][k]);
            let dot = face[0] * n[0] + face[1] * n[1] + face[2] * n[2];
            assert!(dot >= -1e-6, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn test_cuboid_generation() {
        let cube = generate_cuboid(1.0, 2.0, 1.0);
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.triangle_count(), 12);
        let max_y = cube.vertices.iter().map(|v| v[1]).fold(f32::MIN, f32::max);
        assert_eq!(max_y, 1.0);
        assert_front_faces_outward(&cube);
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = generate_sphere(0.7, 16, 8);
        assert_eq!(sphere.vertices.len(), sphere.normals.len());
        assert_eq!(sphere.vertices.len(), sphere.tex_coords.len());
        for v in &sphere.vertices {
            let r = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            assert!((r - 0.7).abs() < 1e-5);
        }
        assert_front_faces_outward(&sphere);
    }

    #[test]
    fn test_plane_generation() {
        let plane = generate_plane(2.0, 2.0, 2, 2);
        assert_eq!(plane.vertices.len(), 9);
        assert_eq!(plane.indices.len(), 24);
        assert_front_faces_outward(&plane);
    }

    #[test]
    fn test_cylinder_generation() {
        let cylinder = generate_cylinder(0.5, 1.0, 12);
        let (min_y, max_y) = cylinder
            .vertices
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v[1]), hi.max(v[1])));
        assert_eq!((min_y, max_y), (-0.5, 0.5));
        assert_front_faces_outward(&cylinder);
    }
}
