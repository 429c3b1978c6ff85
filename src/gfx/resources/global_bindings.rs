//! Global uniform bindings for camera and scene data
//!
//! Everything shared by all draws in the main pass lives in one uniform
//! buffer at group 0: camera, key light, ambient term, soft-shadow catcher
//! and grid parameters. Light-space matrices for shadow passes are built
//! here too so the key light and the jittered sample lights agree.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::{
    gfx::camera::{camera_utils::CameraUniform, orbit_camera::OPENGL_TO_WGPU_MATRIX},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Half extent of the orthographic light frustum; covers the whole studio
pub const LIGHT_FRUSTUM_HALF_EXTENT: f32 = 15.0;
/// Distance from the origin at which shadow passes place the light
const LIGHT_DISTANCE: f32 = 30.0;

/// Grid line spacing, matching the usual drei grid defaults
pub const GRID_CELL_SIZE: f32 = 0.5;
pub const GRID_SECTION_SIZE: f32 = 1.0;
pub const GRID_FADE_DISTANCE: f32 = 100.0;

/// Global uniform buffer content
///
/// MUST match `Globals` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz: unit vector towards the key light, w: 1 if it casts shadows
    pub to_light: [f32; 4],
    /// w: intensity
    pub light_color: [f32; 4],
    /// w: intensity
    pub ambient: [f32; 4],
    /// x: enabled, y: catcher half extent, z: catcher height, w: opacity
    pub shadow_params: [f32; 4],
    pub shadow_tint: [f32; 4],
    /// x: visible, y: cell size, z: section size, w: fade distance
    pub grid: [f32; 4],
}

impl Default for GlobalUniform {
    fn default() -> Self {
        let camera = CameraUniform::default();
        Self {
            view_position: camera.view_position,
            view_proj: camera.view_proj,
            light_view_proj: light_view_proj(Vector3::new(5.0, 5.0, 5.0)).into(),
            to_light: [0.577_350_3, 0.577_350_3, 0.577_350_3, 1.0],
            light_color: [1.0, 1.0, 1.0, 1.0],
            ambient: [1.0, 1.0, 1.0, 0.1],
            shadow_params: [0.0; 4],
            shadow_tint: [0.0, 0.0, 0.0, 1.0],
            grid: [0.0, GRID_CELL_SIZE, GRID_SECTION_SIZE, GRID_FADE_DISTANCE],
        }
    }
}

impl GlobalUniform {
    pub fn set_camera(&mut self, camera: &CameraUniform) {
        self.view_position = camera.view_position;
        self.view_proj = camera.view_proj;
    }
}

pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Per-light uniform used by the depth and accumulation passes
///
/// MUST match `Light` in `shadow_pass.wgsl` and `shadow_accumulate.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub view_proj: [[f32; 4]; 4],
    /// x: catcher half extent, y: catcher height
    pub catcher: [f32; 4],
}

impl LightUniform {
    pub fn new(position: Vector3<f32>, catcher_half_extent: f32, catcher_height: f32) -> Self {
        Self {
            view_proj: light_view_proj(position).into(),
            catcher: [catcher_half_extent, catcher_height, 0.0, 0.0],
        }
    }
}

pub type LightUBO = UniformBuffer<LightUniform>;

/// Orthographic view-projection of a directional light shining from
/// `position` towards the origin
pub fn light_view_proj(position: Vector3<f32>) -> Matrix4<f32> {
    let direction = if position.magnitude2() > f32::EPSILON {
        position.normalize()
    } else {
        Vector3::unit_y()
    };
    let up = if direction.y.abs() > 0.99 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };

    let eye = Point3::new(0.0, 0.0, 0.0) + direction * LIGHT_DISTANCE;
    let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), up);
    let e = LIGHT_FRUSTUM_HALF_EXTENT;
    let proj = cgmath::ortho(-e, e, -e, e, 0.1, LIGHT_DISTANCE * 2.0);
    OPENGL_TO_WGPU_MATRIX * proj * view
}

/// Bind group layout and bind group for the global uniform (group 0)
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector4, Zero};

    fn to_ndc(m: Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
        let clip = m * p.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn test_uniform_sizes_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<GlobalUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightUniform>(), 80);
    }

    #[test]
    fn test_origin_is_centred_in_light_space() {
        let ndc = to_ndc(light_view_proj(Vector3::new(5.0, 5.0, 5.0)), Vector3::zero());
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_catcher_corners_fit_light_frustum() {
        let m = light_view_proj(Vector3::new(5.0, 5.0, 5.0));
        for (x, z) in [(-10.0, -10.0), (10.0, -10.0), (-10.0, 10.0), (10.0, 10.0)] {
            let ndc = to_ndc(m, Vector3::new(x, -0.49, z));
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{ndc:?}");
            assert!((0.0..=1.0).contains(&ndc.z));
        }
    }

    #[test]
    fn test_overhead_light_has_valid_basis() {
        let m = light_view_proj(Vector3::new(0.0, 8.0, 0.0));
        let clip: Vector4<f32> = m * Vector4::new(1.0, 0.0, 1.0, 1.0);
        assert!(clip.x.is_finite() && clip.y.is_finite() && clip.z.is_finite());

        let zero = light_view_proj(Vector3::zero());
        assert!(zero.x.x.is_finite());
    }

    #[test]
    fn test_closer_points_have_smaller_depth() {
        let m = light_view_proj(Vector3::new(0.0, 10.0, 2.0));
        let high = to_ndc(m, Vector3::new(0.0, 3.0, 0.0));
        let low = to_ndc(m, Vector3::new(0.0, -0.49, 0.0));
        assert!(high.z < low.z);
    }
}
