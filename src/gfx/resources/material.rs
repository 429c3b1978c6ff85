//! Material uniforms and bind groups
//!
//! Every primitive owns its material uniform; all of them share one layout
//! (uniform + colour texture + sampler) at group 2. Untextured materials
//! bind a 1x1 white texture so the shader path is the same.

use wgpu::Device;

use super::texture_resource::TextureResource;
use crate::{
    studio::scene_graph::{MaterialDesc, SurfaceTexture},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// GPU uniform data for materials
///
/// MUST match `Material` in `pbr.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear RGB, alpha
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    /// Texture repeats across the surface
    pub uv_scale: f32,
    /// 1 when the colour texture should be sampled
    pub textured: f32,
}

impl MaterialUniform {
    /// `textured` says whether a real texture will be bound for this material
    pub fn from_desc(desc: &MaterialDesc, textured: bool) -> Self {
        let [r, g, b] = desc.color.to_array().map(srgb_to_linear);
        let uv_scale = match desc.texture {
            SurfaceTexture::Floor { repeat } => repeat,
            SurfaceTexture::None => 1.0,
        };
        Self {
            base_color: [r, g, b, 1.0],
            metallic: desc.metallic.clamp(0.0, 1.0),
            roughness: desc.roughness.clamp(0.04, 1.0),
            uv_scale,
            textured: if textured { 1.0 } else { 0.0 },
        }
    }
}

pub type MaterialUBO = UniformBuffer<MaterialUniform>;

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Shared material bind group layout
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(device, "Material Bind Group Layout");

        MaterialBindings { bind_group_layout }
    }

    pub fn create_bind_group(
        &self,
        device: &Device,
        ubo: &MaterialUBO,
        texture: &TextureResource,
        label: &str,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .texture(&texture.view)
            .sampler(&texture.sampler)
            .create(device, label)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::params::Rgb;

    #[test]
    fn test_srgb_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((srgb_to_linear(0.5) - 0.214).abs() < 1e-3);
    }

    #[test]
    fn test_floor_material_repeats_texture() {
        let desc = MaterialDesc {
            texture: SurfaceTexture::Floor { repeat: 10.0 },
            ..MaterialDesc::matte(Rgb::WHITE)
        };
        let uniform = MaterialUniform::from_desc(&desc, true);
        assert_eq!(uniform.uv_scale, 10.0);
        assert_eq!(uniform.textured, 1.0);
        assert_eq!(uniform.base_color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_failed_texture_renders_base_colour() {
        let desc = MaterialDesc {
            texture: SurfaceTexture::Floor { repeat: 10.0 },
            ..MaterialDesc::matte(Rgb::WHITE)
        };
        assert_eq!(MaterialUniform::from_desc(&desc, false).textured, 0.0);
    }
}
