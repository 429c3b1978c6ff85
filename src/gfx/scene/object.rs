use wgpu::{util::DeviceExt, Device};

use super::vertex::Vertex3D;
use crate::{
    gfx::{
        geometry::GeometryData,
        resources::{
            material::{MaterialBindings, MaterialUBO, MaterialUniform},
            TextureResource,
        },
    },
    studio::scene_graph::Primitive,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Uploaded vertex and index buffers
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl Mesh {
    pub fn from_geometry(device: &Device, geometry: &GeometryData, label: &str) -> Self {
        let vertices: Vec<Vertex3D> = geometry.to_vertices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }
}

/// Per-primitive uniform (group 1)
///
/// MUST match `Object` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// x: casts shadow, y: receives shadow
    pub flags: [f32; 4],
}

pub type ObjectUBO = UniformBuffer<ObjectUniform>;

/// Shared layout for [`ObjectUniform`] bind groups
pub struct ObjectBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl ObjectBindings {
    pub fn new(device: &Device) -> Self {
        Self {
            bind_group_layout: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .create(device, "Object Bind Group Layout"),
        }
    }

    pub fn create_bind_group(&self, device: &Device, ubo: &ObjectUBO, label: &str) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, label)
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

/// GPU side of one scene primitive: mesh, object uniform and material
pub struct GpuPrimitive {
    pub name: String,
    pub mesh: Mesh,
    uniform: ObjectUniform,
    object_ubo: ObjectUBO,
    object_bind_group: wgpu::BindGroup,
    // kept alive for the bind group
    _material_ubo: MaterialUBO,
    material_bind_group: wgpu::BindGroup,
}

impl GpuPrimitive {
    /// `texture` is bound as the colour texture; `textured` tells the shader
    /// whether to sample it
    pub fn new(
        device: &Device,
        primitive: &Primitive,
        object_bindings: &ObjectBindings,
        material_bindings: &MaterialBindings,
        texture: &TextureResource,
        textured: bool,
    ) -> Self {
        let geometry = GeometryData::for_shape(&primitive.shape);
        let mesh = Mesh::from_geometry(device, &geometry, &primitive.name);

        let uniform = ObjectUniform {
            model: primitive.transform().into(),
            flags: [
                flag(primitive.shadows.cast),
                flag(primitive.shadows.receive),
                0.0,
                0.0,
            ],
        };
        let object_ubo = ObjectUBO::new_with_data(device, &uniform);
        let object_bind_group = object_bindings.create_bind_group(
            device,
            &object_ubo,
            &format!("{} Object Bind Group", primitive.name),
        );

        let material = MaterialUniform::from_desc(&primitive.material, textured);
        let material_ubo = MaterialUBO::new_with_data(device, &material);
        let material_bind_group = material_bindings.create_bind_group(
            device,
            &material_ubo,
            texture,
            &format!("{} Material Bind Group", primitive.name),
        );

        log::debug!(
            "Uploaded '{}': {} triangles",
            primitive.name,
            geometry.triangle_count()
        );

        Self {
            name: primitive.name.clone(),
            mesh,
            uniform,
            object_ubo,
            object_bind_group,
            _material_ubo: material_ubo,
            material_bind_group,
        }
    }

    pub fn set_transform(&mut self, transform: cgmath::Matrix4<f32>) {
        self.uniform.model = transform.into();
    }

    pub fn set_shadow_flags(&mut self, cast: bool, receive: bool) {
        self.uniform.flags[0] = flag(cast);
        self.uniform.flags[1] = flag(receive);
    }

    pub fn casts_shadow(&self) -> bool {
        self.uniform.flags[0] > 0.5
    }

    /// Writes the object uniform; a no-op when nothing changed since last time
    pub fn upload(&mut self, queue: &wgpu::Queue) {
        self.object_ubo.update_content(queue, self.uniform);
    }

    pub fn object_bind_group(&self) -> &wgpu::BindGroup {
        &self.object_bind_group
    }

    pub fn material_bind_group(&self) -> &wgpu::BindGroup {
        &self.material_bind_group
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, mesh: &'a Mesh);

    /// Binds the object uniform at `object_group` and draws the mesh
    fn draw_primitive(&mut self, primitive: &'a GpuPrimitive, object_group: u32);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, mesh: &'b Mesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    fn draw_primitive(&mut self, primitive: &'b GpuPrimitive, object_group: u32) {
        self.set_bind_group(object_group, primitive.object_bind_group(), &[]);
        self.draw_mesh(&primitive.mesh);
    }
}
