//! GPU-side scene objects
//!
//! - [`Vertex3D`] - vertex layout shared by every pipeline that takes vertex buffers
//! - [`GpuPrimitive`] - uploaded mesh plus object and material bind groups for
//!   one studio primitive
//! - [`DrawMesh`] - draw helpers on `wgpu::RenderPass`

pub mod object;
pub mod vertex;

pub use object::{DrawMesh, GpuPrimitive, Mesh, ObjectBindings, ObjectUniform};
pub use vertex::Vertex3D;
