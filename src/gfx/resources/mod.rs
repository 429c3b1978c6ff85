//! GPU resource management
//!
//! Handles textures, uniform buffers, and bind groups for rendering.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUBO, GlobalUniform, LightUBO, LightUniform};
pub use material::{MaterialBindings, MaterialUniform};
pub use texture_resource::{TextureError, TextureResource};
