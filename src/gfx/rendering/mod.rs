//! Frame rendering
//!
//! Pipelines, the shadow passes and the render engine that ties them to the
//! studio scene.

pub mod pipeline_manager;
pub mod render_engine;
pub mod soft_shadows;

pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use soft_shadows::SoftShadows;
