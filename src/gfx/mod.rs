//! # Graphics Module
//!
//! The wgpu side of the studio.
//!
//! - **Camera** ([`camera`]) - Y-up orbit camera and its mouse controller
//! - **Geometry** ([`geometry`]) - procedural meshes for the studio shapes
//! - **Rendering** ([`rendering`]) - pipelines, shadow passes and the
//!   [`RenderEngine`], which implements
//!   [`SceneSink`](crate::studio::SceneSink)
//! - **Resources** ([`resources`]) - uniforms, materials and textures
//! - **Scene** ([`scene`]) - uploaded meshes and per-primitive bind groups
//!
//! ```no_run
//! use viewfinder::{config::StudioConfig, gfx::RenderEngine, studio::StudioScreen};
//! # fn run(window: std::sync::Arc<winit::window::Window>) -> anyhow::Result<()> {
//! let config = StudioConfig::default();
//! let mut screen = StudioScreen::new(&config);
//! let mut engine = pollster::block_on(RenderEngine::new(
//!     window,
//!     config.window.width,
//!     config.window.height,
//!     &config,
//!     screen.scene(),
//!     screen.camera_eye(),
//! ))?;
//! screen.tick(std::time::Instant::now(), &mut engine);
//! engine.render_frame(|_, _, _, _| {});
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
