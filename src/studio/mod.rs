//! GPU-free studio core: parameters, scene derivation and the per-frame loop

pub mod camera_animator;
pub mod drag;
pub mod environment;
pub mod floating_window;
pub mod params;
pub mod render_loop;
pub mod scene_graph;
pub mod screen;
pub mod shadows;

pub use params::{ParameterStore, SceneParameters};
pub use render_loop::{SceneDiff, SceneSink};
pub use screen::StudioScreen;
