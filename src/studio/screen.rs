//! Studio screen controller
//!
//! Owns the parameter store and everything that reads it. The UI writes
//! through [`StudioScreen::params_mut`]; the app calls [`StudioScreen::tick`]
//! once per redraw.

use std::time::Instant;

use cgmath::{Vector2, Vector3};

use super::{
    camera_animator::CameraAnimator,
    drag::PointerListeners,
    floating_window::FloatingWindow,
    params::{CameraEdit, ParameterStore, SceneParameters},
    render_loop::{FrameUpdate, RenderLoop, SceneSink},
    scene_graph::SceneGraph,
    shadows::SoftShadowAccumulator,
};
use crate::config::StudioConfig;

#[derive(Debug)]
pub struct StudioScreen {
    store: ParameterStore,
    graph: SceneGraph,
    render_loop: RenderLoop,
    window: FloatingWindow,
    listeners: PointerListeners,
}

impl StudioScreen {
    pub fn new(config: &StudioConfig) -> Self {
        let store = ParameterStore::new(SceneParameters::default());
        let animator = CameraAnimator::new(
            store.camera_target(),
            config.camera.damping,
            config.camera.epsilon,
        );
        let accumulator =
            SoftShadowAccumulator::new(config.shadow_settings()).with_debug(config.shadow_debug);
        let listeners = PointerListeners::new();

        Self {
            store,
            graph: SceneGraph::studio(),
            render_loop: RenderLoop::new(accumulator, animator),
            window: FloatingWindow::new(listeners.clone()),
            listeners,
        }
    }

    pub fn params(&self) -> &ParameterStore {
        &self.store
    }

    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    /// Restores the default camera target; the eye glides back over the
    /// following ticks
    pub fn reset_camera(&mut self) {
        self.store.edit_camera(CameraEdit::Reset);
    }

    /// Live camera eye, as opposed to the published target
    pub fn camera_eye(&self) -> Vector3<f32> {
        self.render_loop.animator().live()
    }

    /// Moves the live eye from orbit input
    pub fn orbit_camera(&mut self, eye: Vector3<f32>) {
        self.render_loop.camera_moved(eye);
    }

    pub fn floating_window(&self) -> &FloatingWindow {
        &self.window
    }

    pub fn open_assistant(&mut self) {
        self.window.open();
    }

    pub fn close_assistant(&mut self) {
        self.window.close();
    }

    pub fn continue_to_chat(&self) {
        self.window.continue_to_chat();
    }

    /// True while a drag holds window-wide pointer listeners
    pub fn is_capturing_pointer(&self) -> bool {
        self.listeners.is_capturing()
    }

    /// Returns true if the press was consumed by the floating window
    pub fn pointer_down(&mut self, pointer: Vector2<f32>) -> bool {
        self.window.pointer_down(pointer)
    }

    pub fn pointer_move(&mut self, pointer: Vector2<f32>) -> bool {
        self.window.pointer_move(pointer)
    }

    pub fn pointer_up(&mut self) {
        self.window.pointer_up();
    }

    /// Pushes the full state to the next sink ticked
    pub fn invalidate(&mut self) {
        self.render_loop.invalidate();
    }

    pub fn tick<S: SceneSink + ?Sized>(&mut self, now: Instant, sink: &mut S) -> FrameUpdate {
        self.render_loop
            .tick(now, &self.store, &mut self.graph, sink)
    }
}

impl Default for StudioScreen {
    fn default() -> Self {
        Self::new(&StudioConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::{
        params::{Axis, DEFAULT_CAMERA_TARGET},
        render_loop::SceneDiff,
        shadows::AccumulationStep,
    };

    #[derive(Default)]
    struct NullSink;

    impl SceneSink for NullSink {
        fn apply(&mut self, _diff: &SceneDiff) {}
        fn accumulate_shadows(&mut self, _step: &AccumulationStep) {}
        fn set_camera_eye(&mut self, _eye: Vector3<f32>) {}
    }

    #[test]
    fn test_camera_edit_then_reset_returns_home() {
        let mut screen = StudioScreen::default();
        let mut sink = NullSink;
        let now = Instant::now();

        screen.params_mut().edit_camera(CameraEdit::Axis(Axis::X, 6.0));
        for _ in 0..20 {
            screen.tick(now, &mut sink);
        }
        assert!(screen.camera_eye().x > 0.0);

        screen.reset_camera();
        assert_eq!(screen.params().camera_target(), DEFAULT_CAMERA_TARGET);
        for _ in 0..1_000 {
            screen.tick(now, &mut sink);
        }
        assert_eq!(screen.camera_eye(), DEFAULT_CAMERA_TARGET);
    }

    #[test]
    fn test_orbit_is_pulled_back_to_target() {
        let mut screen = StudioScreen::default();
        let mut sink = NullSink;
        screen.orbit_camera(Vector3::new(4.0, 5.0, 8.0));
        let eye = screen.tick(Instant::now(), &mut sink).camera_eye;
        assert!(eye.x < 4.0);
    }

    #[test]
    fn test_window_drag_captures_pointer() {
        let mut screen = StudioScreen::default();
        assert!(!screen.pointer_down(Vector2::new(30.0, 30.0)));

        screen.open_assistant();
        assert!(screen.pointer_down(Vector2::new(30.0, 30.0)));
        assert!(screen.is_capturing_pointer());

        screen.pointer_move(Vector2::new(50.0, 60.0));
        screen.pointer_up();
        assert!(!screen.is_capturing_pointer());
        assert_eq!(screen.floating_window().position(), Vector2::new(40.0, 50.0));
    }

    #[test]
    fn test_closing_mid_drag_releases_capture() {
        let mut screen = StudioScreen::default();
        screen.open_assistant();
        screen.pointer_down(Vector2::new(30.0, 30.0));
        screen.close_assistant();
        assert!(!screen.is_capturing_pointer());
        assert!(!screen.floating_window().is_open());
    }
}
