//! Per-frame driver
//!
//! Every tick re-reads the whole [`ParameterStore`], derives the frame's
//! [`DerivedScene`], diffs it against what the sink last received and pushes
//! only the differences. The first tick (and any tick after
//! [`RenderLoop::invalidate`]) pushes everything.

use std::time::Instant;

use cgmath::{Matrix4, Vector3};

use super::{
    camera_animator::CameraAnimator,
    params::ParameterStore,
    scene_graph::{AmbientState, DerivedScene, LightState, PrimitiveId, SceneGraph},
    shadows::{AccumulationStep, SoftShadowAccumulator},
};

/// Wall-clock delta source
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; 0 on the first call and whenever
    /// `now` is not after the previous instant
    pub fn tick(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        if self.last.map_or(true, |last| now > last) {
            self.last = Some(now);
        }
        delta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

/// Fields of a [`DerivedScene`] that changed since the last apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDiff {
    pub light: Option<LightState>,
    pub ambient: Option<AmbientState>,
    pub background: Option<[f32; 3]>,
    pub transforms: Vec<(PrimitiveId, Matrix4<f32>)>,
    pub shadow_flags: Vec<(PrimitiveId, ShadowFlags)>,
    pub grid_visible: Option<bool>,
    pub shadows_enabled: Option<bool>,
}

fn changed<T: PartialEq + Copy>(previous: Option<T>, next: T) -> Option<T> {
    match previous {
        Some(previous) if previous == next => None,
        _ => Some(next),
    }
}

impl SceneDiff {
    /// Everything in `next` that differs from `previous`; a missing
    /// `previous` yields the full state
    pub fn between(previous: Option<&DerivedScene>, next: &DerivedScene) -> Self {
        let mut diff = Self {
            light: changed(previous.map(|p| p.light), next.light),
            ambient: changed(previous.map(|p| p.ambient), next.ambient),
            background: changed(previous.map(|p| p.background), next.background),
            grid_visible: changed(previous.map(|p| p.grid_visible), next.grid_visible),
            shadows_enabled: changed(previous.map(|p| p.shadows_enabled), next.shadows_enabled),
            ..Default::default()
        };

        for (id, state) in next.primitives.iter().enumerate() {
            let before = previous.and_then(|p| p.primitives.get(id));
            if let Some(transform) = changed(before.map(|b| b.transform), state.transform) {
                diff.transforms.push((id, transform));
            }
            let flags = ShadowFlags {
                cast: state.cast_shadow,
                receive: state.receive_shadow,
            };
            let before_flags = before.map(|b| ShadowFlags {
                cast: b.cast_shadow,
                receive: b.receive_shadow,
            });
            if let Some(flags) = changed(before_flags, flags) {
                diff.shadow_flags.push((id, flags));
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Receiver of per-frame scene changes, implemented by the renderer
pub trait SceneSink {
    fn apply(&mut self, diff: &SceneDiff);

    /// Queues one soft-shadow accumulation frame
    fn accumulate_shadows(&mut self, step: &AccumulationStep);

    fn set_camera_eye(&mut self, eye: Vector3<f32>);
}

/// Summary of one tick
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUpdate {
    pub delta: f32,
    pub diff: SceneDiff,
    /// Accumulation frame rendered this tick, if any
    pub shadow_frame: Option<u32>,
    pub camera_eye: Vector3<f32>,
}

#[derive(Debug)]
pub struct RenderLoop {
    clock: FrameClock,
    last_applied: Option<DerivedScene>,
    accumulator: SoftShadowAccumulator,
    animator: CameraAnimator,
    /// Eye the sink's camera currently holds
    sink_eye: Option<Vector3<f32>>,
}

impl RenderLoop {
    pub fn new(accumulator: SoftShadowAccumulator, animator: CameraAnimator) -> Self {
        Self {
            clock: FrameClock::new(),
            last_applied: None,
            accumulator,
            animator,
            sink_eye: None,
        }
    }

    pub fn animator(&self) -> &CameraAnimator {
        &self.animator
    }

    pub fn accumulator(&self) -> &SoftShadowAccumulator {
        &self.accumulator
    }

    /// Scene state as last pushed to the sink
    pub fn last_applied(&self) -> Option<&DerivedScene> {
        self.last_applied.as_ref()
    }

    /// Forces the next tick to push the full state, e.g. for a new sink
    pub fn invalidate(&mut self) {
        self.last_applied = None;
        self.sink_eye = None;
        self.accumulator.stop();
    }

    /// Records that the sink's camera was moved to `eye` outside the loop,
    /// e.g. by an orbit drag, and lets the animator continue from there
    pub fn camera_moved(&mut self, eye: Vector3<f32>) {
        self.animator.set_live(eye);
        self.sink_eye = Some(eye);
    }

    pub fn tick<S: SceneSink + ?Sized>(
        &mut self,
        now: Instant,
        store: &ParameterStore,
        graph: &mut SceneGraph,
        sink: &mut S,
    ) -> FrameUpdate {
        let delta = self.clock.tick(now);
        graph.advance(delta);

        let params = store.snapshot();
        let derived = graph.derive(&params);
        let diff = SceneDiff::between(self.last_applied.as_ref(), &derived);
        if !diff.is_empty() {
            sink.apply(&diff);
        }
        if diff.grid_visible.is_some() && self.last_applied.is_some() {
            log::debug!("Grid {}", if derived.grid_visible { "shown" } else { "hidden" });
        }
        self.last_applied = Some(derived);

        let shadow_frame = if params.show_shadows {
            self.accumulator.step(params.light_position).map(|step| {
                sink.accumulate_shadows(&step);
                step.frame
            })
        } else {
            self.accumulator.stop();
            None
        };

        let camera_eye = self.animator.tick(params.camera_target);
        if self.sink_eye != Some(camera_eye) {
            sink.set_camera_eye(camera_eye);
            self.sink_eye = Some(camera_eye);
        }

        FrameUpdate {
            delta,
            diff,
            shadow_frame,
            camera_eye,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::{
        camera_animator::{DEFAULT_DAMPING, DEFAULT_EPSILON},
        params::DEFAULT_CAMERA_TARGET,
    };
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        diffs: Vec<SceneDiff>,
        steps: Vec<AccumulationStep>,
        eyes: Vec<Vector3<f32>>,
    }

    impl SceneSink for RecordingSink {
        fn apply(&mut self, diff: &SceneDiff) {
            self.diffs.push(diff.clone());
        }

        fn accumulate_shadows(&mut self, step: &AccumulationStep) {
            self.steps.push(step.clone());
        }

        fn set_camera_eye(&mut self, eye: Vector3<f32>) {
            self.eyes.push(eye);
        }
    }

    fn render_loop() -> RenderLoop {
        RenderLoop::new(
            SoftShadowAccumulator::default(),
            CameraAnimator::new(DEFAULT_CAMERA_TARGET, DEFAULT_DAMPING, DEFAULT_EPSILON),
        )
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        assert_eq!(clock.tick(start), 0.0);
        assert!((clock.tick(start + Duration::from_millis(500)) - 0.5).abs() < 1e-6);
        assert_eq!(clock.tick(start), 0.0);
    }

    #[test]
    fn test_first_tick_applies_everything() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let store = ParameterStore::default();
        let mut sink = RecordingSink::default();

        let update = rl.tick(Instant::now(), &store, &mut graph, &mut sink);

        assert_eq!(update.delta, 0.0);
        let diff = &sink.diffs[0];
        assert!(diff.light.is_some());
        assert!(diff.ambient.is_some());
        assert!(diff.background.is_some());
        assert_eq!(diff.grid_visible, Some(false));
        assert_eq!(diff.shadows_enabled, Some(true));
        assert_eq!(diff.transforms.len(), graph.primitives().len());
        assert_eq!(diff.shadow_flags.len(), graph.primitives().len());
        assert_eq!(update.shadow_frame, Some(0));
        assert_eq!(sink.eyes, vec![DEFAULT_CAMERA_TARGET]);
    }

    #[test]
    fn test_repeated_grid_writes_produce_empty_diff() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        store.set_show_grid(true);
        rl.tick(now, &store, &mut graph, &mut sink);
        store.set_show_grid(true);
        let update = rl.tick(now, &store, &mut graph, &mut sink);

        assert!(update.diff.is_empty());
        assert_eq!(sink.diffs.len(), 1);
    }

    #[test]
    fn test_grid_toggle_diff_contains_only_grid() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        rl.tick(now, &store, &mut graph, &mut sink);
        store.set_show_grid(true);
        let update = rl.tick(now, &store, &mut graph, &mut sink);

        assert_eq!(
            update.diff,
            SceneDiff {
                grid_visible: Some(true),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_spinning_primitives_produce_transform_diffs() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let start = Instant::now();

        rl.tick(start, &store, &mut graph, &mut sink);
        let update = rl.tick(start + Duration::from_millis(16), &store, &mut graph, &mut sink);

        let ids: Vec<_> = update.diff.transforms.iter().map(|(id, _)| *id).collect();
        let expected: Vec<_> = ["Box", "Sphere", "Cylinder"]
            .iter()
            .filter_map(|name| graph.find(name))
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_shadows_off_stops_and_on_restarts_from_zero() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        for expected in 0..5 {
            let update = rl.tick(now, &store, &mut graph, &mut sink);
            assert_eq!(update.shadow_frame, Some(expected));
        }

        store.set_show_shadows(false);
        let update = rl.tick(now, &store, &mut graph, &mut sink);
        assert_eq!(update.shadow_frame, None);
        assert_eq!(update.diff.shadows_enabled, Some(false));
        assert_eq!(sink.steps.len(), 5);

        store.set_show_shadows(true);
        let update = rl.tick(now, &store, &mut graph, &mut sink);
        assert_eq!(update.shadow_frame, Some(0));
    }

    #[test]
    fn test_light_move_restarts_accumulation() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        for _ in 0..3 {
            rl.tick(now, &store, &mut graph, &mut sink);
        }
        store.set_light_position(Vector3::new(-3.0, 6.0, 2.0));
        let update = rl.tick(now, &store, &mut graph, &mut sink);

        assert_eq!(update.shadow_frame, Some(0));
        assert!(update.diff.light.is_some());
    }

    #[test]
    fn test_camera_eye_follows_target() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        store.set_camera_target(Vector3::new(0.0, 5.0, 0.0));
        let first = rl.tick(now, &store, &mut graph, &mut sink).camera_eye;
        let second = rl.tick(now, &store, &mut graph, &mut sink).camera_eye;

        assert!((first.z - 9.5).abs() < 1e-5);
        assert!(second.z < first.z);
    }

    #[test]
    fn test_settled_camera_eye_is_pushed_once() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        for _ in 0..10 {
            rl.tick(now, &store, &mut graph, &mut sink);
        }
        assert_eq!(sink.eyes, vec![DEFAULT_CAMERA_TARGET]);

        rl.invalidate();
        rl.tick(now, &store, &mut graph, &mut sink);
        assert_eq!(sink.eyes.len(), 2);
    }

    #[test]
    fn test_orbit_eye_is_not_pushed_back() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let mut store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        rl.tick(now, &store, &mut graph, &mut sink);
        let orbited = Vector3::new(4.0, 5.0, 8.0);
        store.set_camera_target(orbited);
        rl.camera_moved(orbited);
        let update = rl.tick(now, &store, &mut graph, &mut sink);

        assert_eq!(update.camera_eye, orbited);
        assert_eq!(sink.eyes, vec![DEFAULT_CAMERA_TARGET]);
    }

    #[test]
    fn test_invalidate_reapplies_full_state() {
        let mut rl = render_loop();
        let mut graph = SceneGraph::studio();
        let store = ParameterStore::default();
        let mut sink = RecordingSink::default();
        let now = Instant::now();

        rl.tick(now, &store, &mut graph, &mut sink);
        rl.invalidate();
        let update = rl.tick(now, &store, &mut graph, &mut sink);

        assert!(update.diff.light.is_some());
        assert_eq!(update.shadow_frame, Some(0));
    }
}
