//! Damped camera animation
//!
//! The control panels publish a camera *target*; the animator moves the live
//! camera eye toward it by a fixed fraction every tick so slider edits never
//! make the view jump.
//!
//! The fraction is applied per tick and is not scaled by elapsed time, so a
//! faster display converges faster in wall-clock terms.

use cgmath::{InnerSpace, Vector3, VectorSpace};

pub const DEFAULT_DAMPING: f32 = 0.05;
pub const DEFAULT_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    /// Live eye sits on the target; ticks are no-ops
    Idle,
    /// Live eye is moving toward the target
    Approaching,
}

#[derive(Debug, Clone)]
pub struct CameraAnimator {
    live: Vector3<f32>,
    target: Vector3<f32>,
    damping: f32,
    epsilon: f32,
    state: AnimatorState,
}

impl CameraAnimator {
    /// Creates an idle animator resting at `position`
    ///
    /// `damping` is clamped into (0, 1] so a tick can never overshoot.
    pub fn new(position: Vector3<f32>, damping: f32, epsilon: f32) -> Self {
        Self {
            live: position,
            target: position,
            damping: damping.clamp(f32::EPSILON, 1.0),
            epsilon: epsilon.max(0.0),
            state: AnimatorState::Idle,
        }
    }

    pub fn live(&self) -> Vector3<f32> {
        self.live
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn distance_to_target(&self) -> f32 {
        (self.target - self.live).magnitude()
    }

    /// Publishes a new target; any change starts an approach
    pub fn retarget(&mut self, target: Vector3<f32>) {
        if target != self.target {
            self.target = target;
            self.wake();
        }
    }

    /// Moves the live eye directly (orbit controls); the animator then pulls
    /// it back toward the target on the following ticks
    pub fn set_live(&mut self, position: Vector3<f32>) {
        if position != self.live {
            self.live = position;
            self.wake();
        }
    }

    fn wake(&mut self) {
        if self.distance_to_target() < self.epsilon {
            self.live = self.target;
            self.state = AnimatorState::Idle;
        } else {
            self.state = AnimatorState::Approaching;
        }
    }

    /// Advances one frame toward `target` and returns the new live eye
    pub fn tick(&mut self, target: Vector3<f32>) -> Vector3<f32> {
        self.retarget(target);

        if self.state == AnimatorState::Approaching {
            self.live = self.live.lerp(self.target, self.damping);
            if self.distance_to_target() < self.epsilon {
                self.live = self.target;
                self.state = AnimatorState::Idle;
            }
        }

        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::params::{CameraEdit, ParameterStore};

    #[test]
    fn test_starts_idle_and_stays_put() {
        let start = Vector3::new(0.0, 5.0, 10.0);
        let mut animator = CameraAnimator::new(start, DEFAULT_DAMPING, DEFAULT_EPSILON);
        assert_eq!(animator.state(), AnimatorState::Idle);
        assert_eq!(animator.tick(start), start);
        assert_eq!(animator.state(), AnimatorState::Idle);
    }

    #[test]
    fn test_first_tick_moves_five_percent() {
        let mut animator =
            CameraAnimator::new(Vector3::new(0.0, 0.0, 0.0), DEFAULT_DAMPING, DEFAULT_EPSILON);
        let live = animator.tick(Vector3::new(10.0, 0.0, 0.0));
        assert!((live.x - 0.5).abs() < 1e-6);
        assert_eq!(animator.state(), AnimatorState::Approaching);
    }

    #[test]
    fn test_distance_is_non_increasing_and_converges() {
        let target = Vector3::new(-4.0, 2.0, 7.5);
        let mut animator =
            CameraAnimator::new(Vector3::new(6.0, 9.0, -3.0), DEFAULT_DAMPING, DEFAULT_EPSILON);
        animator.retarget(target);
        assert_eq!(animator.state(), AnimatorState::Approaching);

        let mut previous = animator.distance_to_target();
        assert!(previous > 10.0);
        let mut ticks = 0;
        while animator.state() == AnimatorState::Approaching {
            animator.tick(target);
            let distance = animator.distance_to_target();
            assert!(distance <= previous, "distance grew: {distance} > {previous}");
            previous = distance;
            ticks += 1;
            assert!(ticks < 1_000, "animator never settled");
        }

        assert_eq!(animator.live(), target);
        assert_eq!(animator.state(), AnimatorState::Idle);
    }

    #[test]
    fn test_never_overshoots_along_axis() {
        let mut animator =
            CameraAnimator::new(Vector3::new(0.0, 0.0, 0.0), DEFAULT_DAMPING, DEFAULT_EPSILON);
        for _ in 0..500 {
            let live = animator.tick(Vector3::new(1.0, 0.0, 0.0));
            assert!(live.x <= 1.0);
        }
    }

    #[test]
    fn test_reset_targets_default_position() {
        let mut store = ParameterStore::default();
        store.set_camera_target(Vector3::new(3.0, 1.0, -2.0));
        let mut animator =
            CameraAnimator::new(store.camera_target(), DEFAULT_DAMPING, DEFAULT_EPSILON);

        store.edit_camera(CameraEdit::Reset);
        animator.tick(store.camera_target());

        assert_eq!(animator.target(), Vector3::new(0.0, 5.0, 10.0));
        assert_eq!(animator.state(), AnimatorState::Approaching);
    }

    #[test]
    fn test_external_move_restarts_approach() {
        let home = Vector3::new(0.0, 5.0, 10.0);
        let mut animator = CameraAnimator::new(home, DEFAULT_DAMPING, DEFAULT_EPSILON);
        animator.set_live(Vector3::new(2.0, 5.0, 10.0));
        assert_eq!(animator.state(), AnimatorState::Approaching);
        let live = animator.tick(home);
        assert!(live.x < 2.0 && live.x > 0.0);
    }
}
