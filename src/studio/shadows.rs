//! Soft-shadow accumulation
//!
//! Soft contact shadows are built up over several frames: every frame renders
//! the shadow of a handful of randomly jittered copies of the key light and
//! blends each one into a running average on the shadow catcher. Once
//! `frames` frames have been blended the result is left as is until the light
//! moves or shadows are switched off and on again.
//!
//! This module only decides *what* to render each frame. The GPU side lives
//! in `gfx::rendering::soft_shadows`.

use cgmath::{InnerSpace, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::params::Rgb;

/// Light moves smaller than this do not restart accumulation
const LIGHT_EPSILON: f32 = 1e-3;
const DEFAULT_SEED: u64 = 0x5eed_5ad0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    /// Jittered light copies rendered per frame
    pub samples: u32,
    /// Jitter extent around the key light
    pub radius: f32,
    /// Frames blended before the result is considered converged
    pub frames: u32,
    /// Side length of the square shadow catcher
    pub catcher_scale: f32,
    /// World-space height of the catcher, just above the floor
    pub catcher_height: f32,
    pub color: Rgb,
    /// Mix between the shadow colour and black
    pub color_blend: f32,
    pub opacity: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            samples: 8,
            radius: 4.0,
            frames: 60,
            catcher_scale: 20.0,
            catcher_height: -0.49,
            color: Rgb::from_bytes([0x31, 0x6d, 0x39]),
            color_blend: 0.5,
            opacity: 0.8,
        }
    }
}

impl ShadowSettings {
    /// Shadow tint after applying the colour blend
    pub fn tint(&self) -> [f32; 3] {
        let blend = self.color_blend.clamp(0.0, 1.0);
        self.color.to_array().map(|c| c * blend)
    }
}

/// Work for one accumulation frame
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationStep {
    /// Zero-based frame index; frame 0 overwrites previous contents
    pub frame: u32,
    pub sample_positions: Vec<[f32; 3]>,
    /// Blend weight of each sample into the running average
    pub blend_weights: Vec<f32>,
}

#[derive(Debug)]
pub struct SoftShadowAccumulator {
    settings: ShadowSettings,
    rng: StdRng,
    frame: u32,
    light: Option<Vector3<f32>>,
    debug: bool,
}

impl SoftShadowAccumulator {
    pub fn new(settings: ShadowSettings) -> Self {
        Self::with_seed(settings, DEFAULT_SEED)
    }

    pub fn with_seed(settings: ShadowSettings, seed: u64) -> Self {
        let settings = ShadowSettings {
            samples: settings.samples.max(1),
            frames: settings.frames.max(1),
            radius: settings.radius.max(0.0),
            ..settings
        };
        Self {
            settings,
            rng: StdRng::seed_from_u64(seed),
            frame: 0,
            light: None,
            debug: false,
        }
    }

    /// Logs every accumulated frame at `debug` level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Frames blended since the last reset
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_converged(&self) -> bool {
        self.frame >= self.settings.frames
    }

    /// Fraction of the accumulation completed, in [0, 1]
    pub fn progress(&self) -> f32 {
        self.frame as f32 / self.settings.frames as f32
    }

    /// Clears progress; the next step starts again at frame 0
    pub fn stop(&mut self) {
        if self.frame > 0 {
            log::debug!("Soft shadows stopped after {} frames", self.frame);
        }
        self.frame = 0;
        self.light = None;
    }

    /// Plans the next accumulation frame, or `None` once converged
    pub fn step(&mut self, light_position: Vector3<f32>) -> Option<AccumulationStep> {
        if let Some(previous) = self.light {
            if (light_position - previous).magnitude() > LIGHT_EPSILON {
                log::debug!("Key light moved, restarting soft shadows");
                self.frame = 0;
            }
        }
        self.light = Some(light_position);

        if self.is_converged() {
            return None;
        }

        let frame = self.frame;
        let samples = self.settings.samples;
        let half = self.settings.radius * 0.5;

        let mut sample_positions = Vec::with_capacity(samples as usize);
        let mut blend_weights = Vec::with_capacity(samples as usize);
        for i in 0..samples {
            let jitter = Vector3::new(
                self.rng.random_range(-half..=half),
                self.rng.random_range(-half..=half),
                self.rng.random_range(-half..=half),
            );
            sample_positions.push((light_position + jitter).into());
            blend_weights.push(1.0 / (frame * samples + i + 1) as f32);
        }

        self.frame += 1;
        if self.debug {
            log::debug!(
                "Soft shadow frame {}/{} ({} samples)",
                self.frame,
                self.settings.frames,
                samples
            );
        }
        if self.is_converged() {
            log::info!("Soft shadows converged after {} frames", self.frame);
        }

        Some(AccumulationStep {
            frame,
            sample_positions,
            blend_weights,
        })
    }
}

impl Default for SoftShadowAccumulator {
    fn default() -> Self {
        Self::new(ShadowSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> Vector3<f32> {
        Vector3::new(5.0, 5.0, 5.0)
    }

    #[test]
    fn test_first_step_overwrites() {
        let mut acc = SoftShadowAccumulator::default();
        let step = acc.step(light()).unwrap();
        assert_eq!(step.frame, 0);
        assert_eq!(step.sample_positions.len(), 8);
        assert_eq!(step.blend_weights[0], 1.0);
        assert_eq!(step.blend_weights[1], 0.5);
    }

    #[test]
    fn test_weights_form_running_average() {
        let mut acc = SoftShadowAccumulator::default();
        acc.step(light());
        let step = acc.step(light()).unwrap();
        assert_eq!(step.frame, 1);
        assert_eq!(step.blend_weights[0], 1.0 / 9.0);
        assert_eq!(step.blend_weights[7], 1.0 / 16.0);
    }

    #[test]
    fn test_samples_stay_within_radius() {
        let mut acc = SoftShadowAccumulator::default();
        let step = acc.step(light()).unwrap();
        for p in step.sample_positions {
            let offset = Vector3::from(p) - light();
            assert!(offset.x.abs() <= 2.0 && offset.y.abs() <= 2.0 && offset.z.abs() <= 2.0);
        }
    }

    #[test]
    fn test_converges_after_configured_frames() {
        let mut acc = SoftShadowAccumulator::default();
        for expected in 0..60 {
            assert_eq!(acc.step(light()).unwrap().frame, expected);
        }
        assert!(acc.is_converged());
        assert!(acc.step(light()).is_none());
        assert_eq!(acc.progress(), 1.0);
    }

    #[test]
    fn test_light_move_restarts() {
        let mut acc = SoftShadowAccumulator::default();
        for _ in 0..60 {
            acc.step(light());
        }
        assert!(acc.step(light() + Vector3::new(0.0005, 0.0, 0.0)).is_none());

        let step = acc.step(Vector3::new(1.0, 5.0, 5.0)).unwrap();
        assert_eq!(step.frame, 0);
    }

    #[test]
    fn test_stop_restarts_from_zero() {
        let mut acc = SoftShadowAccumulator::default();
        for _ in 0..10 {
            acc.step(light());
        }
        acc.stop();
        assert_eq!(acc.frame(), 0);
        assert_eq!(acc.step(light()).unwrap().frame, 0);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let mut a = SoftShadowAccumulator::with_seed(ShadowSettings::default(), 7);
        let mut b = SoftShadowAccumulator::with_seed(ShadowSettings::default(), 7);
        assert_eq!(a.step(light()), b.step(light()));
    }

    #[test]
    fn test_tint_blends_towards_black() {
        let settings = ShadowSettings {
            color: Rgb::WHITE,
            color_blend: 0.5,
            ..Default::default()
        };
        assert_eq!(settings.tint(), [0.5, 0.5, 0.5]);
    }
}
