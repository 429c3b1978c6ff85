//! Scene parameter store
//!
//! [`ParameterStore`] is the single source of truth for everything the control
//! panels can edit. It is owned by the screen controller and read in full by
//! the render loop on every tick, so there is no dirty tracking here: a write
//! is visible to the very next tick.
//!
//! Every setter is total. Numeric fields are clamped to their declared range
//! and non-finite input is dropped, keeping the previous value.

use cgmath::Vector3;
use thiserror::Error;

use super::environment::EnvironmentPreset;

/// Allowed range for the key light intensity
pub const LIGHT_INTENSITY_RANGE: (f32, f32) = (0.0, 2.0);
/// Allowed range for each light/camera position component
pub const POSITION_RANGE: (f32, f32) = (-10.0, 10.0);
/// Camera target restored by [`CameraEdit::Reset`]
pub const DEFAULT_CAMERA_TARGET: Vector3<f32> = Vector3::new(0.0, 5.0, 10.0);

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("invalid hex colour '{0}'")]
    InvalidColor(String),
    #[error("unknown environment preset '{0}'")]
    UnknownPreset(String),
}

/// sRGB-encoded colour with channels in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `#rgb` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Result<Self, ParamError> {
        let invalid = || ParamError::InvalidColor(hex.to_string());
        let digits = hex.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        let (r, g, b) = match digits.len() {
            6 => (
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            ),
            3 => {
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                (r * 17, g * 17, b * 17)
            }
            _ => return Err(invalid()),
        };

        Ok(Self::from_bytes([r, g, b]))
    }

    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(
            bytes[0] as f32 / 255.0,
            bytes[1] as f32 / 255.0,
            bytes[2] as f32 / 255.0,
        )
    }

    pub fn to_hex(self) -> String {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", to_byte(self.r), to_byte(self.g), to_byte(self.b))
    }

    pub fn clamped(self) -> Self {
        let c = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self::new(c(self.r), c(self.g), c(self.b))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(c: [f32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// Position axis selector used by per-axis sliders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }

    pub fn get(self, v: Vector3<f32>) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    fn set(self, v: &mut Vector3<f32>, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }
}

/// A write to the published camera target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraEdit {
    /// Move a single axis of the target
    Axis(Axis, f32),
    /// Restore [`DEFAULT_CAMERA_TARGET`] in one update
    Reset,
}

/// Every externally editable scene parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneParameters {
    pub light_intensity: f32,
    pub light_color: Rgb,
    pub light_position: Vector3<f32>,
    pub camera_target: Vector3<f32>,
    pub environment: EnvironmentPreset,
    pub show_grid: bool,
    pub show_shadows: bool,
}

impl Default for SceneParameters {
    fn default() -> Self {
        Self {
            light_intensity: 1.0,
            light_color: Rgb::WHITE,
            light_position: Vector3::new(5.0, 5.0, 5.0),
            camera_target: DEFAULT_CAMERA_TARGET,
            environment: EnvironmentPreset::Studio,
            show_grid: false,
            show_shadows: true,
        }
    }
}

/// Owned, clamping store over [`SceneParameters`]
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    params: SceneParameters,
}

fn clamp_position(v: Vector3<f32>, previous: Vector3<f32>) -> Vector3<f32> {
    let (min, max) = POSITION_RANGE;
    let c = |value: f32, prev: f32| {
        if value.is_finite() {
            value.clamp(min, max)
        } else {
            log::warn!("Ignoring non-finite position component {value}");
            prev
        }
    };
    Vector3::new(c(v.x, previous.x), c(v.y, previous.y), c(v.z, previous.z))
}

impl ParameterStore {
    pub fn new(params: SceneParameters) -> Self {
        let mut store = Self::default();
        store.set_light_intensity(params.light_intensity);
        store.set_light_color(params.light_color);
        store.set_light_position(params.light_position);
        store.set_camera_target(params.camera_target);
        store.set_environment(params.environment);
        store.set_show_grid(params.show_grid);
        store.set_show_shadows(params.show_shadows);
        store
    }

    /// Copy of the full parameter set, as read by the render loop
    pub fn snapshot(&self) -> SceneParameters {
        self.params
    }

    pub fn light_intensity(&self) -> f32 {
        self.params.light_intensity
    }

    pub fn light_color(&self) -> Rgb {
        self.params.light_color
    }

    pub fn light_position(&self) -> Vector3<f32> {
        self.params.light_position
    }

    pub fn camera_target(&self) -> Vector3<f32> {
        self.params.camera_target
    }

    pub fn environment(&self) -> EnvironmentPreset {
        self.params.environment
    }

    pub fn show_grid(&self) -> bool {
        self.params.show_grid
    }

    pub fn show_shadows(&self) -> bool {
        self.params.show_shadows
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        if !intensity.is_finite() {
            log::warn!("Ignoring non-finite light intensity {intensity}");
            return;
        }
        let (min, max) = LIGHT_INTENSITY_RANGE;
        self.params.light_intensity = intensity.clamp(min, max);
    }

    pub fn set_light_color(&mut self, color: Rgb) {
        self.params.light_color = color.clamped();
    }

    /// Parses and stores a hex colour; on error the stored colour is untouched
    pub fn set_light_color_hex(&mut self, hex: &str) -> Result<(), ParamError> {
        let color = Rgb::from_hex(hex)?;
        self.set_light_color(color);
        Ok(())
    }

    pub fn set_light_position(&mut self, position: Vector3<f32>) {
        self.params.light_position = clamp_position(position, self.params.light_position);
    }

    pub fn set_light_axis(&mut self, axis: Axis, value: f32) {
        let mut position = self.params.light_position;
        axis.set(&mut position, value);
        self.set_light_position(position);
    }

    pub fn set_camera_target(&mut self, target: Vector3<f32>) {
        self.params.camera_target = clamp_position(target, self.params.camera_target);
    }

    pub fn edit_camera(&mut self, edit: CameraEdit) {
        match edit {
            CameraEdit::Axis(axis, value) => {
                let mut target = self.params.camera_target;
                axis.set(&mut target, value);
                self.set_camera_target(target);
            }
            CameraEdit::Reset => self.params.camera_target = DEFAULT_CAMERA_TARGET,
        }
    }

    pub fn set_environment(&mut self, preset: EnvironmentPreset) {
        self.params.environment = preset;
    }

    /// Selects a preset by name, falling back to the default preset
    pub fn set_environment_by_name(&mut self, name: &str) {
        self.params.environment = EnvironmentPreset::from_name_or_default(name);
    }

    pub fn set_show_grid(&mut self, show: bool) {
        self.params.show_grid = show;
    }

    pub fn set_show_shadows(&mut self, show: bool) {
        self.params.show_shadows = show;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_in_range_is_stored() {
        let mut store = ParameterStore::default();
        store.set_light_intensity(1.5);
        assert_eq!(store.light_intensity(), 1.5);
    }

    #[test]
    fn test_intensity_out_of_range_is_clamped() {
        let mut store = ParameterStore::default();
        store.set_light_intensity(5.0);
        assert_eq!(store.light_intensity(), 2.0);
        store.set_light_intensity(-1.0);
        assert_eq!(store.light_intensity(), 0.0);
    }

    #[test]
    fn test_non_finite_intensity_keeps_previous_value() {
        let mut store = ParameterStore::default();
        store.set_light_intensity(0.7);
        store.set_light_intensity(f32::NAN);
        assert_eq!(store.light_intensity(), 0.7);
    }

    #[test]
    fn test_positions_clamp_per_component() {
        let mut store = ParameterStore::default();
        store.set_light_position(Vector3::new(12.0, -3.0, -40.0));
        assert_eq!(store.light_position(), Vector3::new(10.0, -3.0, -10.0));

        store.set_light_axis(Axis::Y, 11.0);
        assert_eq!(store.light_position().y, 10.0);
    }

    #[test]
    fn test_camera_axis_edit_only_touches_one_axis() {
        let mut store = ParameterStore::default();
        store.edit_camera(CameraEdit::Axis(Axis::X, 3.5));
        assert_eq!(store.camera_target(), Vector3::new(3.5, 5.0, 10.0));
    }

    #[test]
    fn test_camera_reset_restores_default_target() {
        let mut store = ParameterStore::default();
        store.set_camera_target(Vector3::new(-4.0, 1.0, 2.0));
        store.edit_camera(CameraEdit::Reset);
        assert_eq!(store.camera_target(), Vector3::new(0.0, 5.0, 10.0));
    }

    #[test]
    fn test_hex_colours() {
        assert_eq!(Rgb::from_hex("#ffffff").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::from_hex("#f00").unwrap(), Rgb::new(1.0, 0.0, 0.0));
        assert_eq!(Rgb::from_hex("#ffa500").unwrap().to_hex(), "#ffa500");
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#gggggg").is_err());
    }

    #[test]
    fn test_sign_characters_are_not_hex_digits() {
        assert!(Rgb::from_hex("+f+f+f").is_err());
        assert!(Rgb::from_hex("#+f+f+f").is_err());
        assert!(Rgb::from_hex("#+ff").is_err());
        assert!(Rgb::from_hex("#-1f").is_err());
    }

    #[test]
    fn test_bad_hex_leaves_colour_unchanged() {
        let mut store = ParameterStore::default();
        store.set_light_color_hex("#336699").unwrap();
        let before = store.light_color();
        assert_eq!(
            store.set_light_color_hex("blue-ish"),
            Err(ParamError::InvalidColor("blue-ish".to_string()))
        );
        assert_eq!(store.light_color(), before);
    }

    #[test]
    fn test_colour_channels_are_clamped() {
        let mut store = ParameterStore::default();
        store.set_light_color(Rgb::new(1.5, -0.2, 0.5));
        assert_eq!(store.light_color(), Rgb::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn test_unknown_preset_name_selects_studio() {
        let mut store = ParameterStore::default();
        store.set_environment(EnvironmentPreset::Night);
        store.set_environment_by_name("underwater");
        assert_eq!(store.environment(), EnvironmentPreset::Studio);
    }

    #[test]
    fn test_new_applies_clamping() {
        let store = ParameterStore::new(SceneParameters {
            light_intensity: 9.0,
            ..Default::default()
        });
        assert_eq!(store.light_intensity(), 2.0);
    }
}
