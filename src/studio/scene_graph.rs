//! Declarative studio scene
//!
//! The scene graph is a flat list of renderable primitives plus text labels.
//! Apart from each primitive's spin angle it holds no state: everything the
//! renderer needs is re-derived from the [`SceneParameters`] on every tick by
//! [`SceneGraph::derive`].

use cgmath::{InnerSpace, Matrix4, Rad, Vector3};
use std::f32::consts::FRAC_PI_2;

use super::{environment::EnvironmentLighting, params::Rgb, params::SceneParameters};

/// Index of a primitive inside its [`SceneGraph`]
pub type PrimitiveId = usize;

/// Name of the marker primitive drawn at the key light
pub const KEY_LIGHT_MARKER: &str = "Key Light Marker";

/// Ambient light present regardless of the environment preset
pub const BASE_AMBIENT_INTENSITY: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Cuboid { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    /// Plane in local XY facing +Z
    Plane { width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceTexture {
    None,
    /// Tiled floor texture, repeated `repeat` times across each axis
    Floor { repeat: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDesc {
    pub color: Rgb,
    pub metallic: f32,
    pub roughness: f32,
    pub texture: SurfaceTexture,
}

impl MaterialDesc {
    /// Plain dielectric surface, fully rough
    pub fn matte(color: Rgb) -> Self {
        Self {
            color,
            metallic: 0.0,
            roughness: 1.0,
            texture: SurfaceTexture::None,
        }
    }
}

/// Which shadow roles a primitive can take when shadows are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowCapability {
    pub cast: bool,
    pub receive: bool,
}

impl ShadowCapability {
    pub const CASTER: Self = Self { cast: true, receive: false };
    pub const RECEIVER: Self = Self { cast: false, receive: true };
    pub const BOTH: Self = Self { cast: true, receive: true };
    pub const NONE: Self = Self { cast: false, receive: false };
}

/// Accumulated spin angle in radians; wraps implicitly through trig
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub angle: f32,
}

impl RotationState {
    pub fn advance(&mut self, delta: f32, rate: f32) {
        self.angle += delta * rate;
    }
}

/// Continuous rotation about the primitive's local Y axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    /// Angular rate in rad/s
    pub rate: f32,
    pub rotation: RotationState,
}

impl Spin {
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            rotation: RotationState::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub name: String,
    pub shape: Shape,
    pub position: Vector3<f32>,
    /// Fixed orientation as (x, y) Euler angles, applied before the spin
    pub orientation: (Rad<f32>, Rad<f32>),
    pub material: MaterialDesc,
    pub shadows: ShadowCapability,
    pub spin: Option<Spin>,
    /// Placed at the key light's position on every derive
    pub follows_light: bool,
}

impl Primitive {
    pub fn new(name: &str, shape: Shape, position: Vector3<f32>, material: MaterialDesc) -> Self {
        Self {
            name: name.to_string(),
            shape,
            position,
            orientation: (Rad(0.0), Rad(0.0)),
            material,
            shadows: ShadowCapability::BOTH,
            spin: None,
            follows_light: false,
        }
    }

    pub fn with_orientation(mut self, x: f32, y: f32) -> Self {
        self.orientation = (Rad(x), Rad(y));
        self
    }

    pub fn with_shadows(mut self, shadows: ShadowCapability) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn with_spin(mut self, rate: f32) -> Self {
        self.spin = Some(Spin::new(rate));
        self
    }

    pub fn following_light(mut self) -> Self {
        self.follows_light = true;
        self
    }

    /// Current spin angle, zero for static primitives
    pub fn spin_angle(&self) -> f32 {
        self.spin.map_or(0.0, |s| s.rotation.angle)
    }

    /// World transform: translation * fixed orientation * spin
    pub fn transform(&self) -> Matrix4<f32> {
        let (rx, ry) = self.orientation;
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_x(rx)
            * Matrix4::from_angle_y(ry)
            * Matrix4::from_angle_y(Rad(self.spin_angle()))
    }
}

/// Text drawn in world space (rendered as an overlay)
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Vector3<f32>,
    pub font_size: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub position: [f32; 3],
    /// Unit vector the light shines along (toward the origin)
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub casts_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientState {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Per-primitive properties derived for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveState {
    pub transform: Matrix4<f32>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedScene {
    pub light: LightState,
    pub ambient: AmbientState,
    pub background: [f32; 3],
    pub primitives: Vec<PrimitiveState>,
    pub grid_visible: bool,
    pub shadows_enabled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    primitives: Vec<Primitive>,
    labels: Vec<Label>,
}

fn hex(s: &str) -> Rgb {
    Rgb::from_hex(s).unwrap_or(Rgb::WHITE)
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The videography studio set: backdrop, tiled floor, side walls, two
    /// light stands, three spinning sample props and the wall label
    pub fn studio() -> Self {
        let mut graph = Self::new();

        graph.add(
            Primitive::new(
                "Backdrop",
                Shape::Plane { width: 20.0, height: 10.0 },
                Vector3::new(0.0, 5.0, -10.0),
                MaterialDesc::matte(hex("#e0e0e0")),
            )
            .with_shadows(ShadowCapability::RECEIVER),
        );
        graph.add(
            Primitive::new(
                "Floor",
                Shape::Plane { width: 20.0, height: 20.0 },
                Vector3::new(0.0, -0.5, 0.0),
                MaterialDesc {
                    texture: SurfaceTexture::Floor { repeat: 10.0 },
                    ..MaterialDesc::matte(Rgb::WHITE)
                },
            )
            .with_orientation(-FRAC_PI_2, 0.0)
            .with_shadows(ShadowCapability::RECEIVER),
        );
        graph.add(
            Primitive::new(
                "Left Wall",
                Shape::Plane { width: 20.0, height: 10.0 },
                Vector3::new(-10.0, 5.0, 0.0),
                MaterialDesc::matte(hex("#d0d0d0")),
            )
            .with_orientation(0.0, FRAC_PI_2)
            .with_shadows(ShadowCapability::RECEIVER),
        );
        graph.add(
            Primitive::new(
                "Right Wall",
                Shape::Plane { width: 20.0, height: 10.0 },
                Vector3::new(10.0, 5.0, 0.0),
                MaterialDesc::matte(hex("#d0d0d0")),
            )
            .with_orientation(0.0, -FRAC_PI_2)
            .with_shadows(ShadowCapability::RECEIVER),
        );

        for (side, x) in [("Left", -8.0), ("Right", 8.0)] {
            graph.add(
                Primitive::new(
                    &format!("{side} Light Stand"),
                    Shape::Cuboid { width: 1.0, height: 2.0, depth: 1.0 },
                    Vector3::new(x, 0.0, -8.0),
                    MaterialDesc::matte(hex("#333333")),
                )
                .with_shadows(ShadowCapability::CASTER),
            );
            graph.add(
                Primitive::new(
                    &format!("{side} Light Head"),
                    Shape::Sphere { radius: 0.5 },
                    Vector3::new(x, 2.5, -8.0),
                    MaterialDesc::matte(hex("#666666")),
                )
                .with_shadows(ShadowCapability::CASTER),
            );
        }

        graph.add(
            Primitive::new(
                "Box",
                Shape::Cuboid { width: 1.0, height: 1.0, depth: 1.0 },
                Vector3::new(-2.0, 0.5, 0.0),
                MaterialDesc::matte(hex("#ffa500")),
            )
            .with_spin(0.2),
        );
        graph.add(
            Primitive::new(
                "Sphere",
                Shape::Sphere { radius: 0.7 },
                Vector3::new(0.0, 0.7, 0.0),
                MaterialDesc {
                    metallic: 0.6,
                    roughness: 0.2,
                    ..MaterialDesc::matte(hex("#add8e6"))
                },
            )
            .with_spin(0.1),
        );
        graph.add(
            Primitive::new(
                "Cylinder",
                Shape::Cylinder { radius: 0.5, height: 1.0 },
                Vector3::new(2.0, 0.5, 0.0),
                MaterialDesc::matte(hex("#90ee90")),
            )
            .with_spin(0.15),
        );

        graph.add(
            Primitive::new(
                KEY_LIGHT_MARKER,
                Shape::Sphere { radius: 0.25 },
                SceneParameters::default().light_position,
                MaterialDesc::matte(hex("#ff0000")),
            )
            .with_shadows(ShadowCapability::NONE)
            .following_light(),
        );

        graph.add_label(Label {
            text: "STUDIO".to_string(),
            position: Vector3::new(0.0, 5.0, -9.9),
            font_size: 1.0,
            color: hex("#333333"),
        });

        graph
    }

    pub fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        self.primitives.push(primitive);
        self.primitives.len() - 1
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id)
    }

    pub fn find(&self, name: &str) -> Option<PrimitiveId> {
        self.primitives.iter().position(|p| p.name == name)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Advances every spinning primitive by `delta` seconds
    pub fn advance(&mut self, delta: f32) {
        let delta = delta.max(0.0);
        for spin in self.primitives.iter_mut().filter_map(|p| p.spin.as_mut()) {
            spin.rotation.advance(delta, spin.rate);
        }
    }

    /// Derives the frame's renderable state from the parameters
    pub fn derive(&self, params: &SceneParameters) -> DerivedScene {
        let shadows = params.show_shadows;
        let EnvironmentLighting {
            background,
            ambient_color,
            ambient_intensity,
        } = params.environment.lighting();

        let position = params.light_position;
        let direction = if position.magnitude2() > f32::EPSILON {
            -position.normalize()
        } else {
            -Vector3::unit_y()
        };

        let light = LightState {
            position: position.into(),
            direction: direction.into(),
            color: params.light_color.to_array(),
            intensity: params.light_intensity,
            casts_shadow: shadows,
        };

        let primitives = self
            .primitives
            .iter()
            .map(|p| PrimitiveState {
                transform: if p.follows_light {
                    Matrix4::from_translation(position)
                } else {
                    p.transform()
                },
                cast_shadow: shadows && p.shadows.cast,
                receive_shadow: shadows && p.shadows.receive,
            })
            .collect();

        DerivedScene {
            light,
            ambient: AmbientState {
                color: ambient_color,
                intensity: BASE_AMBIENT_INTENSITY + ambient_intensity,
            },
            background,
            primitives,
            grid_visible: params.show_grid,
            shadows_enabled: shadows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::environment::EnvironmentPreset;
    use cgmath::Zero;
    use std::f32::consts::TAU;

    fn angle_eq(a: f32, b: f32) -> bool {
        let diff = (a - b).rem_euclid(TAU);
        diff < 1e-5 || (TAU - diff) < 1e-5
    }

    #[test]
    fn test_studio_has_three_distinct_spin_rates() {
        let graph = SceneGraph::studio();
        let mut rates: Vec<f32> = graph
            .primitives()
            .iter()
            .filter_map(|p| p.spin.map(|s| s.rate))
            .collect();
        rates.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(rates, vec![0.1, 0.15, 0.2]);
    }

    #[test]
    fn test_advance_adds_delta_times_rate() {
        let mut graph = SceneGraph::studio();
        let box_id = graph.find("Box").unwrap();
        let before = graph.primitive(box_id).unwrap().spin_angle();

        for delta in [0.0, 1.0 / 60.0, 0.5, 3.0] {
            let start = graph.primitive(box_id).unwrap().spin_angle();
            graph.advance(delta);
            let after = graph.primitive(box_id).unwrap().spin_angle();
            assert!(angle_eq(after, start + delta * 0.2));
        }

        let total = graph.primitive(box_id).unwrap().spin_angle();
        assert!(angle_eq(total, before + (1.0 / 60.0 + 0.5 + 3.0) * 0.2));
    }

    #[test]
    fn test_static_primitives_do_not_rotate() {
        let mut graph = SceneGraph::studio();
        let floor = graph.find("Floor").unwrap();
        let before = graph.primitive(floor).unwrap().transform();
        graph.advance(10.0);
        assert_eq!(graph.primitive(floor).unwrap().transform(), before);
    }

    #[test]
    fn test_shadow_flags_follow_show_shadows() {
        let graph = SceneGraph::studio();
        let box_id = graph.find("Box").unwrap();
        let backdrop = graph.find("Backdrop").unwrap();

        let mut params = SceneParameters::default();
        let derived = graph.derive(&params);
        assert!(derived.light.casts_shadow);
        assert!(derived.primitives[box_id].cast_shadow);
        assert!(derived.primitives[box_id].receive_shadow);
        assert!(!derived.primitives[backdrop].cast_shadow);
        assert!(derived.primitives[backdrop].receive_shadow);

        params.show_shadows = false;
        let derived = graph.derive(&params);
        assert!(!derived.light.casts_shadow);
        assert!(derived
            .primitives
            .iter()
            .all(|p| !p.cast_shadow && !p.receive_shadow));
    }

    #[test]
    fn test_light_points_at_origin() {
        let graph = SceneGraph::studio();
        let params = SceneParameters::default();
        let derived = graph.derive(&params);
        let d = Vector3::from(derived.light.direction);
        let expected = -Vector3::new(5.0f32, 5.0, 5.0).normalize();
        assert!((d - expected).magnitude() < 1e-6);
    }

    #[test]
    fn test_light_at_origin_points_down() {
        let graph = SceneGraph::studio();
        let params = SceneParameters {
            light_position: Vector3::zero(),
            ..Default::default()
        };
        assert_eq!(graph.derive(&params).light.direction, [0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_light_marker_follows_light_position() {
        let graph = SceneGraph::studio();
        let marker = graph.find(KEY_LIGHT_MARKER).unwrap();

        let mut params = SceneParameters::default();
        let origin = Vector3::<f32>::zero().extend(1.0);
        let derived = graph.derive(&params);
        assert_eq!(
            derived.primitives[marker].transform * origin,
            params.light_position.extend(1.0)
        );

        params.light_position = Vector3::new(-3.0, 8.0, 2.0);
        let derived = graph.derive(&params);
        assert_eq!(
            derived.primitives[marker].transform * origin,
            Vector3::new(-3.0, 8.0, 2.0).extend(1.0)
        );
    }

    #[test]
    fn test_light_marker_casts_no_shadow() {
        let graph = SceneGraph::studio();
        let marker = graph.find(KEY_LIGHT_MARKER).unwrap();
        let derived = graph.derive(&SceneParameters::default());
        assert!(derived.shadows_enabled);
        assert!(!derived.primitives[marker].cast_shadow);
        assert!(!derived.primitives[marker].receive_shadow);
    }

    #[test]
    fn test_environment_drives_background() {
        let graph = SceneGraph::studio();
        let params = SceneParameters {
            environment: EnvironmentPreset::Night,
            ..Default::default()
        };
        let derived = graph.derive(&params);
        assert_eq!(derived.background, EnvironmentPreset::Night.lighting().background);
        assert!(derived.ambient.intensity > BASE_AMBIENT_INTENSITY);
    }

    #[test]
    fn test_floor_is_textured_and_horizontal() {
        let graph = SceneGraph::studio();
        let floor = graph.primitive(graph.find("Floor").unwrap()).unwrap();
        assert_eq!(floor.material.texture, SurfaceTexture::Floor { repeat: 10.0 });

        // the plane's +Z normal must end up pointing up
        let normal = floor.transform() * Vector3::unit_z().extend(0.0);
        assert!((normal.y - 1.0).abs() < 1e-6);
    }
}
