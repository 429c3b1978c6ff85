use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;

/// Mouse orbit and wheel zoom for an [`OrbitCamera`]
///
/// Button state comes from window events so that presses the UI consumed
/// never start an orbit; motion and wheel deltas come from raw device events.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.is_mouse_pressed = pressed;
    }

    /// Applies a raw device event; returns true if the camera moved
    pub fn process_events(&mut self, event: &DeviceEvent, camera: &mut OrbitCamera) -> bool {
        match event {
            DeviceEvent::MouseWheel { delta } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 * 0.1
                    }
                };
                camera.add_distance(scroll_amount * self.zoom_speed);
                true
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                camera.add_yaw(-delta.0 as f32 * self.rotate_speed);
                camera.add_pitch(delta.1 as f32 * self.rotate_speed);
                true
            }
            _ => false,
        }
    }

    /// Tracks modifier state; returns true when Shift+C asks for a camera reset
    pub fn process_keyed_events(&mut self, event: &KeyEvent) -> bool {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
                false
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                repeat: false,
                ..
            } => self.is_shift_held,
            _ => false,
        }
    }
}
