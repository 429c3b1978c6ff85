// src/ui/panels.rs
//! Studio control panels
//!
//! Two fixed sidebars edit the parameter store, the "Shot Details" window
//! follows the drag position owned by [`StudioScreen`], and world-space
//! labels are drawn as screen overlays. Panels only write through the
//! store; the render loop picks the changes up on its next tick.

use cgmath::Vector3;
use imgui::Condition;

use crate::studio::{
    environment::EnvironmentPreset,
    floating_window::{HANDLE_HEIGHT, WINDOW_WIDTH},
    params::{Axis, CameraEdit, Rgb, LIGHT_INTENSITY_RANGE, POSITION_RANGE},
    scene_graph::Label,
    StudioScreen,
};

pub const LEFT_SIDEBAR_WIDTH: f32 = 260.0;
pub const RIGHT_SIDEBAR_WIDTH: f32 = 340.0;
const SIDEBAR_MARGIN: f32 = 10.0;
const BUTTON_HEIGHT: f32 = 32.0;

/// Label scale is clamped so distant or very close labels stay readable
const LABEL_SCALE_RANGE: (f32, f32) = (0.5, 6.0);

/// A world-space label resolved to window pixels for this frame
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedLabel {
    pub text: String,
    pub center: [f32; 2],
    /// On-screen height of one world unit of font size
    pub pixel_height: f32,
    pub color: [f32; 4],
}

/// Projects scene labels through `project`, dropping the ones behind the
/// camera
pub fn project_labels<P>(labels: &[Label], project: P) -> Vec<ProjectedLabel>
where
    P: Fn(Vector3<f32>) -> Option<[f32; 2]>,
{
    labels
        .iter()
        .filter_map(|label| {
            let center = project(label.position)?;
            let top = project(label.position + Vector3::new(0.0, label.font_size * 0.5, 0.0))?;
            let bottom = project(label.position - Vector3::new(0.0, label.font_size * 0.5, 0.0))?;
            let [r, g, b] = label.color.to_array();
            Some(ProjectedLabel {
                text: label.text.clone(),
                center,
                pixel_height: (bottom[1] - top[1]).abs(),
                color: [r, g, b, 1.0],
            })
        })
        .collect()
}

/// Font scale that makes text `pixel_height` tall at a `font_size` base
pub fn label_scale(pixel_height: f32, font_size: f32) -> f32 {
    let (min, max) = LABEL_SCALE_RANGE;
    if font_size <= 0.0 || !pixel_height.is_finite() {
        return min;
    }
    (pixel_height / font_size).clamp(min, max)
}

/// Position and size of a sidebar for the given display size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub position: [f32; 2],
    pub size: [f32; 2],
}

pub fn left_sidebar_rect(display_size: [f32; 2]) -> PanelRect {
    PanelRect {
        position: [SIDEBAR_MARGIN, SIDEBAR_MARGIN],
        size: [LEFT_SIDEBAR_WIDTH, display_size[1] - 2.0 * SIDEBAR_MARGIN],
    }
}

pub fn right_sidebar_rect(display_size: [f32; 2]) -> PanelRect {
    let x = (display_size[0] - RIGHT_SIDEBAR_WIDTH - SIDEBAR_MARGIN)
        .max(LEFT_SIDEBAR_WIDTH + 2.0 * SIDEBAR_MARGIN);
    PanelRect {
        position: [x, SIDEBAR_MARGIN],
        size: [RIGHT_SIDEBAR_WIDTH, display_size[1] - 2.0 * SIDEBAR_MARGIN],
    }
}

fn toggle_label(shown: bool, what: &str) -> String {
    if shown {
        format!("Hide {what}")
    } else {
        format!("Show {what}")
    }
}

/// Draws every studio panel for one frame
pub fn studio_panels(
    ui: &imgui::Ui,
    screen: &mut StudioScreen,
    labels: &[ProjectedLabel],
    font_size: f32,
) {
    let display_size = ui.io().display_size;
    if display_size[0] <= 0.0 || display_size[1] <= 0.0 {
        return;
    }

    label_overlay(ui, labels, font_size);
    left_sidebar(ui, screen, display_size);
    right_sidebar(ui, screen, display_size);
    shot_details_window(ui, screen);
}

fn label_overlay(ui: &imgui::Ui, labels: &[ProjectedLabel], font_size: f32) {
    for (i, label) in labels.iter().enumerate() {
        ui.window(format!("##label_{i}"))
            .position(label.center, Condition::Always)
            .position_pivot([0.5, 0.5])
            .no_decoration()
            .no_inputs()
            .draw_background(false)
            .always_auto_resize(true)
            .focus_on_appearing(false)
            .bring_to_front_on_focus(false)
            .build(|| {
                ui.set_window_font_scale(label_scale(label.pixel_height, font_size));
                ui.text_colored(label.color, &label.text);
            });
    }
}

fn left_sidebar(ui: &imgui::Ui, screen: &mut StudioScreen, display_size: [f32; 2]) {
    let rect = left_sidebar_rect(display_size);
    ui.window("Studio")
        .position(rect.position, Condition::Always)
        .size(rect.size, Condition::Always)
        .movable(false)
        .resizable(false)
        .collapsible(false)
        .build(|| {
            ui.text("Scene Settings");
            ui.separator();

            let params = screen.params_mut();
            let show_grid = params.show_grid();
            if ui.button_with_size(toggle_label(show_grid, "Grid"), [-1.0, BUTTON_HEIGHT]) {
                params.set_show_grid(!show_grid);
            }
            let show_shadows = params.show_shadows();
            if ui.button_with_size(toggle_label(show_shadows, "Shadows"), [-1.0, BUTTON_HEIGHT]) {
                params.set_show_shadows(!show_shadows);
            }

            ui.spacing();
            ui.text("Tools");
            ui.separator();
            if ui.button_with_size("Open AI Assistant", [-1.0, BUTTON_HEIGHT]) {
                screen.open_assistant();
            }
        });
}

fn right_sidebar(ui: &imgui::Ui, screen: &mut StudioScreen, display_size: [f32; 2]) {
    let rect = right_sidebar_rect(display_size);
    ui.window("Controls")
        .position(rect.position, Condition::Always)
        .size(rect.size, Condition::Always)
        .movable(false)
        .resizable(false)
        .collapsible(false)
        .build(|| {
            let Some(_tabs) = ui.tab_bar("control_tabs") else {
                return;
            };
            if let Some(_tab) = ui.tab_item("Camera") {
                camera_tab(ui, screen);
            }
            if let Some(_tab) = ui.tab_item("Lighting") {
                lighting_tab(ui, screen);
            }
            if let Some(_tab) = ui.tab_item("Environment") {
                environment_tab(ui, screen);
            }
        });
}

fn camera_tab(ui: &imgui::Ui, screen: &mut StudioScreen) {
    let (min, max) = POSITION_RANGE;
    let target = screen.params().camera_target();

    ui.text("Camera Position");
    for axis in Axis::ALL {
        let mut value = axis.get(target);
        if ui.slider(format!("{}##camera", axis.label()), min, max, &mut value) {
            screen.params_mut().edit_camera(CameraEdit::Axis(axis, value));
        }
    }

    ui.spacing();
    if ui.button_with_size("Reset Camera", [-1.0, BUTTON_HEIGHT]) {
        screen.reset_camera();
    }
}

fn lighting_tab(ui: &imgui::Ui, screen: &mut StudioScreen) {
    let params = screen.params_mut();

    let (min, max) = LIGHT_INTENSITY_RANGE;
    let mut intensity = params.light_intensity();
    if ui.slider("Intensity", min, max, &mut intensity) {
        params.set_light_intensity(intensity);
    }

    let mut color = params.light_color().to_array();
    if ui.color_edit3("Color", &mut color) {
        let [r, g, b] = color;
        params.set_light_color(Rgb::new(r, g, b));
    }

    ui.spacing();
    ui.text("Light Position");
    let (min, max) = POSITION_RANGE;
    let position = params.light_position();
    for axis in Axis::ALL {
        let mut value = axis.get(position);
        if ui.slider(format!("{}##light", axis.label()), min, max, &mut value) {
            params.set_light_axis(axis, value);
        }
    }
}

fn environment_tab(ui: &imgui::Ui, screen: &mut StudioScreen) {
    let params = screen.params_mut();
    let labels = EnvironmentPreset::ALL.map(EnvironmentPreset::label);
    let mut index = params.environment().index();
    if ui.combo_simple_string("Preset", &mut index, &labels[..]) {
        params.set_environment(EnvironmentPreset::from_index(index));
    }
}

fn shot_details_window(ui: &imgui::Ui, screen: &mut StudioScreen) {
    if !screen.floating_window().is_open() {
        return;
    }
    let position = screen.floating_window().position();

    let mut close = false;
    let mut continue_to_chat = false;
    ui.window("Shot Details")
        .position([position.x, position.y], Condition::Always)
        .size_constraints([WINDOW_WIDTH, HANDLE_HEIGHT * 2.0], [WINDOW_WIDTH, f32::MAX])
        .movable(false)
        .resizable(false)
        .collapsible(false)
        .always_auto_resize(true)
        .build(|| {
            let params = screen.params();
            let target = params.camera_target();
            let light = params.light_position();
            ui.text(format!(
                "Camera: ({:.1}, {:.1}, {:.1})",
                target.x, target.y, target.z
            ));
            ui.text(format!(
                "Key light: ({:.1}, {:.1}, {:.1}) at {:.2}, {}",
                light.x,
                light.y,
                light.z,
                params.light_intensity(),
                params.light_color().to_hex()
            ));
            ui.text(format!("Environment: {}", params.environment().label()));

            let accumulator = screen.render_loop().accumulator();
            if params.show_shadows() {
                ui.text(format!(
                    "Soft shadows: {:.0}%",
                    accumulator.progress() * 100.0
                ));
            } else {
                ui.text("Soft shadows: off");
            }

            ui.separator();
            if ui.button("Close") {
                close = true;
            }
            ui.same_line();
            if ui.button("Continue to AI Chat") {
                continue_to_chat = true;
            }
        });

    if continue_to_chat {
        screen.continue_to_chat();
    }
    if close {
        screen.close_assistant();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::StudioConfig, studio::params::DEFAULT_CAMERA_TARGET};

    fn label(font_size: f32) -> Label {
        Label {
            text: "STUDIO".to_string(),
            position: Vector3::new(0.0, 5.0, -9.9),
            font_size,
            color: Rgb::new(0.2, 0.2, 0.2),
        }
    }

    #[test]
    fn test_project_labels_uses_vertical_extent() {
        // 100 px per world unit, y down
        let project = |p: Vector3<f32>| Some([400.0 + p.x * 100.0, 300.0 - p.y * 100.0]);
        let projected = project_labels(&[label(1.0)], project);

        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].text, "STUDIO");
        assert_eq!(projected[0].center, [400.0, -200.0]);
        assert!((projected[0].pixel_height - 100.0).abs() < 1e-4);
        assert_eq!(projected[0].color[3], 1.0);
    }

    #[test]
    fn test_labels_behind_camera_are_dropped() {
        let projected = project_labels(&[label(1.0)], |_| None);
        assert!(projected.is_empty());
    }

    #[test]
    fn test_label_scale_is_clamped() {
        assert_eq!(label_scale(36.0, 18.0), 2.0);
        assert_eq!(label_scale(1.0, 18.0), LABEL_SCALE_RANGE.0);
        assert_eq!(label_scale(10_000.0, 18.0), LABEL_SCALE_RANGE.1);
        assert_eq!(label_scale(f32::NAN, 18.0), LABEL_SCALE_RANGE.0);
        assert_eq!(label_scale(36.0, 0.0), LABEL_SCALE_RANGE.0);
    }

    #[test]
    fn test_sidebars_do_not_overlap() {
        for display in [[1600.0, 900.0], [800.0, 600.0], [300.0, 200.0]] {
            let left = left_sidebar_rect(display);
            let right = right_sidebar_rect(display);
            assert!(left.position[0] + left.size[0] < right.position[0], "{display:?}");
        }
        let right = right_sidebar_rect([1600.0, 900.0]);
        assert_eq!(right.position[0] + right.size[0], 1600.0 - SIDEBAR_MARGIN);
    }

    #[test]
    fn test_toggle_labels_follow_state() {
        assert_eq!(toggle_label(true, "Grid"), "Hide Grid");
        assert_eq!(toggle_label(false, "Shadows"), "Show Shadows");
    }

    // The only test that creates an imgui context; imgui allows one per process
    // at a time.
    #[test]
    fn test_panels_draw_without_changing_state() {
        let mut screen = StudioScreen::new(&StudioConfig::default());
        screen.open_assistant();
        let before = screen.params().snapshot();

        let mut ctx = imgui::Context::create();
        ctx.set_ini_filename(None);
        ctx.io_mut().display_size = [1600.0, 900.0];
        ctx.fonts().build_rgba32_texture();

        let labels = vec![ProjectedLabel {
            text: "STUDIO".to_string(),
            center: [800.0, 200.0],
            pixel_height: 60.0,
            color: [0.2, 0.2, 0.2, 1.0],
        }];
        for _ in 0..2 {
            let ui = ctx.frame();
            studio_panels(ui, &mut screen, &labels, 18.0);
            ctx.render();
        }

        assert_eq!(screen.params().snapshot(), before);
        assert_eq!(screen.params().camera_target(), DEFAULT_CAMERA_TARGET);
        assert!(screen.floating_window().is_open());
    }
}
