//! winit application shell
//!
//! Wires window events to the studio: pointer events go to the floating
//! window's drag handle first, then to ImGui, and whatever neither consumed
//! orbits the camera. Every redraw ticks the [`StudioScreen`] against the
//! [`RenderEngine`] and renders the frame with the control panels on top.

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use cgmath::Vector2;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::StudioConfig,
    gfx::{camera::camera_controller::CameraController, RenderEngine},
    studio::StudioScreen,
    ui::{project_labels, studio_panels, UiManager},
};

const WINDOW_TITLE: &str = "Viewfinder Studio";
const ROTATE_SPEED: f32 = 0.005;
const ZOOM_SPEED: f32 = 0.5;

pub struct ViewfinderApp {
    config: StudioConfig,
    screen: StudioScreen,
    controller: CameraController,
    cursor: Vector2<f32>,

    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    startup_error: Option<anyhow::Error>,
}

impl ViewfinderApp {
    pub fn new(config: StudioConfig) -> Self {
        let screen = StudioScreen::new(&config);
        Self {
            config,
            screen,
            controller: CameraController::new(ROTATE_SPEED, ZOOM_SPEED),
            cursor: Vector2::new(0.0, 0.0),
            window: None,
            render_engine: None,
            ui_manager: None,
            startup_error: None,
        }
    }

    /// Runs the event loop until the window closes
    ///
    /// Fails if the window or the GPU could not be set up.
    pub fn run(config: StudioConfig) -> anyhow::Result<()> {
        let event_loop = EventLoop::new().context("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = Self::new(config);
        event_loop
            .run_app(&mut app)
            .context("Event loop terminated with an error")?;

        match app.startup_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );

        let (width, height) = window.inner_size().into();
        let engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            width,
            height,
            &self.config,
            self.screen.scene(),
            self.screen.camera_eye(),
        ))?;

        let ui_manager = UiManager::new(
            engine.device(),
            engine.queue(),
            engine.surface_format(),
            &window,
            self.config.ui_font_size,
        );

        // a fresh engine needs the full scene state, not a diff
        self.screen.invalidate();

        self.window = Some(window);
        self.render_engine = Some(engine);
        self.ui_manager = Some(ui_manager);
        Ok(())
    }

    /// Routes a pointer event to the floating window; returns true if it
    /// was consumed there
    fn route_pointer(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vector2::new(position.x as f32, position.y as f32);
                self.screen.pointer_move(self.cursor)
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.screen.pointer_down(self.cursor),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => {
                self.screen.pointer_up();
                self.controller.set_mouse_pressed(false);
                false
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent, ui_captured: bool) {
        let reset_requested = self.controller.process_keyed_events(event);
        if ui_captured {
            return;
        }
        if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
            if event.state == ElementState::Pressed {
                event_loop.exit();
            }
        }
        if reset_requested {
            log::info!("Resetting camera");
            self.screen.reset_camera();
        }
    }

    fn redraw(&mut self, window: &Window) {
        let Some(engine) = self.render_engine.as_mut() else {
            return;
        };

        self.screen.tick(Instant::now(), engine);

        let labels = project_labels(self.screen.scene().labels(), |p| engine.project(p));
        let Some(ui_manager) = self.ui_manager.as_mut() else {
            engine.render_frame(|_, _, _, _| {});
            return;
        };

        let font_size = ui_manager.font_size();
        let screen = &mut self.screen;
        engine.render_frame(|device, queue, encoder, view| {
            ui_manager.draw(device, queue, encoder, window, view, |ui| {
                studio_panels(ui, screen, &labels, font_size);
            });
        });
    }
}

impl ApplicationHandler for ViewfinderApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.init_graphics(event_loop) {
            log::error!("Failed to start the studio: {err:#}");
            self.startup_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };

        let consumed_by_drag = self.route_pointer(&event);
        let ui_captured = self
            .ui_manager
            .as_mut()
            .is_some_and(|ui| ui.handle_input(&window, window_id, &event));

        match event {
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if !consumed_by_drag && !ui_captured {
                    self.controller.set_mouse_pressed(true);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event, ui_captured);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(engine) = self.render_engine.as_mut() {
                    engine.resize(width, height);
                }
            }
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                self.screen.close_assistant();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(&window),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(engine) = self.render_engine.as_mut() else {
            return;
        };

        // UI and window drags take the pointer before the camera does
        if self.ui_manager.as_ref().is_some_and(UiManager::wants_input)
            || self.screen.is_capturing_pointer()
        {
            return;
        }

        if self.controller.process_events(&event, &mut engine.camera) {
            self.screen.orbit_camera(engine.camera.eye);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
