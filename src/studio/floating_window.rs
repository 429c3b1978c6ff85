//! Floating "Shot Details" window host
//!
//! Owns the open/closed flag and the drag controller bound to the window's
//! title-bar handle. The UI layer reads [`FloatingWindow::position`] every
//! frame and places the window there.

use cgmath::Vector2;

use super::drag::{DragController, PointerListeners};

pub const DEFAULT_POSITION: Vector2<f32> = Vector2::new(20.0, 20.0);
pub const WINDOW_WIDTH: f32 = 480.0;
pub const HANDLE_HEIGHT: f32 = 40.0;

#[derive(Debug)]
pub struct FloatingWindow {
    open: bool,
    drag: DragController,
}

impl FloatingWindow {
    pub fn new(listeners: PointerListeners) -> Self {
        Self {
            open: false,
            drag: DragController::new(DEFAULT_POSITION, listeners),
        }
    }

    pub fn open(&mut self) {
        if !self.open {
            log::info!("Opening shot details window");
        }
        self.open = true;
    }

    pub fn close(&mut self) {
        if self.open {
            log::info!("Closing shot details window");
        }
        self.open = false;
        self.drag.release();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn position(&self) -> Vector2<f32> {
        self.drag.position()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// True if `point` lies on the title-bar drag handle
    pub fn handle_contains(&self, point: Vector2<f32>) -> bool {
        let origin = self.position();
        point.x >= origin.x
            && point.x <= origin.x + WINDOW_WIDTH
            && point.y >= origin.y
            && point.y <= origin.y + HANDLE_HEIGHT
    }

    /// Returns true if the press started a window drag
    pub fn pointer_down(&mut self, pointer: Vector2<f32>) -> bool {
        if !self.open {
            return false;
        }
        let on_handle = self.handle_contains(pointer);
        self.drag.pointer_down(pointer, on_handle)
    }

    pub fn pointer_move(&mut self, pointer: Vector2<f32>) -> bool {
        self.open && self.drag.pointer_move(pointer)
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    /// Placeholder for the hand-off to the assistant chat
    pub fn continue_to_chat(&self) {
        log::info!("Navigating to AI chat...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_window_ignores_pointer() {
        let mut window = FloatingWindow::new(PointerListeners::new());
        assert!(!window.pointer_down(Vector2::new(30.0, 30.0)));
        assert!(!window.pointer_move(Vector2::new(100.0, 100.0)));
        assert_eq!(window.position(), DEFAULT_POSITION);
    }

    #[test]
    fn test_drag_by_handle() {
        let mut window = FloatingWindow::new(PointerListeners::new());
        window.open();

        assert!(window.pointer_down(Vector2::new(30.0, 30.0)));
        window.pointer_move(Vector2::new(130.0, 80.0));
        window.pointer_up();

        assert_eq!(window.position(), Vector2::new(120.0, 70.0));
    }

    #[test]
    fn test_press_below_handle_does_not_drag() {
        let mut window = FloatingWindow::new(PointerListeners::new());
        window.open();
        assert!(!window.pointer_down(Vector2::new(30.0, 20.0 + HANDLE_HEIGHT + 5.0)));
        assert!(!window.is_dragging());
    }

    #[test]
    fn test_close_mid_drag_releases_listeners() {
        let listeners = PointerListeners::new();
        let mut window = FloatingWindow::new(listeners.clone());
        window.open();
        window.pointer_down(Vector2::new(25.0, 25.0));
        assert_eq!(listeners.active(), 1);

        window.close();
        assert_eq!(listeners.active(), 0);
        assert!(!window.is_dragging());
    }
}
