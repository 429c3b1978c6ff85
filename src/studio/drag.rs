//! Pointer-drag state machine
//!
//! A drag starts with a pointer press on a handle and then follows the
//! pointer anywhere in the window until the button is released. Following the
//! pointer outside the handle needs window-wide move/up delivery, which is
//! modelled as a [`ListenerRegistration`] taken from a shared
//! [`PointerListeners`] registry. The registration is an RAII guard, so it is
//! released on pointer-up, on an explicit [`DragController::release`], and
//! whenever the controller is dropped.

use std::{cell::Cell, rc::Rc};

use cgmath::Vector2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Released,
    Dragging {
        /// Pointer position minus element position at press time
        grab_offset: Vector2<f32>,
    },
}

/// Registry of window-wide pointer listeners
///
/// Cheap to clone; clones share the same registration count.
#[derive(Debug, Clone, Default)]
pub struct PointerListeners {
    active: Rc<Cell<usize>>,
}

impl PointerListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers window-wide move/up listeners until the guard is dropped
    pub fn acquire(&self) -> ListenerRegistration {
        self.active.set(self.active.get() + 1);
        ListenerRegistration {
            active: Rc::clone(&self.active),
        }
    }

    /// Number of live registrations
    pub fn active(&self) -> usize {
        self.active.get()
    }

    /// True while anyone needs window-wide pointer events
    pub fn is_capturing(&self) -> bool {
        self.active() > 0
    }
}

/// Live window-wide listener registration; deregisters on drop
#[derive(Debug)]
pub struct ListenerRegistration {
    active: Rc<Cell<usize>>,
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.active.set(self.active.get().saturating_sub(1));
    }
}

#[derive(Debug)]
pub struct DragController {
    position: Vector2<f32>,
    state: DragState,
    listeners: PointerListeners,
    registration: Option<ListenerRegistration>,
}

impl DragController {
    pub fn new(position: Vector2<f32>, listeners: PointerListeners) -> Self {
        Self {
            position,
            state: DragState::Released,
            listeners,
            registration: None,
        }
    }

    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Handles a press; only presses on the handle start a drag
    ///
    /// Returns true if a drag started.
    pub fn pointer_down(&mut self, pointer: Vector2<f32>, on_handle: bool) -> bool {
        if !on_handle || self.is_dragging() {
            return false;
        }

        self.state = DragState::Dragging {
            grab_offset: pointer - self.position,
        };
        self.registration = Some(self.listeners.acquire());
        log::debug!("Drag started at ({:.1}, {:.1})", pointer.x, pointer.y);
        true
    }

    /// Follows the pointer while dragging; positions are not clamped
    ///
    /// Returns true if the element moved.
    pub fn pointer_move(&mut self, pointer: Vector2<f32>) -> bool {
        match self.state {
            DragState::Dragging { grab_offset } => {
                self.position = pointer - grab_offset;
                true
            }
            DragState::Released => false,
        }
    }

    /// Ends the drag wherever the pointer is released
    pub fn pointer_up(&mut self) {
        if self.is_dragging() {
            log::debug!(
                "Drag ended at ({:.1}, {:.1})",
                self.position.x,
                self.position.y
            );
        }
        self.release();
    }

    /// Drops any drag in progress and its listener registration
    pub fn release(&mut self) {
        self.state = DragState::Released;
        self.registration = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_follows_pointer_minus_grab_offset() {
        let listeners = PointerListeners::new();
        let mut drag = DragController::new(Vector2::new(20.0, 20.0), listeners);

        assert!(drag.pointer_down(Vector2::new(10.0, 10.0), true));
        assert_eq!(
            drag.state(),
            DragState::Dragging {
                grab_offset: Vector2::new(-10.0, -10.0)
            }
        );

        drag.pointer_move(Vector2::new(15.0, 15.0));
        drag.pointer_up();

        assert_eq!(drag.position(), Vector2::new(25.0, 25.0));
        assert_eq!(drag.state(), DragState::Released);
    }

    #[test]
    fn test_press_outside_handle_is_ignored() {
        let mut drag = DragController::new(Vector2::new(0.0, 0.0), PointerListeners::new());
        assert!(!drag.pointer_down(Vector2::new(5.0, 5.0), false));
        assert!(!drag.pointer_move(Vector2::new(50.0, 50.0)));
        assert_eq!(drag.position(), Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_drag_is_not_clamped_to_screen() {
        let mut drag = DragController::new(Vector2::new(20.0, 20.0), PointerListeners::new());
        drag.pointer_down(Vector2::new(30.0, 25.0), true);
        drag.pointer_move(Vector2::new(-500.0, -400.0));
        assert_eq!(drag.position(), Vector2::new(-510.0, -405.0));
    }

    #[test]
    fn test_listeners_registered_only_while_dragging() {
        let listeners = PointerListeners::new();
        let mut drag = DragController::new(Vector2::new(0.0, 0.0), listeners.clone());
        assert_eq!(listeners.active(), 0);

        drag.pointer_down(Vector2::new(1.0, 1.0), true);
        assert_eq!(listeners.active(), 1);

        // a second press while dragging must not register twice
        drag.pointer_down(Vector2::new(2.0, 2.0), true);
        assert_eq!(listeners.active(), 1);

        drag.pointer_up();
        assert_eq!(listeners.active(), 0);
    }

    #[test]
    fn test_dropping_controller_mid_drag_releases_listeners() {
        let listeners = PointerListeners::new();
        {
            let mut drag = DragController::new(Vector2::new(0.0, 0.0), listeners.clone());
            drag.pointer_down(Vector2::new(1.0, 1.0), true);
            assert!(listeners.is_capturing());
        }
        assert!(!listeners.is_capturing());
    }
}
