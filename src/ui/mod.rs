//! # User Interface Module
//!
//! Dear ImGui overlay for the studio.
//!
//! - [`UiManager`] - ImGui context, winit platform glue and the wgpu overlay pass
//! - [`panels`] - the sidebars, the "Shot Details" window and label overlays
//!
//! Panels write only through the
//! [`ParameterStore`](crate::studio::ParameterStore) exposed by
//! [`StudioScreen`](crate::studio::StudioScreen). When the UI wants the mouse,
//! orbit input is not forwarded to the camera.

pub mod manager;
pub mod panels;

pub use manager::UiManager;
pub use panels::{project_labels, studio_panels, ProjectedLabel};
