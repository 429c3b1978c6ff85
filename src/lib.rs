// src/lib.rs
//! Viewfinder studio planner
//!
//! An interactive 3D studio for planning videography shots, built on wgpu
//! and winit. The [`studio`] core is GPU-free; [`gfx`] renders it and [`ui`]
//! edits it.

pub mod app;
pub mod config;
pub mod gfx;
pub mod studio;
pub mod ui;
pub mod wgpu_utils;

pub use app::ViewfinderApp;
pub use studio::StudioScreen;
