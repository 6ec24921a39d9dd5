//! Reusable UI components

pub mod button;

pub use button::{render_button, BUTTON_HEIGHT};
