// Engine module - map viewer core plus the egui HUD
// Everything except `hud` runs without a window or GPU.

pub mod camera;
pub mod config;
pub mod hud;
pub mod input;
pub mod measure;
pub mod motion;
pub mod navigation;
pub mod picking;
pub mod viewport;

// Re-export commonly used items
pub use config::ViewerConfig;
pub use input::{InputCommand, InputState};
pub use viewport::{CommandOutcome, ViewportState};
