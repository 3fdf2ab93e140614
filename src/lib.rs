// src/lib.rs
//! Snowglobe
//!
//! An interactive holiday diorama built on wgpu and winit: a baked-lighting
//! village model with procedural snowfall, hover-highlighted props and
//! spinning rides.

pub mod animation;
pub mod app;
pub mod assets;
pub mod audio;
pub mod clock;
pub mod config;
pub mod gfx;
pub mod orchestrator;
pub mod prelude;
pub mod simulation;

// Re-export main types for convenience
pub use app::DioramaApp;
pub use config::DioramaConfig;

/// Opens the diorama window and blocks until it closes
pub fn run(config: DioramaConfig) -> anyhow::Result<()> {
    DioramaApp::new(config)?.run()
}
