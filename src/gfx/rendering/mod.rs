//! Core rendering functionality
//!
//! Pipelines, uniform buffers and the wgpu [`RenderEngine`] that backs the
//! diorama's [`RenderBackend`](crate::gfx::resources::RenderBackend).

pub mod pipelines;
pub mod render_engine;
pub mod uniform;

pub use pipelines::PipelineConfig;
pub use render_engine::{RenderEngine, RenderError};
pub use uniform::UniformBuffer;
