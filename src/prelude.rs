//! # Snowglobe Prelude
//!
//! Commonly used types in one import.
//!
//! ```no_run
//! use snowglobe::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DioramaConfig::from_env().with_model_path("assets/models/village.obj");
//!     DioramaApp::new(config)?.run()
//! }
//! ```

// Application
pub use crate::app::DioramaApp;
pub use crate::config::{
    CameraSettings, DioramaConfig, HighlightSettings, MusicSettings, SnowSettings,
};

// Per-frame core
pub use crate::clock::{FrameClock, FrameTime};
pub use crate::orchestrator::{SceneOrchestrator, SceneResources, TickReport, Viewport};

// Assets
pub use crate::assets::{
    AssetLoader, LoadError, LoadState, ObjAssetLoader, PropId, ResourceBundle,
    ResourceLifecycleManager, SourceDescriptor,
};

// Effects and interaction
pub use crate::animation::{AnimationClip, AnimationPlayer};
pub use crate::gfx::highlight::HighlightAnimator;
pub use crate::gfx::picking::InteractionRaycaster;
pub use crate::simulation::snowfall::{ParticleField, ParticleFieldBuilder};

// Audio
pub use crate::audio::{AudioSink, MusicToggle};

// Rendering seam
pub use crate::gfx::resources::RenderBackend;

// Re-export common external dependencies
pub use cgmath::{Vector2, Vector3};
