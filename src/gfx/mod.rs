//! # Graphics Module
//!
//! Everything between the diorama core and the screen.
//!
//! - **Camera System** ([`camera`]) - Orbit camera with mouse controls
//! - **Picking** ([`picking`]) - Hover ray casting against prop bounds
//! - **Highlight** ([`highlight`]) - Eased hover scaling of props
//! - **Rendering Pipeline** ([`rendering`]) - wgpu engine, pipelines and shaders
//! - **Resource Management** ([`resources`]) - Backend trait, handles and textures
//! - **Scene Data** ([`scene`]) - Meshes and the vertex format

pub mod camera;
pub mod highlight;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use highlight::HighlightAnimator;
pub use picking::InteractionRaycaster;
pub use rendering::render_engine::RenderEngine;
