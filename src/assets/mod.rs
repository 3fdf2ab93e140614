//! # Scene Assets
//!
//! Loading, classification and ownership of the diorama's scene resources.
//!
//! - [`SourceDescriptor`] - What to load and which ride clips to bind
//! - [`AssetLoader`] - Asynchronous model/texture loading seam
//! - [`ResourceBundle`] - Everything one successful load produced
//! - [`ResourceLifecycleManager`] - Load, publish and dispose state machine

pub mod bundle;
pub mod classify;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod loader;

#[cfg(test)]
pub mod testing;

pub use bundle::{InteractableProp, PropId, ResourceBundle};
pub use classify::{classify_mesh, MeshClass};
pub use descriptor::{ClipSpec, SourceDescriptor};
pub use error::LoadError;
pub use lifecycle::{LoadState, LoadStateKind, ResourceLifecycleManager};
pub use loader::{AssetLoader, LoadedScene, ObjAssetLoader, PendingLoad};
