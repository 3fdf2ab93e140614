//! Loader double and scene fixtures used by unit tests

use cgmath::Vector3;

use super::descriptor::SourceDescriptor;
use super::error::Result;
use super::loader::{AssetLoader, LoadCompleter, LoadedScene, PendingLoad};
use crate::gfx::resources::TextureData;
use crate::gfx::scene::mesh::unit_cube;

/// Loader that holds every request until the test completes it
#[derive(Default)]
pub struct ManualLoader {
    pub requests: Vec<(SourceDescriptor, Option<LoadCompleter>)>,
}

impl ManualLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers request number `index`
    pub fn complete(&mut self, index: usize, result: Result<LoadedScene>) {
        if let Some(completer) = self.requests[index].1.take() {
            completer.complete(result);
        }
    }

    /// Answers the most recent request
    pub fn complete_latest(&mut self, result: Result<LoadedScene>) {
        let last = self.requests.len() - 1;
        self.complete(last, result);
    }
}

impl AssetLoader for ManualLoader {
    fn request(&mut self, descriptor: &SourceDescriptor) -> PendingLoad {
        let (completer, pending) = PendingLoad::channel();
        self.requests.push((descriptor.clone(), Some(completer)));
        pending
    }
}

/// Five meshes: a house, a window light, smoke and two presents
pub fn village_scene() -> LoadedScene {
    LoadedScene {
        meshes: vec![
            unit_cube("House", Vector3::new(0.0, 0.5, 0.0)),
            unit_cube("Window_emission-yellow", Vector3::new(1.0, 0.5, 0.0)),
            unit_cube("Presents_Red", Vector3::new(3.0, 0.5, 0.0)),
            unit_cube("Chimney_Smoke", Vector3::new(0.0, 2.0, 0.0)),
            unit_cube("presents_green", Vector3::new(5.0, 0.5, 0.0)),
        ],
        baked_texture: Some(TextureData::white()),
    }
}
