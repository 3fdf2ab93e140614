//! Asynchronous scene loading
//!
//! A load request returns a [`PendingLoad`] immediately. The parsed result is
//! delivered through a oneshot channel and only ever picked up on the main
//! thread when the lifecycle manager polls, so completion can never run in the
//! middle of a tick.

use std::path::Path;

use futures::channel::oneshot;

use super::descriptor::SourceDescriptor;
use super::error::{LoadError, Result};
use crate::gfx::resources::TextureData;
use crate::gfx::scene::SceneMesh;

/// Raw output of a successful load, before any GPU work
#[derive(Clone, Debug)]
pub struct LoadedScene {
    pub meshes: Vec<SceneMesh>,
    pub baked_texture: Option<TextureData>,
}

/// Receiving end of an in-flight load
pub struct PendingLoad {
    receiver: oneshot::Receiver<Result<LoadedScene>>,
}

/// Sending end of an in-flight load
pub struct LoadCompleter {
    sender: oneshot::Sender<Result<LoadedScene>>,
}

impl PendingLoad {
    pub fn channel() -> (LoadCompleter, PendingLoad) {
        let (sender, receiver) = oneshot::channel();
        (LoadCompleter { sender }, PendingLoad { receiver })
    }

    /// Takes the result if the load has finished
    ///
    /// A loader that went away without answering yields [`LoadError::Cancelled`].
    pub fn try_take(&mut self) -> Option<Result<LoadedScene>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(LoadError::Cancelled)),
        }
    }
}

impl LoadCompleter {
    pub fn complete(self, result: Result<LoadedScene>) {
        // The receiver is gone when the load was superseded
        if self.sender.send(result).is_err() {
            log::debug!("Dropping result of a superseded load");
        }
    }
}

/// Source of scene data
pub trait AssetLoader {
    fn request(&mut self, descriptor: &SourceDescriptor) -> PendingLoad;
}

/// Loads Wavefront OBJ models and their baked texture on a worker thread
#[derive(Default)]
pub struct ObjAssetLoader;

impl ObjAssetLoader {
    pub fn new() -> Self {
        Self
    }
}

impl AssetLoader for ObjAssetLoader {
    fn request(&mut self, descriptor: &SourceDescriptor) -> PendingLoad {
        let (completer, pending) = PendingLoad::channel();
        let descriptor = descriptor.clone();

        let spawned = std::thread::Builder::new()
            .name("scene-loader".to_string())
            .spawn(move || completer.complete(load_scene(&descriptor)));
        if let Err(err) = spawned {
            // The completer was dropped with the closure, so the pending load
            // resolves to Cancelled on the next poll.
            log::error!("Failed to spawn scene loader thread: {}", err);
        }

        pending
    }
}

/// Parses the model and decodes the baked texture described by `descriptor`
pub fn load_scene(descriptor: &SourceDescriptor) -> Result<LoadedScene> {
    let meshes = load_obj_meshes(&descriptor.model_path)?;

    let baked_texture = match &descriptor.baked_texture_path {
        Some(path) => Some(TextureData::from_path(path).map_err(|source| LoadError::Texture {
            path: path.clone(),
            source,
        })?),
        None => None,
    };

    Ok(LoadedScene {
        meshes,
        baked_texture,
    })
}

fn load_obj_meshes(path: &Path) -> Result<Vec<SceneMesh>> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Model {
        path: path.to_path_buf(),
        source,
    })?;

    let meshes: Vec<SceneMesh> = models
        .into_iter()
        .filter(|model| !model.mesh.positions.is_empty())
        .map(|model| {
            let mesh = model.mesh;
            SceneMesh::from_arrays(
                model.name,
                &mesh.positions,
                &mesh.normals,
                &mesh.texcoords,
                mesh.indices,
            )
        })
        .collect();

    if meshes.is_empty() {
        return Err(LoadError::EmptyScene(path.to_path_buf()));
    }

    log::debug!("Parsed {} meshes from {}", meshes.len(), path.display());
    Ok(meshes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const TWO_OBJECTS: &str = "\
o House
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o Presents_Red
v 2.0 0.0 0.0
v 3.0 0.0 0.0
v 2.0 1.0 0.0
v 3.0 1.0 0.0
f 4 5 7 6
";

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("snowglobe-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_scene_reads_named_meshes() {
        let path = write_temp("two.obj", TWO_OBJECTS);
        let scene = load_scene(&SourceDescriptor::new(&path)).unwrap();

        let names: Vec<&str> = scene.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["House", "Presents_Red"]);
        assert_eq!(scene.meshes[1].triangle_count(), 2);
        assert!(scene.baked_texture.is_none());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_model_is_a_model_error() {
        let result = load_scene(&SourceDescriptor::new("no/such/model.obj"));
        assert!(matches!(result, Err(LoadError::Model { .. })));
    }

    #[test]
    fn test_missing_texture_is_a_texture_error() {
        let path = write_temp("tex.obj", TWO_OBJECTS);
        let descriptor = SourceDescriptor::new(&path).with_baked_texture("no/such/baked.jpg");
        assert!(matches!(load_scene(&descriptor), Err(LoadError::Texture { .. })));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_pending_load_resolves_once_completed() {
        let (completer, mut pending) = PendingLoad::channel();
        assert!(pending.try_take().is_none());

        completer.complete(Ok(LoadedScene {
            meshes: Vec::new(),
            baked_texture: None,
        }));
        assert!(matches!(pending.try_take(), Some(Ok(_))));
    }

    #[test]
    fn test_dropped_completer_cancels() {
        let (completer, mut pending) = PendingLoad::channel();
        drop(completer);
        assert!(matches!(pending.try_take(), Some(Err(LoadError::Cancelled))));
    }

    #[test]
    fn test_worker_thread_delivers_result() {
        let path = write_temp("worker.obj", TWO_OBJECTS);
        let mut pending = ObjAssetLoader::new().request(&SourceDescriptor::new(&path));

        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert_eq!(result.unwrap().meshes.len(), 2);
        std::fs::remove_file(path).ok();
    }
}
