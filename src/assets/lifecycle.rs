//! # Scene Resource Lifecycle
//!
//! ```text
//! Unloaded --load--> Loading --complete(ok)--> Ready --dispose--> Disposed
//!                       |                                  ^
//!                       +--complete(err)--> Failed         |
//!                       +--dispose (invalidates load)------+
//! ```
//!
//! The bundle lives inside [`LoadState::Ready`], so nothing can reach a
//! bundle that is still being assembled or already torn down. Every `load`
//! and every effective `dispose` bumps a generation counter; a completion
//! carrying an older generation is dropped instead of installed.

use super::bundle::ResourceBundle;
use super::descriptor::SourceDescriptor;
use super::error::{LoadError, Result};
use super::loader::{AssetLoader, LoadedScene, PendingLoad};
use crate::config::SnowSettings;
use crate::gfx::resources::RenderBackend;
use crate::simulation::snowfall::{ParticleField, ParticleFieldBuilder};

pub enum LoadState {
    Unloaded,
    Loading,
    Ready(Box<ResourceBundle>),
    Failed(LoadError),
    Disposed,
}

/// [`LoadState`] without its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStateKind {
    Unloaded,
    Loading,
    Ready,
    Failed,
    Disposed,
}

impl LoadState {
    pub fn kind(&self) -> LoadStateKind {
        match self {
            LoadState::Unloaded => LoadStateKind::Unloaded,
            LoadState::Loading => LoadStateKind::Loading,
            LoadState::Ready(_) => LoadStateKind::Ready,
            LoadState::Failed(_) => LoadStateKind::Failed,
            LoadState::Disposed => LoadStateKind::Disposed,
        }
    }
}

/// Owns the active scene bundle and drives its loading and teardown
pub struct ResourceLifecycleManager {
    state: LoadState,
    generation: u64,
    pending: Option<(u64, PendingLoad)>,
    descriptor: Option<SourceDescriptor>,
    snow: SnowSettings,
    snow_seed: Option<u64>,
}

impl ResourceLifecycleManager {
    pub fn new(snow: SnowSettings) -> Self {
        Self {
            state: LoadState::Unloaded,
            generation: 0,
            pending: None,
            descriptor: None,
            snow,
            snow_seed: None,
        }
    }

    /// Seeds the snowfall of every bundle built from now on
    pub fn with_snow_seed(mut self, seed: u64) -> Self {
        self.snow_seed = Some(seed);
        self
    }

    /// Starts loading `descriptor`, dropping whatever was active
    ///
    /// Returns the generation of the new load.
    pub fn load(
        &mut self,
        descriptor: SourceDescriptor,
        loader: &mut dyn AssetLoader,
        backend: &mut dyn RenderBackend,
    ) -> u64 {
        self.dispose(backend);

        self.generation += 1;
        let pending = loader.request(&descriptor);
        log::debug!(
            "Loading {} (generation {})",
            descriptor.model_path.display(),
            self.generation
        );

        self.pending = Some((self.generation, pending));
        self.descriptor = Some(descriptor);
        self.state = LoadState::Loading;
        self.generation
    }

    /// Installs a finished load, if one arrived since the last poll
    ///
    /// Returns whether the state changed.
    pub fn poll(&mut self, backend: &mut dyn RenderBackend) -> bool {
        let Some((generation, pending)) = self.pending.as_mut() else {
            return false;
        };
        let generation = *generation;

        match pending.try_take() {
            Some(result) => {
                self.pending = None;
                self.complete(generation, result, backend)
            }
            None => false,
        }
    }

    /// Applies the result of load `generation`
    ///
    /// Results of superseded loads are discarded. Returns whether the result
    /// was applied.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<LoadedScene>,
        backend: &mut dyn RenderBackend,
    ) -> bool {
        if generation != self.generation || !matches!(self.state, LoadState::Loading) {
            log::warn!(
                "Discarding stale load result (generation {}, current {})",
                generation,
                self.generation
            );
            return false;
        }
        if self.pending.as_ref().is_some_and(|(g, _)| *g == generation) {
            self.pending = None;
        }

        match result {
            Ok(scene) => {
                let clips = self
                    .descriptor
                    .as_ref()
                    .map(|descriptor| descriptor.clips.as_slice())
                    .unwrap_or_default();
                let bundle = ResourceBundle::build(scene, clips, self.build_snow(), backend);
                log::info!(
                    "Scene ready: {} meshes, {} interactive props",
                    bundle.meshes.len(),
                    bundle.props.len()
                );
                self.state = LoadState::Ready(Box::new(bundle));
            }
            Err(err) => {
                log::error!("Scene load failed: {}", err);
                self.state = LoadState::Failed(err);
            }
        }
        true
    }

    /// Tears down the active bundle or abandons the load in flight
    ///
    /// A no-op when there is nothing to dispose.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        match std::mem::replace(&mut self.state, LoadState::Disposed) {
            LoadState::Ready(mut bundle) => {
                bundle.release(backend);
                self.generation += 1;
                log::debug!("Disposed scene bundle");
            }
            LoadState::Loading => {
                self.pending = None;
                self.generation += 1;
                log::debug!("Abandoned load in flight");
            }
            previous => {
                log::debug!("Nothing to dispose");
                self.state = previous;
            }
        }
    }

    /// Disposes and reloads the last descriptor
    ///
    /// Returns whether a load was issued.
    pub fn reset(&mut self, loader: &mut dyn AssetLoader, backend: &mut dyn RenderBackend) -> bool {
        match self.descriptor.clone() {
            Some(descriptor) => {
                self.load(descriptor, loader, backend);
                true
            }
            None => {
                log::debug!("Reset requested before any load");
                false
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn state_kind(&self) -> LoadStateKind {
        self.state.kind()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }

    pub fn bundle(&self) -> Option<&ResourceBundle> {
        match &self.state {
            LoadState::Ready(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn bundle_mut(&mut self) -> Option<&mut ResourceBundle> {
        match &mut self.state {
            LoadState::Ready(bundle) => Some(bundle),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        match &self.state {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> Option<&SourceDescriptor> {
        self.descriptor.as_ref()
    }

    fn build_snow(&self) -> ParticleField {
        let builder = ParticleFieldBuilder::from_settings(self.snow.clone());
        match self.snow_seed {
            Some(seed) => builder.with_seed(seed).build(),
            None => builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::{village_scene, ManualLoader};
    use crate::gfx::resources::testing::{BackendCall, RecordingBackend};

    fn manager() -> ResourceLifecycleManager {
        let snow = SnowSettings {
            count: 32,
            ..Default::default()
        };
        ResourceLifecycleManager::new(snow).with_snow_seed(11)
    }

    fn descriptor() -> SourceDescriptor {
        SourceDescriptor::new("village.obj")
    }

    #[test]
    fn test_loading_until_completion_arrives() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();
        assert_eq!(assets.state_kind(), LoadStateKind::Unloaded);

        assets.load(descriptor(), &mut loader, &mut backend);
        assert_eq!(assets.state_kind(), LoadStateKind::Loading);
        assert!(!assets.poll(&mut backend));
        assert!(assets.bundle().is_none());

        loader.complete_latest(Ok(village_scene()));
        assert!(assets.poll(&mut backend));
        assert_eq!(assets.state_kind(), LoadStateKind::Ready);
        assert_eq!(assets.bundle().unwrap().props.len(), 2);
    }

    #[test]
    fn test_failure_enters_failed_state() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        assets.load(descriptor(), &mut loader, &mut backend);
        loader.complete_latest(Err(LoadError::EmptyScene("village.obj".into())));
        assert!(assets.poll(&mut backend));

        assert_eq!(assets.state_kind(), LoadStateKind::Failed);
        assert!(matches!(assets.last_error(), Some(LoadError::EmptyScene(_))));
        assert!(assets.bundle().is_none());
        assert!(backend.calls.is_empty());

        // Nothing was created, so dispose has nothing to release
        assets.dispose(&mut backend);
        assert_eq!(assets.state_kind(), LoadStateKind::Failed);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        let first = assets.load(descriptor(), &mut loader, &mut backend);
        let second = assets.load(descriptor(), &mut loader, &mut backend);
        assert!(second > first);

        assert!(!assets.complete(first, Ok(village_scene()), &mut backend));
        assert_eq!(assets.state_kind(), LoadStateKind::Loading);
        assert!(backend.calls.is_empty());

        // The superseded channel was dropped; answering it changes nothing
        loader.complete(0, Ok(village_scene()));
        assert!(!assets.poll(&mut backend));

        loader.complete(1, Ok(village_scene()));
        assert!(assets.poll(&mut backend));
        assert!(assets.is_ready());
    }

    #[test]
    fn test_dispose_mid_load_invalidates() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        let generation = assets.load(descriptor(), &mut loader, &mut backend);
        assets.dispose(&mut backend);
        assert_eq!(assets.state_kind(), LoadStateKind::Disposed);

        assert!(!assets.complete(generation, Ok(village_scene()), &mut backend));
        assert_eq!(assets.state_kind(), LoadStateKind::Disposed);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_dispose_releases_in_order() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        assets.load(descriptor(), &mut loader, &mut backend);
        loader.complete_latest(Ok(village_scene()));
        assets.poll(&mut backend);
        assets.dispose(&mut backend);

        let releases = backend.releases();
        assert!(matches!(releases.first(), Some(BackendCall::ReleasePoints(_))));
        assert!(matches!(releases.get(1), Some(BackendCall::ReleaseTexture(_))));
        assert_eq!(releases.len(), 7);
        assert_eq!(assets.state_kind(), LoadStateKind::Disposed);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        assets.dispose(&mut backend);
        assert_eq!(assets.state_kind(), LoadStateKind::Unloaded);

        assets.load(descriptor(), &mut loader, &mut backend);
        loader.complete_latest(Ok(village_scene()));
        assets.poll(&mut backend);
        assets.dispose(&mut backend);
        let released = backend.releases().len();
        assets.dispose(&mut backend);
        assert_eq!(backend.releases().len(), released);
    }

    #[test]
    fn test_reset_twice_keeps_latest_load() {
        let mut backend = RecordingBackend::new();
        let mut loader = ManualLoader::new();
        let mut assets = manager();

        assert!(!assets.reset(&mut loader, &mut backend));

        assets.load(descriptor(), &mut loader, &mut backend);
        loader.complete_latest(Ok(village_scene()));
        assets.poll(&mut backend);

        assert!(assets.reset(&mut loader, &mut backend));
        assert!(assets.reset(&mut loader, &mut backend));
        assert_eq!(loader.requests.len(), 3);
        assert_eq!(assets.state_kind(), LoadStateKind::Loading);
        // First reset released the ready bundle, second only abandoned a load
        assert_eq!(backend.releases().len(), 7);

        loader.complete(1, Ok(village_scene()));
        assert!(!assets.poll(&mut backend));
        loader.complete(2, Ok(village_scene()));
        assert!(assets.poll(&mut backend));

        let bundle = assets.bundle().unwrap();
        assert_eq!(bundle.meshes.len(), 5);
        assert!(bundle.snow.is_attached());
    }
}
