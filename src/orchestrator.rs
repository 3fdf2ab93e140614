//! # Per-frame driver
//!
//! One [`SceneOrchestrator::tick`] per displayed frame, always in this order:
//!
//! 1. install a finished load (if any)
//! 2. hover ray cast, only when the pointer or camera moved
//! 3. highlight easing
//! 4. snowfall update and upload
//! 5. ride animation
//! 6. mesh transforms and render
//!
//! Until a bundle is ready only the render step runs.

use cgmath::{Matrix4, SquareMatrix};

use crate::assets::bundle::{PropId, ResourceBundle};
use crate::assets::descriptor::SourceDescriptor;
use crate::assets::lifecycle::ResourceLifecycleManager;
use crate::assets::loader::AssetLoader;
use crate::clock::FrameTime;
use crate::config::DioramaConfig;
use crate::gfx::camera::OrbitCamera;
use crate::gfx::highlight::HighlightAnimator;
use crate::gfx::picking::InteractionRaycaster;
use crate::gfx::resources::RenderBackend;

/// Drawable surface size in physical pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

/// Mutable scene state handed to every tick
pub struct SceneResources {
    pub assets: ResourceLifecycleManager,
    pub raycaster: InteractionRaycaster,
    pub highlight: HighlightAnimator,
    viewport: Option<Viewport>,
}

impl SceneResources {
    pub fn new(config: &DioramaConfig) -> Self {
        Self {
            assets: ResourceLifecycleManager::new(config.snow.clone()),
            raycaster: InteractionRaycaster::new(),
            highlight: HighlightAnimator::new(config.highlight),
            viewport: None,
        }
    }

    /// Records the surface size and forwards it to the live snowfall
    ///
    /// Bundles published later pick it up before their first upload.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        if let Some(bundle) = self.assets.bundle_mut() {
            apply_viewport(bundle, viewport);
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn load(
        &mut self,
        descriptor: SourceDescriptor,
        loader: &mut dyn AssetLoader,
        backend: &mut dyn RenderBackend,
    ) -> u64 {
        self.forget_props();
        self.assets.load(descriptor, loader, backend)
    }

    /// Disposes the current scene and loads it again
    pub fn reset(&mut self, loader: &mut dyn AssetLoader, backend: &mut dyn RenderBackend) -> bool {
        self.forget_props();
        self.assets.reset(loader, backend)
    }

    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        self.forget_props();
        self.assets.dispose(backend);
    }

    fn forget_props(&mut self) {
        self.highlight.clear();
        self.raycaster.clear();
    }
}

/// What happened during one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub hovered: Option<PropId>,
    /// Hovered prop differs from the previous tick
    pub hover_changed: bool,
    pub ready: bool,
}

#[derive(Default)]
pub struct SceneOrchestrator {
    last_hovered: Option<PropId>,
}

impl SceneOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(
        &mut self,
        resources: &mut SceneResources,
        frame: FrameTime,
        camera: &OrbitCamera,
        backend: &mut dyn RenderBackend,
    ) -> TickReport {
        let SceneResources {
            assets,
            raycaster,
            highlight,
            viewport,
        } = resources;

        if assets.poll(backend) {
            match assets.bundle_mut() {
                Some(bundle) => {
                    highlight.track(&bundle.props);
                    if let Some(viewport) = *viewport {
                        apply_viewport(bundle, viewport);
                    }
                }
                None => highlight.clear(),
            }
            raycaster.clear();
        }

        backend.set_effect_time(frame.elapsed);

        let hovered = match assets.bundle_mut() {
            Some(bundle) => {
                raycaster.maybe_update(camera, bundle.pick_targets(highlight));
                let hovered = raycaster.hovered();
                highlight.update(hovered);

                bundle.snow.update(frame.elapsed);
                bundle.snow.upload(backend);

                bundle.animation.advance(frame.delta);
                push_transforms(bundle, highlight, backend);
                hovered
            }
            None => None,
        };

        backend.render_frame(&camera.uniform);

        let hover_changed = hovered != self.last_hovered;
        if hover_changed {
            log::debug!("Hover changed: {:?} -> {:?}", self.last_hovered, hovered);
            self.last_hovered = hovered;
        }

        TickReport {
            hovered,
            hover_changed,
            ready: assets.is_ready(),
        }
    }
}

fn apply_viewport(bundle: &mut ResourceBundle, viewport: Viewport) {
    bundle
        .snow
        .set_resolution(viewport.width, viewport.height, viewport.pixel_ratio);
}

/// Sends the model transform of every animated or highlighted mesh
fn push_transforms(
    bundle: &ResourceBundle,
    highlight: &HighlightAnimator,
    backend: &mut dyn RenderBackend,
) {
    for (index, mesh) in bundle.meshes.iter().enumerate() {
        let clip = bundle.animation.transform_for(index);
        let scale = bundle
            .props
            .iter()
            .find(|prop| prop.mesh_index == index)
            .and_then(|prop| highlight.transform_for(prop.id));

        if clip.is_none() && scale.is_none() {
            continue;
        }
        let transform = clip.unwrap_or_else(Matrix4::identity) * scale.unwrap_or_else(Matrix4::identity);
        backend.set_mesh_transform(mesh.handle, transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::descriptor::ClipSpec;
    use crate::assets::loader::LoadedScene;
    use crate::assets::testing::{village_scene, ManualLoader};
    use crate::config::{CameraSettings, SnowSettings};
    use crate::gfx::resources::testing::{BackendCall, RecordingBackend};
    use crate::gfx::scene::mesh::unit_cube;
    use cgmath::{InnerSpace, Vector2, Vector3, Vector4};
    use std::f32::consts::TAU;

    struct Harness {
        resources: SceneResources,
        orchestrator: SceneOrchestrator,
        camera: OrbitCamera,
        loader: ManualLoader,
        backend: RecordingBackend,
        frame: u32,
    }

    impl Harness {
        fn new() -> Self {
            let config = DioramaConfig::default().with_snow(SnowSettings {
                count: 64,
                ..Default::default()
            });
            Self {
                resources: SceneResources::new(&config),
                orchestrator: SceneOrchestrator::new(),
                camera: OrbitCamera::from_settings(&CameraSettings::default(), 1.5),
                loader: ManualLoader::new(),
                backend: RecordingBackend::new(),
                frame: 0,
            }
        }

        fn load(&mut self, descriptor: SourceDescriptor) {
            self.resources
                .load(descriptor, &mut self.loader, &mut self.backend);
        }

        fn tick(&mut self) -> TickReport {
            self.frame += 1;
            let frame = FrameTime {
                elapsed: self.frame as f32 / 60.0,
                delta: 1.0 / 60.0,
            };
            self.orchestrator
                .tick(&mut self.resources, frame, &self.camera, &mut self.backend)
        }
    }

    /// A present right under the screen center and one off to the side
    fn pickable_scene() -> LoadedScene {
        let target = CameraSettings::default().target;
        LoadedScene {
            meshes: vec![
                unit_cube("Ground", Vector3::new(0.0, -1.0, 0.0)),
                unit_cube("presents_center", target),
                unit_cube("presents_side", Vector3::new(-20.0, 0.0, 0.0)),
                unit_cube("carousel", Vector3::new(6.0, 1.0, 0.0)),
            ],
            baked_texture: None,
        }
    }

    #[test]
    fn test_not_ready_only_renders() {
        let mut harness = Harness::new();
        harness.load(SourceDescriptor::new("scene.obj"));
        harness.resources.raycaster.on_pointer_move(Vector2::new(0.0, 0.0));

        let report = harness.tick();
        assert!(!report.ready);
        assert_eq!(report.hovered, None);
        assert_eq!(harness.resources.raycaster.tests_run(), 0);
        assert_eq!(
            harness.backend.calls,
            vec![BackendCall::SetEffectTime(1.0 / 60.0), BackendCall::RenderFrame]
        );
    }

    #[test]
    fn test_hover_after_ready() {
        let mut harness = Harness::new();
        harness.load(SourceDescriptor::new("scene.obj"));
        harness.loader.complete_latest(Ok(pickable_scene()));

        let report = harness.tick();
        assert!(report.ready);
        assert_eq!(report.hovered, None);

        harness.resources.raycaster.on_pointer_move(Vector2::new(0.0, 0.0));
        let report = harness.tick();
        assert_eq!(report.hovered, Some(PropId(0)));
        assert!(report.hover_changed);
        let tests = harness.resources.raycaster.tests_run();

        let report = harness.tick();
        assert_eq!(report.hovered, Some(PropId(0)));
        assert!(!report.hover_changed);
        assert_eq!(harness.resources.raycaster.tests_run(), tests);

        let grown = harness.resources.highlight.current_scale(PropId(0)).unwrap();
        assert!(grown.x > 1.0);
        let resting = harness.resources.highlight.current_scale(PropId(1)).unwrap();
        assert_eq!(resting.x, 1.0);
    }

    #[test]
    fn test_tick_order() {
        let mut harness = Harness::new();
        let descriptor = SourceDescriptor::new("scene.obj").with_clip(ClipSpec::spin(
            "carousel",
            "carousel",
            Vector3::unit_y(),
            0.1,
        ));
        harness.load(descriptor);
        harness.loader.complete_latest(Ok(pickable_scene()));
        harness.tick();

        harness.backend.calls.clear();
        harness.tick();
        let calls = &harness.backend.calls;

        let position = |predicate: fn(&BackendCall) -> bool| calls.iter().position(predicate).unwrap();
        let time = position(|c| matches!(c, BackendCall::SetEffectTime(_)));
        let snow = position(|c| matches!(c, BackendCall::WritePointPositions(..)));
        let transform = position(|c| matches!(c, BackendCall::SetMeshTransform(_)));
        assert!(time < snow);
        assert!(snow < transform);
        assert_eq!(calls.last(), Some(&BackendCall::RenderFrame));

        // Both props and the carousel get a transform, the ground does not
        assert_eq!(
            harness.backend.count(|c| matches!(c, BackendCall::SetMeshTransform(_))),
            3
        );
    }

    #[test]
    fn test_reset_clears_hover_and_bundle() {
        let mut harness = Harness::new();
        harness.load(SourceDescriptor::new("scene.obj"));
        harness.loader.complete_latest(Ok(pickable_scene()));
        harness.resources.raycaster.on_pointer_move(Vector2::new(0.0, 0.0));
        harness.tick();
        assert!(harness.tick().hovered.is_some());

        assert!(harness
            .resources
            .reset(&mut harness.loader, &mut harness.backend));
        let report = harness.tick();
        assert!(!report.ready);
        assert_eq!(report.hovered, None);
        assert!(report.hover_changed);
        assert_eq!(harness.resources.highlight.tracked(), 0);

        harness.loader.complete_latest(Ok(village_scene()));
        let report = harness.tick();
        assert!(report.ready);
        assert_eq!(harness.resources.highlight.tracked(), 2);
    }

    #[test]
    fn test_failed_load_keeps_rendering() {
        let mut harness = Harness::new();
        harness.load(SourceDescriptor::new("missing.obj"));
        harness
            .loader
            .complete_latest(Err(crate::assets::LoadError::Cancelled));

        for _ in 0..3 {
            let report = harness.tick();
            assert!(!report.ready);
        }
        assert_eq!(harness.backend.count(|c| *c == BackendCall::RenderFrame), 3);
        assert!(harness.resources.assets.last_error().is_some());
    }

    fn moved(transform: Matrix4<f32>, point: Vector3<f32>) -> Vector3<f32> {
        let moved = transform * Vector4::new(point.x, point.y, point.z, 1.0);
        Vector3::new(moved.x, moved.y, moved.z)
    }

    #[test]
    fn test_transforms_combine_highlight_and_clip() {
        let mut harness = Harness::new();
        let descriptor = SourceDescriptor::new("scene.obj").with_clip(ClipSpec::spin(
            "carousel",
            "carousel",
            Vector3::unit_y(),
            0.1,
        ));
        harness.load(descriptor);
        harness.loader.complete_latest(Ok(pickable_scene()));
        harness.tick();

        harness.resources.raycaster.on_pointer_move(Vector2::new(0.0, 0.0));
        assert_eq!(harness.tick().hovered, Some(PropId(0)));

        let bundle = harness.resources.assets.bundle().unwrap();
        let present = bundle.prop(PropId(0)).unwrap();
        let carousel = &bundle.meshes[3];

        // One frame of easing toward 1.3 with factor 0.2
        let transform = harness.backend.transform_of(present.mesh).unwrap();
        let pivot = present.pivot;
        assert!((moved(transform, pivot) - pivot).magnitude() < 1e-5);
        let corner = moved(transform, pivot + Vector3::new(1.0, 1.0, 1.0));
        assert!((corner - (pivot + Vector3::new(1.06, 1.06, 1.06))).magnitude() < 1e-5);

        // Two frames of a 0.1 rev/s spin about the carousel center
        let transform = harness.backend.transform_of(carousel.handle).unwrap();
        let pivot = carousel.bounds.center();
        let angle = 2.0 / 60.0 * 0.1 * TAU;
        assert!((moved(transform, pivot) - pivot).magnitude() < 1e-5);
        let arm = moved(transform, pivot + Vector3::new(1.0, 0.0, 0.0)) - pivot;
        assert!((arm - Vector3::new(angle.cos(), 0.0, -angle.sin())).magnitude() < 1e-5);

        // The resting side present is left at its loaded size
        let side = bundle.prop(PropId(1)).unwrap();
        let transform = harness.backend.transform_of(side.mesh).unwrap();
        let point = side.pivot + Vector3::new(1.0, 0.0, 0.0);
        assert!((moved(transform, point) - point).magnitude() < 1e-5);
    }

    #[test]
    fn test_viewport_reaches_newly_published_snow() {
        let mut harness = Harness::new();
        let viewport = Viewport {
            width: 1600.0,
            height: 900.0,
            pixel_ratio: 3.0,
        };
        harness.resources.set_viewport(viewport);
        harness.load(SourceDescriptor::new("scene.obj"));
        harness.loader.complete_latest(Ok(village_scene()));

        harness.tick();
        let uniform = harness.backend.last_uniform.unwrap();
        assert_eq!(uniform.resolution, [1600.0, 900.0]);
        assert_eq!(uniform.pixel_ratio, 2.0);

        harness.resources.set_viewport(Viewport {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 1.0,
        });
        harness.tick();
        let uniform = harness.backend.last_uniform.unwrap();
        assert_eq!(uniform.resolution, [800.0, 600.0]);
        assert_eq!(harness.resources.viewport().map(|v| v.width), Some(800.0));
    }
}
