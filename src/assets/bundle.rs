//! Fully loaded scene resources
//!
//! A [`ResourceBundle`] is only ever built in one go from a finished load. It
//! never exists half constructed, so whoever holds one can use every part of
//! it.

use cgmath::{ElementWise, Vector3};

use super::classify::{classify_mesh, MeshClass};
use super::descriptor::ClipSpec;
use super::loader::LoadedScene;
use crate::animation::AnimationPlayer;
use crate::gfx::highlight::HighlightAnimator;
use crate::gfx::picking::{PickTarget, AABB};
use crate::gfx::resources::{MeshHandle, RenderBackend, TextureHandle};
use crate::simulation::snowfall::ParticleField;

/// Index of a prop within its bundle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(pub usize);

/// A mesh of the bundle as uploaded to the GPU
#[derive(Clone, Debug)]
pub struct BundleMesh {
    pub name: String,
    pub class: MeshClass,
    pub handle: MeshHandle,
    pub bounds: AABB,
}

/// A mesh the pointer can hover
#[derive(Clone, Debug, PartialEq)]
pub struct InteractableProp {
    pub id: PropId,
    pub name: String,
    /// Index into [`ResourceBundle::meshes`]
    pub mesh_index: usize,
    pub mesh: MeshHandle,
    pub bounds: AABB,
    pub pivot: Vector3<f32>,
    pub original_scale: Vector3<f32>,
    /// World-space triangles kept for hover picking
    pub triangles: Vec<[Vector3<f32>; 3]>,
}

pub struct ResourceBundle {
    pub meshes: Vec<BundleMesh>,
    pub props: Vec<InteractableProp>,
    pub textures: Vec<TextureHandle>,
    pub animation: AnimationPlayer,
    pub snow: ParticleField,
}

impl ResourceBundle {
    /// Uploads a loaded scene and assembles everything that depends on it
    pub fn build(
        scene: LoadedScene,
        clips: &[ClipSpec],
        snow: ParticleField,
        backend: &mut dyn RenderBackend,
    ) -> Self {
        let baked = scene
            .baked_texture
            .as_ref()
            .map(|texture| backend.create_texture(texture));
        let textures: Vec<TextureHandle> = baked.into_iter().collect();

        let mut meshes = Vec::with_capacity(scene.meshes.len());
        let mut props = Vec::new();
        for (index, mesh) in scene.meshes.iter().enumerate() {
            let class = classify_mesh(&mesh.name);
            let handle = backend.create_mesh(mesh, class.material(baked));

            if class.is_interactable() {
                props.push(InteractableProp {
                    id: PropId(props.len()),
                    name: mesh.name.clone(),
                    mesh_index: index,
                    mesh: handle,
                    bounds: mesh.bounds,
                    pivot: mesh.pivot(),
                    original_scale: Vector3::new(1.0, 1.0, 1.0),
                    triangles: mesh.triangles(),
                });
            }

            meshes.push(BundleMesh {
                name: mesh.name.clone(),
                class,
                handle,
                bounds: mesh.bounds,
            });
        }

        let animation = AnimationPlayer::from_specs(clips, &scene.meshes);

        let mut snow = snow;
        snow.attach(backend);

        log::debug!(
            "Built bundle: {} meshes, {} props, {} clips",
            meshes.len(),
            props.len(),
            animation.clips().len()
        );

        Self {
            meshes,
            props,
            textures,
            animation,
            snow,
        }
    }

    /// Props as currently displayed, grown by the highlight scale
    pub fn pick_targets<'a>(
        &'a self,
        highlight: &'a HighlightAnimator,
    ) -> impl Iterator<Item = PickTarget<'a>> + 'a {
        self.props.iter().map(move |prop| {
            let scale = highlight
                .current_scale(prop.id)
                .map_or(Vector3::new(1.0, 1.0, 1.0), |current| {
                    current.div_element_wise(prop.original_scale)
                });
            PickTarget {
                id: prop.id,
                bounds: prop.bounds.scaled_about(prop.pivot, scale),
                pivot: prop.pivot,
                scale,
                triangles: &prop.triangles,
            }
        })
    }

    pub fn prop(&self, id: PropId) -> Option<&InteractableProp> {
        self.props.get(id.0)
    }

    /// Releases every GPU resource of the bundle
    ///
    /// Order: snowfall, textures, animation, meshes.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.snow.dispose(backend);

        for texture in self.textures.drain(..) {
            backend.release_texture(texture);
        }

        self.animation.stop();

        for mesh in self.meshes.drain(..) {
            backend.release_mesh(mesh.handle);
        }
        self.props.clear();
    }
}
