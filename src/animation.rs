//! Ride mechanism animation
//!
//! Clips are looping spins: every mesh a clip targets turns about the clip's
//! axis around the shared center of all its targets, so a multi-part ride
//! (cars plus frame) rotates as one piece.

use std::f32::consts::TAU;

use cgmath::{InnerSpace, Matrix4, Rad, Vector3};

use crate::assets::descriptor::ClipSpec;
use crate::gfx::scene::SceneMesh;

/// A clip bound to concrete meshes of one bundle
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Indices into the bundle's mesh list
    pub meshes: Vec<usize>,
    pub axis: Vector3<f32>,
    pub pivot: Vector3<f32>,
    /// Radians per second
    pub angular_speed: f32,
}

impl AnimationClip {
    /// Binds `spec` to every mesh whose name contains its target token
    ///
    /// Returns `None` when no mesh matches or the axis is degenerate.
    pub fn resolve(spec: &ClipSpec, meshes: &[SceneMesh]) -> Option<Self> {
        let token = spec.target.to_lowercase();
        let targets: Vec<usize> = meshes
            .iter()
            .enumerate()
            .filter(|(_, mesh)| mesh.name.to_lowercase().contains(&token))
            .map(|(index, _)| index)
            .collect();

        if targets.is_empty() || spec.axis.magnitude2() == 0.0 {
            return None;
        }

        let bounds = targets
            .iter()
            .map(|&index| meshes[index].bounds)
            .reduce(|a, b| a.union(&b))?;

        Some(Self {
            name: spec.name.clone(),
            meshes: targets,
            axis: spec.axis.normalize(),
            pivot: bounds.center(),
            angular_speed: spec.revolutions_per_second * TAU,
        })
    }

    /// Rotation angle at `time`, wrapped into one revolution
    pub fn angle_at(&self, time: f32) -> Rad<f32> {
        Rad((time * self.angular_speed).rem_euclid(TAU))
    }

    fn transform_at(&self, time: f32) -> Matrix4<f32> {
        Matrix4::from_translation(self.pivot)
            * Matrix4::from_axis_angle(self.axis, self.angle_at(time))
            * Matrix4::from_translation(-self.pivot)
    }
}

/// Plays every clip of a bundle, looping forever
#[derive(Clone, Debug, Default)]
pub struct AnimationPlayer {
    clips: Vec<AnimationClip>,
    time: f32,
    stopped: bool,
}

impl AnimationPlayer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            time: 0.0,
            stopped: false,
        }
    }

    /// Resolves clip specs against a freshly loaded mesh list
    pub fn from_specs(specs: &[ClipSpec], meshes: &[SceneMesh]) -> Self {
        let clips = specs
            .iter()
            .filter_map(|spec| {
                let clip = AnimationClip::resolve(spec, meshes);
                if clip.is_none() {
                    log::warn!("Clip '{}' matched no mesh named '{}'", spec.name, spec.target);
                }
                clip
            })
            .collect();
        Self::new(clips)
    }

    pub fn advance(&mut self, delta: f32) {
        if !self.stopped {
            self.time += delta;
        }
    }

    /// Clip transform for a mesh, if any clip drives it
    pub fn transform_for(&self, mesh_index: usize) -> Option<Matrix4<f32>> {
        self.clips
            .iter()
            .find(|clip| clip.meshes.contains(&mesh_index))
            .map(|clip| clip.transform_at(self.time))
    }

    /// Whether any clip drives the mesh
    pub fn drives(&self, mesh_index: usize) -> bool {
        self.clips.iter().any(|clip| clip.meshes.contains(&mesh_index))
    }

    /// Halts playback and forgets all clips
    pub fn stop(&mut self) {
        self.stopped = true;
        self.clips.clear();
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}
