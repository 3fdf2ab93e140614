// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! The diorama core never talks to wgpu directly. Everything it creates on the
//! GPU (textures, mesh buffers, the snow point buffers) goes through the
//! [`RenderBackend`] trait and is referred to afterwards by a small copyable
//! handle. The wgpu implementation lives in
//! [`RenderEngine`](crate::gfx::rendering::RenderEngine).

pub mod texture_resource;

#[cfg(test)]
pub mod testing;

use cgmath::Matrix4;

use crate::gfx::camera::camera_utils::CameraUniform;
use crate::gfx::scene::mesh::SceneMesh;

pub use texture_resource::{TextureData, TextureResource};

/// Handle to a texture owned by the render backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to an uploaded mesh (vertex/index buffers plus its material)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a point-cloud buffer set (positions, scales and shader uniforms)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointsHandle(pub u64);

/// Surface material assigned to a mesh after classification
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceMaterial {
    /// Unlit, sampled from the baked lighting texture (white if none loaded)
    Baked { texture: Option<TextureHandle> },
    /// Unlit flat emissive color
    Emission { color: [f32; 3] },
    /// Time-animated translucent smoke
    Smoke,
}

/// Shader parameters for the snow point cloud
///
/// MUST match the `SnowUniform` struct in the WGSL shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SnowUniform {
    /// RGB color with opacity in the alpha channel
    pub color: [f32; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub size: f32,
    pub pixel_ratio: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub _padding: f32,
}

impl Default for SnowUniform {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            resolution: [1.0, 1.0],
            time: 0.0,
            size: 1.0,
            pixel_ratio: 1.0,
            min_scale: 0.0,
            max_scale: 1.0,
            _padding: 0.0,
        }
    }
}

/// Rendering collaborator used by the diorama core
///
/// Release methods must tolerate handles that were already released.
pub trait RenderBackend {
    fn create_texture(&mut self, texture: &TextureData) -> TextureHandle;
    fn release_texture(&mut self, handle: TextureHandle);

    fn create_mesh(&mut self, mesh: &SceneMesh, material: SurfaceMaterial) -> MeshHandle;
    fn set_mesh_transform(&mut self, handle: MeshHandle, transform: Matrix4<f32>);
    fn release_mesh(&mut self, handle: MeshHandle);

    /// Creates the point buffers. `positions` holds 3 floats per point.
    fn create_points(
        &mut self,
        label: &str,
        positions: &[f32],
        scales: &[f32],
        uniform: &SnowUniform,
    ) -> PointsHandle;
    fn write_point_positions(&mut self, handle: PointsHandle, positions: &[f32]);
    fn write_point_uniform(&mut self, handle: PointsHandle, uniform: &SnowUniform);
    fn release_points(&mut self, handle: PointsHandle);

    /// Elapsed time fed to time-animated materials (smoke)
    fn set_effect_time(&mut self, elapsed: f32);

    /// Draws every live mesh and point cloud
    fn render_frame(&mut self, camera: &CameraUniform);
}
