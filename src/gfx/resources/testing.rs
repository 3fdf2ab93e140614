//! Recording render backend used by unit tests

use cgmath::Matrix4;

use super::{
    MeshHandle, PointsHandle, RenderBackend, SnowUniform, SurfaceMaterial, TextureData,
    TextureHandle,
};
use crate::gfx::camera::camera_utils::CameraUniform;
use crate::gfx::scene::mesh::SceneMesh;

/// One call made against the backend
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    CreateTexture(TextureHandle),
    ReleaseTexture(TextureHandle),
    CreateMesh(MeshHandle, String, SurfaceMaterial),
    SetMeshTransform(MeshHandle),
    ReleaseMesh(MeshHandle),
    CreatePoints(PointsHandle, usize),
    WritePointPositions(PointsHandle, usize),
    WritePointUniform(PointsHandle),
    ReleasePoints(PointsHandle),
    SetEffectTime(f32),
    RenderFrame,
}

#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub last_uniform: Option<SnowUniform>,
    pub last_transforms: Vec<(MeshHandle, Matrix4<f32>)>,
    next_id: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Calls that released something, in order
    pub fn releases(&self) -> Vec<BackendCall> {
        self.calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    BackendCall::ReleaseTexture(_)
                        | BackendCall::ReleaseMesh(_)
                        | BackendCall::ReleasePoints(_)
                )
            })
            .cloned()
            .collect()
    }

    pub fn transform_of(&self, handle: MeshHandle) -> Option<Matrix4<f32>> {
        self.last_transforms
            .iter()
            .rev()
            .find(|(h, _)| *h == handle)
            .map(|(_, t)| *t)
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(&mut self, _texture: &TextureData) -> TextureHandle {
        let handle = TextureHandle(self.next());
        self.calls.push(BackendCall::CreateTexture(handle));
        handle
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.calls.push(BackendCall::ReleaseTexture(handle));
    }

    fn create_mesh(&mut self, mesh: &SceneMesh, material: SurfaceMaterial) -> MeshHandle {
        let handle = MeshHandle(self.next());
        self.calls
            .push(BackendCall::CreateMesh(handle, mesh.name.clone(), material));
        handle
    }

    fn set_mesh_transform(&mut self, handle: MeshHandle, transform: Matrix4<f32>) {
        self.calls.push(BackendCall::SetMeshTransform(handle));
        self.last_transforms.push((handle, transform));
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.calls.push(BackendCall::ReleaseMesh(handle));
    }

    fn create_points(
        &mut self,
        _label: &str,
        positions: &[f32],
        _scales: &[f32],
        uniform: &SnowUniform,
    ) -> PointsHandle {
        let handle = PointsHandle(self.next());
        self.calls
            .push(BackendCall::CreatePoints(handle, positions.len()));
        self.last_uniform = Some(*uniform);
        handle
    }

    fn write_point_positions(&mut self, handle: PointsHandle, positions: &[f32]) {
        self.calls
            .push(BackendCall::WritePointPositions(handle, positions.len()));
    }

    fn write_point_uniform(&mut self, handle: PointsHandle, uniform: &SnowUniform) {
        self.calls.push(BackendCall::WritePointUniform(handle));
        self.last_uniform = Some(*uniform);
    }

    fn release_points(&mut self, handle: PointsHandle) {
        self.calls.push(BackendCall::ReleasePoints(handle));
    }

    fn set_effect_time(&mut self, elapsed: f32) {
        self.calls.push(BackendCall::SetEffectTime(elapsed));
    }

    fn render_frame(&mut self, _camera: &CameraUniform) {
        self.calls.push(BackendCall::RenderFrame);
    }
}
