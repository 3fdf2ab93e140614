use std::path::PathBuf;

use cgmath::Vector3;

/// Where a scene comes from and how to animate it
#[derive(Clone, Debug, PartialEq)]
pub struct SourceDescriptor {
    pub model_path: PathBuf,
    pub baked_texture_path: Option<PathBuf>,
    pub clips: Vec<ClipSpec>,
}

impl SourceDescriptor {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            baked_texture_path: None,
            clips: Vec::new(),
        }
    }

    pub fn with_baked_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.baked_texture_path = Some(path.into());
        self
    }

    pub fn with_clip(mut self, clip: ClipSpec) -> Self {
        self.clips.push(clip);
        self
    }
}

/// A looping spin applied to every mesh whose name contains `target`
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSpec {
    pub name: String,
    /// Case-insensitive mesh name token
    pub target: String,
    pub axis: Vector3<f32>,
    pub revolutions_per_second: f32,
}

impl ClipSpec {
    pub fn spin(
        name: impl Into<String>,
        target: impl Into<String>,
        axis: Vector3<f32>,
        revolutions_per_second: f32,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            axis,
            revolutions_per_second,
        }
    }
}
