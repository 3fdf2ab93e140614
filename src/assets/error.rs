use std::path::PathBuf;

/// Why a scene failed to load
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("failed to decode texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("model {0} contains no meshes")]
    EmptyScene(PathBuf),
    #[error("loader stopped before delivering a result")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, LoadError>;
