//! # Scene Data Module
//!
//! CPU-side scene graph data handed over by the asset loader: named meshes and
//! the vertex format they are uploaded with.
//!
//! - [`SceneMesh`] - A named mesh with world-space vertices and bounds
//! - [`Vertex3D`] - Vertex with position, normal and texture coordinates

pub mod mesh;
pub mod vertex;

pub use mesh::SceneMesh;
pub use vertex::Vertex3D;
