// src/simulation/mod.rs
//! Simulation system
//!
//! CPU-side procedural effects advanced once per frame. Results are streamed
//! to the GPU through the render backend.

pub mod snowfall;

pub use snowfall::{ParticleField, ParticleFieldBuilder};
