//! Mesh classification
//!
//! Every mesh in a loaded model is tagged exactly once by a case-insensitive
//! substring match on its name. The tag decides which material the mesh gets
//! and whether it takes part in hover picking.

use crate::gfx::resources::{SurfaceMaterial, TextureHandle};

/// Warm window-light color
pub const EMISSION_YELLOW: [f32; 3] = [0xe7 as f32 / 255.0, 0xbe as f32 / 255.0, 0x99 as f32 / 255.0];
/// Cold ice-light color
pub const EMISSION_BLUE: [f32; 3] = [0xa7 as f32 / 255.0, 0xd5 as f32 / 255.0, 0xe7 as f32 / 255.0];

/// What a mesh is, as far as the diorama is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshClass {
    EmissionYellow,
    EmissionBlue,
    Smoke,
    Interactable,
    Baked,
}

/// Name tokens checked in order; the first match wins
const TOKENS: [(&str, MeshClass); 4] = [
    ("emission-yellow", MeshClass::EmissionYellow),
    ("emission-blue", MeshClass::EmissionBlue),
    ("smoke", MeshClass::Smoke),
    ("presents", MeshClass::Interactable),
];

pub fn classify_mesh(name: &str) -> MeshClass {
    let lowered = name.to_lowercase();
    TOKENS
        .iter()
        .find(|(token, _)| lowered.contains(token))
        .map_or(MeshClass::Baked, |(_, class)| *class)
}

impl MeshClass {
    /// Material used to draw a mesh of this class
    pub fn material(self, baked_texture: Option<TextureHandle>) -> SurfaceMaterial {
        match self {
            MeshClass::EmissionYellow => SurfaceMaterial::Emission {
                color: EMISSION_YELLOW,
            },
            MeshClass::EmissionBlue => SurfaceMaterial::Emission {
                color: EMISSION_BLUE,
            },
            MeshClass::Smoke => SurfaceMaterial::Smoke,
            // Props are part of the baked render, only their transform animates
            MeshClass::Interactable | MeshClass::Baked => SurfaceMaterial::Baked {
                texture: baked_texture,
            },
        }
    }

    pub fn is_interactable(self) -> bool {
        self == MeshClass::Interactable
    }
}
