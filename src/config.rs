//! Diorama configuration
//!
//! Every tuned constant of the diorama lives in one of the settings structs
//! below. Defaults reproduce the look of the shipped scene; callers override
//! individual fields or use the fluent `with_*` helpers.

use std::path::PathBuf;

use cgmath::Vector3;

use crate::assets::descriptor::{ClipSpec, SourceDescriptor};

/// Snowfall parameters
#[derive(Clone, Debug, PartialEq)]
pub struct SnowSettings {
    pub count: usize,
    pub center_x: f32,
    pub center_z: f32,
    /// Radius of the horizontal spawn disk
    pub horizontal_spread: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Distance fallen per frame by a flake of scale zero
    pub fall_speed_base: f32,
    /// Extra fall distance per frame per unit of flake scale
    pub fall_speed_scale_factor: f32,
    pub sway_amplitude: f32,
    pub particle_size: f32,
    pub opacity: f32,
    pub color: [f32; 3],
    pub min_flake_scale: f32,
    pub max_flake_scale: f32,
}

impl Default for SnowSettings {
    fn default() -> Self {
        Self {
            count: 5000,
            center_x: 11.5,
            center_z: -6.4,
            horizontal_spread: 35.0,
            min_height: 0.0,
            max_height: 35.0,
            fall_speed_base: 0.01,
            fall_speed_scale_factor: 0.01,
            sway_amplitude: 0.01,
            particle_size: 0.5,
            opacity: 0.8,
            color: [1.0, 1.0, 1.0],
            min_flake_scale: 0.3,
            max_flake_scale: 50.0,
        }
    }
}

/// Hover highlight parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighlightSettings {
    /// Scale multiplier applied to the hovered prop
    pub hover_scale: f32,
    /// Fraction of the remaining distance covered each frame
    pub lerp_factor: f32,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            hover_scale: 1.3,
            lerp_factor: 0.2,
        }
    }
}

/// Initial camera placement and projection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            eye: Vector3::new(8.0, 10.0, 12.0),
            target: Vector3::new(0.0, 3.0, 0.0),
            fov_degrees: 35.0,
            znear: 0.1,
            zfar: 300.0,
            max_distance: 60.0,
        }
    }
}

/// Background music parameters
#[derive(Clone, Debug, PartialEq)]
pub struct MusicSettings {
    pub track: PathBuf,
    pub volume: f32,
    pub looping: bool,
    pub autoplay: bool,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            track: PathBuf::from("assets/music/bgMusic.mp3"),
            volume: 0.12,
            looping: true,
            autoplay: false,
        }
    }
}

/// Top-level configuration for the diorama application
#[derive(Clone, Debug)]
pub struct DioramaConfig {
    pub source: SourceDescriptor,
    pub snow: SnowSettings,
    pub highlight: HighlightSettings,
    pub camera: CameraSettings,
    pub music: MusicSettings,
    pub window_title: String,
    pub window_size: (u32, u32),
    pub clear_color: [f64; 3],
}

impl Default for DioramaConfig {
    fn default() -> Self {
        Self {
            source: SourceDescriptor::new("assets/baked.obj")
                .with_baked_texture("assets/baked.jpg")
                .with_clip(ClipSpec::spin("carousel", "carousel", Vector3::unit_y(), 0.1))
                .with_clip(ClipSpec::spin("ferris-wheel", "ferris", Vector3::unit_x(), 0.05)),
            snow: SnowSettings::default(),
            highlight: HighlightSettings::default(),
            camera: CameraSettings::default(),
            music: MusicSettings::default(),
            window_title: "Snowglobe".to_string(),
            window_size: (1200, 800),
            clear_color: [0.02, 0.03, 0.08],
        }
    }
}

impl DioramaConfig {
    /// Default configuration with asset paths overridden from the environment
    ///
    /// `SNOWGLOBE_MODEL` replaces the model path and `SNOWGLOBE_TEXTURE` the
    /// baked texture path.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("SNOWGLOBE_MODEL") {
            config.source.model_path = PathBuf::from(model);
        }
        if let Ok(texture) = std::env::var("SNOWGLOBE_TEXTURE") {
            config.source.baked_texture_path = Some(PathBuf::from(texture));
        }
        config
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source.model_path = path.into();
        self
    }

    pub fn with_snow(mut self, snow: SnowSettings) -> Self {
        self.snow = snow;
        self
    }

    pub fn with_highlight(mut self, highlight: HighlightSettings) -> Self {
        self.highlight = highlight;
        self
    }
}
