//! # Snowfall
//!
//! A fixed-size point cloud of snowflakes falling through a cylindrical volume
//! above the diorama.
//!
//! Every flake gets a size scale in `[0.5, 1.5]` when the field is built. The
//! scale decides how fast the flake falls and how far it sways, so bigger
//! flakes drop faster. A flake that sinks below the ground plane is moved back
//! to the top of the volume instead of being recreated, which keeps the flake
//! count constant and the update allocation free.
//!
//! ```no_run
//! use snowglobe::simulation::snowfall::ParticleField;
//!
//! let mut snow = ParticleField::builder()
//!     .with_count(2000)
//!     .with_center(0.0, 0.0)
//!     .with_spread(20.0)
//!     .with_seed(7)
//!     .build();
//! snow.update(1.0);
//! ```

use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SnowSettings;
use crate::gfx::resources::{PointsHandle, RenderBackend, SnowUniform};

/// Smallest and largest per-flake size scale
const FLAKE_SCALE_RANGE: std::ops::Range<f32> = 0.5..1.5;

/// Highest device pixel ratio forwarded to the snow shader
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Procedural snowfall
pub struct ParticleField {
    settings: SnowSettings,
    /// Flake positions, 3 floats per flake
    positions: Vec<f32>,
    scales: Vec<f32>,
    fall_speeds: Vec<f32>,
    rng: StdRng,
    uniform: SnowUniform,
    points: Option<PointsHandle>,
    positions_dirty: bool,
    uniform_dirty: bool,
    disposed: bool,
}

impl ParticleField {
    /// Builds a field with the given settings and an OS-seeded generator
    pub fn new(settings: SnowSettings) -> Self {
        ParticleFieldBuilder::from_settings(settings).build()
    }

    pub fn builder() -> ParticleFieldBuilder {
        ParticleFieldBuilder::default()
    }

    /// Advances every flake by one frame
    ///
    /// `elapsed` is the total running time in seconds. It only drives the sway
    /// phase and the shader clock; the fall step is a fixed distance per call.
    pub fn update(&mut self, elapsed: f32) {
        let sway = self.settings.sway_amplitude;

        for i in 0..self.scales.len() {
            let i3 = i * 3;
            let scale = self.scales[i];

            self.positions[i3 + 1] -= self.fall_speeds[i];
            // Index as phase so neighbouring flakes don't sway in lockstep
            self.positions[i3] += (elapsed + i as f32).sin() * sway * scale;

            if self.positions[i3 + 1] < 0.0 {
                let (x, z) = disk_point(&mut self.rng, &self.settings);
                self.positions[i3] = x;
                self.positions[i3 + 1] = self.settings.max_height;
                self.positions[i3 + 2] = z;
            }
        }

        self.uniform.time = elapsed;
        self.positions_dirty = true;
        self.uniform_dirty = true;
    }

    /// Creates the GPU point buffers
    ///
    /// Does nothing if the field is already attached or was disposed.
    pub fn attach(&mut self, backend: &mut dyn RenderBackend) {
        if self.points.is_some() || self.disposed {
            return;
        }

        let handle = backend.create_points("Snowfall", &self.positions, &self.scales, &self.uniform);
        log::debug!("Attached snowfall with {} flakes", self.len());
        self.points = Some(handle);
        self.positions_dirty = false;
        self.uniform_dirty = false;
    }

    /// Pushes positions and uniforms changed since the last upload
    pub fn upload(&mut self, backend: &mut dyn RenderBackend) {
        let Some(handle) = self.points else {
            return;
        };

        if self.positions_dirty {
            backend.write_point_positions(handle, &self.positions);
            self.positions_dirty = false;
        }
        if self.uniform_dirty {
            backend.write_point_uniform(handle, &self.uniform);
            self.uniform_dirty = false;
        }
    }

    /// Forwards a viewport resize to the snow shader
    pub fn set_resolution(&mut self, width: f32, height: f32, pixel_ratio: f32) {
        self.uniform.resolution = [width, height];
        self.uniform.pixel_ratio = pixel_ratio.min(MAX_PIXEL_RATIO);
        self.uniform_dirty = true;
    }

    /// Releases the GPU buffers
    ///
    /// Safe to call any number of times, attached or not.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.points.take() {
            backend.release_points(handle);
            log::debug!("Released snowfall buffers");
        }
        self.disposed = true;
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn is_attached(&self) -> bool {
        self.points.is_some()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn uniform(&self) -> &SnowUniform {
        &self.uniform
    }

    pub fn settings(&self) -> &SnowSettings {
        &self.settings
    }
}

/// Uniform random point in the horizontal spawn disk
fn disk_point(rng: &mut StdRng, settings: &SnowSettings) -> (f32, f32) {
    let radius = settings.horizontal_spread * rng.random::<f32>().sqrt();
    let angle = rng.random::<f32>() * TAU;
    (
        settings.center_x + radius * angle.cos(),
        settings.center_z + radius * angle.sin(),
    )
}

/// Builder for [`ParticleField`]
#[derive(Default)]
pub struct ParticleFieldBuilder {
    settings: SnowSettings,
    seed: Option<u64>,
}

impl ParticleFieldBuilder {
    pub fn from_settings(settings: SnowSettings) -> Self {
        Self {
            settings,
            seed: None,
        }
    }

    /// Sets the number of flakes
    pub fn with_count(mut self, count: usize) -> Self {
        self.settings.count = count;
        self
    }

    /// Sets the center of the spawn disk on the ground plane
    pub fn with_center(mut self, center_x: f32, center_z: f32) -> Self {
        self.settings.center_x = center_x;
        self.settings.center_z = center_z;
        self
    }

    /// Sets the radius of the spawn disk
    pub fn with_spread(mut self, horizontal_spread: f32) -> Self {
        self.settings.horizontal_spread = horizontal_spread;
        self
    }

    pub fn with_heights(mut self, min_height: f32, max_height: f32) -> Self {
        self.settings.min_height = min_height;
        self.settings.max_height = max_height;
        self
    }

    pub fn with_fall_speed(mut self, base: f32, scale_factor: f32) -> Self {
        self.settings.fall_speed_base = base;
        self.settings.fall_speed_scale_factor = scale_factor;
        self
    }

    pub fn with_sway(mut self, amplitude: f32) -> Self {
        self.settings.sway_amplitude = amplitude;
        self
    }

    /// Makes spawning reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> ParticleField {
        let settings = self.settings;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let count = settings.count;
        let mut positions = Vec::with_capacity(count * 3);
        let mut scales = Vec::with_capacity(count);
        let mut fall_speeds = Vec::with_capacity(count);

        let band = (settings.max_height - settings.min_height).max(0.0);
        for _ in 0..count {
            let (x, z) = disk_point(&mut rng, &settings);
            let y = settings.min_height + rng.random::<f32>() * band;
            positions.extend_from_slice(&[x, y, z]);

            let scale = rng.random_range(FLAKE_SCALE_RANGE);
            scales.push(scale);
            fall_speeds.push(settings.fall_speed_base + scale * settings.fall_speed_scale_factor);
        }

        let [r, g, b] = settings.color;
        let uniform = SnowUniform {
            color: [r, g, b, settings.opacity],
            size: settings.particle_size,
            min_scale: settings.min_flake_scale,
            max_scale: settings.max_flake_scale,
            ..Default::default()
        };

        ParticleField {
            settings,
            positions,
            scales,
            fall_speeds,
            rng,
            uniform,
            points: None,
            positions_dirty: true,
            uniform_dirty: true,
            disposed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::testing::{BackendCall, RecordingBackend};

    fn diorama_field(seed: u64) -> ParticleField {
        ParticleField::builder()
            .with_count(5000)
            .with_center(11.5, -6.4)
            .with_spread(35.0)
            .with_heights(0.0, 35.0)
            .with_seed(seed)
            .build()
    }

    fn heights(field: &ParticleField) -> impl Iterator<Item = f32> + '_ {
        field.positions().chunks_exact(3).map(|p| p[1])
    }

    #[test]
    fn test_spawn_inside_volume() {
        let field = diorama_field(1);
        assert_eq!(field.len(), 5000);
        assert_eq!(field.positions().len(), 15000);

        for p in field.positions().chunks_exact(3) {
            let dx = p[0] - 11.5;
            let dz = p[2] + 6.4;
            assert!((dx * dx + dz * dz).sqrt() <= 35.0 + 1e-3);
            assert!((0.0..=35.0).contains(&p[1]));
        }
        for scale in field.scales() {
            assert!((0.5..1.5).contains(scale));
        }
    }

    #[test]
    fn test_large_elapsed_keeps_heights_in_band() {
        let mut field = diorama_field(2);
        field.update(1000.0);

        for h in heights(&field) {
            assert!((0.0..=35.0).contains(&h), "height {} out of band", h);
        }
        assert!(field.positions().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_heights_never_negative_and_count_fixed() {
        let mut field = ParticleField::builder()
            .with_count(200)
            .with_heights(0.0, 1.0)
            .with_fall_speed(0.05, 0.05)
            .with_seed(3)
            .build();

        for frame in 0..500 {
            field.update(frame as f32 / 60.0);
            assert!(heights(&field).all(|h| h >= 0.0));
            assert_eq!(field.len(), 200);
            assert_eq!(field.positions().len(), 600);
        }
    }

    #[test]
    fn test_flakes_below_ground_respawn_at_top() {
        let mut field = ParticleField::builder()
            .with_count(50)
            .with_heights(0.0, 0.001)
            .with_fall_speed(1.0, 0.0)
            .with_seed(4)
            .build();

        field.update(0.0);
        assert!(heights(&field).all(|h| h == 0.001));
    }

    #[test]
    fn test_bigger_flakes_fall_faster() {
        let mut field = ParticleField::builder()
            .with_count(100)
            .with_heights(30.0, 30.0)
            .with_sway(0.0)
            .with_seed(5)
            .build();
        let before: Vec<f32> = heights(&field).collect();
        field.update(0.0);

        for (i, h) in heights(&field).enumerate() {
            let expected = 0.01 + field.scales()[i] * 0.01;
            assert!((before[i] - h - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_seeded_fields_match() {
        let mut a = diorama_field(9);
        let mut b = diorama_field(9);
        for frame in 0..10 {
            a.update(frame as f32);
            b.update(frame as f32);
        }
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn test_upload_writes_only_when_dirty() {
        let mut backend = RecordingBackend::new();
        let mut field = diorama_field(6);
        field.attach(&mut backend);
        field.attach(&mut backend);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::CreatePoints(_, 15000))), 1);

        field.upload(&mut backend);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::WritePointPositions(..))), 0);

        field.update(1.0);
        field.upload(&mut backend);
        field.upload(&mut backend);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::WritePointPositions(_, 15000))), 1);
        assert_eq!(backend.last_uniform.unwrap().time, 1.0);
    }

    #[test]
    fn test_resolution_clamps_pixel_ratio() {
        let mut field = diorama_field(7);
        field.set_resolution(1200.0, 800.0, 3.0);
        assert_eq!(field.uniform().resolution, [1200.0, 800.0]);
        assert_eq!(field.uniform().pixel_ratio, 2.0);

        field.set_resolution(1200.0, 800.0, 1.25);
        assert_eq!(field.uniform().pixel_ratio, 1.25);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let mut field = diorama_field(8);
        field.attach(&mut backend);

        field.dispose(&mut backend);
        field.dispose(&mut backend);
        assert_eq!(backend.count(|c| matches!(c, BackendCall::ReleasePoints(_))), 1);
        assert!(!field.is_attached());

        // No re-attach after dispose
        field.attach(&mut backend);
        assert!(!field.is_attached());
    }

    #[test]
    fn test_dispose_never_attached_is_noop() {
        let mut backend = RecordingBackend::new();
        let mut field = diorama_field(10);
        field.dispose(&mut backend);
        field.dispose(&mut backend);
        assert!(backend.calls.is_empty());
    }
}
