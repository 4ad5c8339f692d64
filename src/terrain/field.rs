//! Pure terrain height and surface classification
//!
//! The field is stateless with respect to the world: every query is a
//! function of (x, z) and the seed alone, so moving entities can clamp
//! to the ground at arbitrary coordinates and a regenerated chunk is
//! bit-identical to the one that was evicted.

use glam::Vec2;
use noise::{NoiseFn, Simplex};

use crate::constants::terrain::*;

/// Surface classification at a sampled point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Flat paved ground inside the central plaza
    Plaza,
    /// Worn dirt trail winding through the grass
    Path,
    Grass,
}

impl Surface {
    /// Mesh vertex tint for this surface
    pub fn color(&self) -> [f32; 3] {
        match self {
            Surface::Plaza => [0.5, 0.5, 0.5],
            Surface::Path => [0.6, 0.5, 0.3],
            Surface::Grass => [0.2, 0.5, 0.2],
        }
    }
}

/// One resolved terrain query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    pub height: f32,
    pub surface: Surface,
}

/// Field shape parameters
#[derive(Debug, Clone)]
pub struct TerrainParams {
    pub seed: u32,
    /// Low-frequency octave: (frequency, amplitude)
    pub coarse: (f64, f32),
    /// High-frequency octave: (frequency, amplitude)
    pub fine: (f64, f32),
    /// Trail field frequency
    pub trail_frequency: f64,
    /// |trail| below this reads as a path
    pub trail_threshold: f64,
    /// Trails keep out of the square |x|,|z| < this
    pub trail_exclusion: f32,
    /// Height trails are worn down by
    pub trail_rut_depth: f32,
    /// Ground is flat inside this radius
    pub plaza_radius: f32,
    /// Full noise amplitude beyond this radius
    pub blend_radius: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 0,
            coarse: (0.01, 4.0),
            fine: (0.05, 1.0),
            trail_frequency: 0.008,
            trail_threshold: TRAIL_THRESHOLD,
            trail_exclusion: TRAIL_EXCLUSION,
            trail_rut_depth: TRAIL_RUT_DEPTH,
            plaza_radius: PLAZA_RADIUS,
            blend_radius: PLAZA_BLEND_RADIUS,
        }
    }
}

/// Deterministic height/classification over unbounded (x, z)
pub struct TerrainField {
    params: TerrainParams,
    coarse: Simplex,
    fine: Simplex,
    trail: Simplex,
}

impl TerrainField {
    pub fn new(params: TerrainParams) -> Self {
        let seed = params.seed;
        Self {
            params,
            coarse: Simplex::new(seed),
            fine: Simplex::new(seed.wrapping_add(1)),
            trail: Simplex::new(seed.wrapping_add(2)),
        }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Ground height at (x, z), plaza blend applied
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let p = &self.params;
        let (xd, zd) = (f64::from(x), f64::from(z));

        let mut h = self.coarse.get([xd * p.coarse.0, zd * p.coarse.0]) as f32 * p.coarse.1
            + self.fine.get([xd * p.fine.0, zd * p.fine.0]) as f32 * p.fine.1;

        if self.is_trail(x, z) {
            h -= p.trail_rut_depth;
        }

        let dist = Vec2::new(x, z).length();
        if dist < p.plaza_radius {
            0.0
        } else if dist < p.blend_radius {
            h * (dist - p.plaza_radius) / (p.blend_radius - p.plaza_radius)
        } else {
            h
        }
    }

    /// Surface class at (x, z); independent of height
    pub fn classify(&self, x: f32, z: f32) -> Surface {
        if Vec2::new(x, z).length() < self.params.plaza_radius {
            Surface::Plaza
        } else if self.is_trail(x, z) {
            Surface::Path
        } else {
            Surface::Grass
        }
    }

    /// Height and class in one query (trail field sampled once)
    pub fn sample(&self, x: f32, z: f32) -> TerrainSample {
        let p = &self.params;
        let dist = Vec2::new(x, z).length();

        if dist < p.plaza_radius {
            return TerrainSample {
                height: 0.0,
                surface: Surface::Plaza,
            };
        }

        let on_trail = self.is_trail(x, z);
        let (xd, zd) = (f64::from(x), f64::from(z));
        let mut h = self.coarse.get([xd * p.coarse.0, zd * p.coarse.0]) as f32 * p.coarse.1
            + self.fine.get([xd * p.fine.0, zd * p.fine.0]) as f32 * p.fine.1;
        if on_trail {
            h -= p.trail_rut_depth;
        }
        if dist < p.blend_radius {
            h = h * (dist - p.plaza_radius) / (p.blend_radius - p.plaza_radius);
        }

        TerrainSample {
            height: h,
            surface: if on_trail { Surface::Path } else { Surface::Grass },
        }
    }

    fn is_trail(&self, x: f32, z: f32) -> bool {
        let p = &self.params;
        if x.abs() < p.trail_exclusion && z.abs() < p.trail_exclusion {
            return false;
        }
        let v = self
            .trail
            .get([f64::from(x) * p.trail_frequency, f64::from(z) * p.trail_frequency]);
        v.abs() < p.trail_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaza_is_flat_and_classified() {
        let field = TerrainField::new(TerrainParams::default());
        for i in 0..200 {
            let angle = i as f32 * 0.17;
            let radius = (i as f32 * 0.199) % 40.0;
            let (x, z) = (angle.cos() * radius, angle.sin() * radius);
            assert_eq!(field.height(x, z), 0.0, "height at ({x}, {z})");
            assert_eq!(field.classify(x, z), Surface::Plaza);
        }
    }

    #[test]
    fn test_field_is_deterministic() {
        let a = TerrainField::new(TerrainParams::default());
        let b = TerrainField::new(TerrainParams::default());
        for i in 0..100 {
            let x = (i as f32 * 37.3) - 1800.0;
            let z = (i as f32 * 91.7) - 4500.0;
            assert_eq!(a.height(x, z).to_bits(), b.height(x, z).to_bits());
            assert_eq!(a.classify(x, z), b.classify(x, z));
            assert_eq!(a.height(x, z).to_bits(), a.height(x, z).to_bits());
        }
    }

    #[test]
    fn test_seed_changes_terrain() {
        let a = TerrainField::new(TerrainParams::default());
        let b = TerrainField::new(TerrainParams {
            seed: 7,
            ..TerrainParams::default()
        });
        let differs = (0..50).any(|i| {
            let (x, z) = (100.0 + i as f32 * 13.0, 200.0 + i as f32 * 29.0);
            a.height(x, z) != b.height(x, z)
        });
        assert!(differs);
    }

    #[test]
    fn test_no_trails_in_exclusion_square() {
        let field = TerrainField::new(TerrainParams::default());
        for i in 0..100 {
            let x = (i as f32 * 1.09) % 54.9;
            let z = (i as f32 * 0.83) % 54.9;
            assert_ne!(field.classify(x, z), Surface::Path);
        }
    }

    #[test]
    fn test_sample_matches_split_queries() {
        let field = TerrainField::new(TerrainParams::default());
        for i in 0..100 {
            let x = i as f32 * 11.3 - 500.0;
            let z = i as f32 * 7.9 - 300.0;
            let s = field.sample(x, z);
            assert_eq!(s.height.to_bits(), field.height(x, z).to_bits());
            assert_eq!(s.surface, field.classify(x, z));
        }
    }

    #[test]
    fn test_blend_annulus_scales_toward_zero() {
        let field = TerrainField::new(TerrainParams::default());
        // Just outside the plaza the blend factor is tiny, so the
        // carved trail depth cannot produce a large cliff.
        let h = field.height(40.5, 0.0);
        assert!(h.abs() < 0.2, "blend too steep at plaza edge: {h}");
    }
}
