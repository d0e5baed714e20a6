use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::{PI, TAU};

/// Uniform sample in `[-half, half)`
#[inline]
pub fn symmetric<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * 2.0 * half
}

/// Vector with each component uniform in `[-half, half)`
pub fn symmetric_vec3<R: Rng + ?Sized>(rng: &mut R, half: f32) -> Vec3 {
    Vec3::new(symmetric(rng, half), symmetric(rng, half), symmetric(rng, half))
}

/// Random Euler angles, each in `[0, 2π)`
pub fn random_euler<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    Vec3::new(rng.gen::<f32>() * TAU, rng.gen::<f32>() * TAU, rng.gen::<f32>() * TAU)
}

/// Direction from spherical angles θ ∈ [0, 2π), φ ∈ [0, π)
pub fn random_spherical_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let phi = rng.gen::<f32>() * PI;
    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}

/// Rotation that turns a flat element's +Z normal toward `target`.
/// Falls back to identity when the element sits on the target.
pub fn facing_rotation(from: Vec3, target: Vec3) -> Quat {
    match (target - from).try_normalize() {
        Some(dir) => Quat::from_rotation_arc(Vec3::Z, dir),
        None => Quat::IDENTITY,
    }
}

/// Pick an index with probability proportional to `weights`
pub fn weighted_index<R: Rng + ?Sized>(rng: &mut R, weights: &[f32]) -> usize {
    let total: f32 = weights.iter().sum();
    let mut roll = rng.gen::<f32>() * total;
    for (i, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return i;
        }
        roll -= weight;
    }
    weights.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn symmetric_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1000 {
            let v = symmetric(&mut rng, 0.15);
            assert!((-0.15..0.15).contains(&v));
        }
    }

    #[test]
    fn spherical_directions_are_unit_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let dir = random_spherical_direction(&mut rng);
            assert!((dir.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn facing_rotation_points_normal_at_target() {
        let rotation = facing_rotation(Vec3::new(1.0, 2.0, 0.0), Vec3::new(0.0, 0.0, 5.0));
        let normal = rotation * Vec3::Z;
        let expected = (Vec3::new(0.0, 0.0, 5.0) - Vec3::new(1.0, 2.0, 0.0)).normalize();
        assert!(normal.abs_diff_eq(expected, 1e-5));
        assert_eq!(facing_rotation(Vec3::ONE, Vec3::ONE), Quat::IDENTITY);
    }

    #[test]
    fn weighted_index_follows_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut counts = [0usize; 4];
        for _ in 0..10_000 {
            counts[weighted_index(&mut rng, &[0.3, 0.3, 0.25, 0.15])] += 1;
        }
        assert!(counts[0] > 2500 && counts[0] < 3500);
        assert!(counts[3] > 1000 && counts[3] < 2000);
    }
}
