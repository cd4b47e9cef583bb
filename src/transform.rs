//! Per-instance model matrices.
//!
//! Each instance spins about Z, is pushed out along the spun X axis, scaled
//! up, and finally turned 90° about its own Y axis so it faces the camera.
//! The steps post-multiply in that order; any other order draws something
//! else entirely.

use std::f32::consts::TAU;

use cgmath::*;

pub const INSTANCE_COUNT: usize = 3;

/// Angle between neighbouring instances on the orbit.
pub const PHASE_OFFSET: f32 = TAU / INSTANCE_COUNT as f32;

pub const ORBIT_RADIUS: f32 = 25.0;
pub const MODEL_SCALE: f32 = 90.0;
pub const FACING_ANGLE: Deg<f32> = Deg(90.0);

pub fn instance_phase(instance: usize, time: f32) -> f32 {
    time + instance as f32 * PHASE_OFFSET
}

pub fn model_matrix(phase: f32) -> Matrix4<f32> {
    Matrix4::from_angle_z(Rad(phase))
        * Matrix4::from_translation(Vector3::new(ORBIT_RADIUS, 0.0, 0.0))
        * Matrix4::from_scale(MODEL_SCALE)
        * Matrix4::from_angle_y(FACING_ANGLE)
}

/// Model matrices of all instances at `time` seconds, in draw order.
pub fn instance_models(time: f32) -> [Matrix4<f32>; INSTANCE_COUNT] {
    std::array::from_fn(|instance| model_matrix(instance_phase(instance, time)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_difference(a: Matrix4<f32>, b: Matrix4<f32>) -> f32 {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f32::max)
    }

    fn rotate_z(phase: f32) -> Matrix4<f32> {
        Matrix4::from_angle_z(Rad(phase))
    }
    fn translate() -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(ORBIT_RADIUS, 0.0, 0.0))
    }
    fn scale() -> Matrix4<f32> {
        Matrix4::from_scale(MODEL_SCALE)
    }
    fn face() -> Matrix4<f32> {
        Matrix4::from_angle_y(FACING_ANGLE)
    }

    #[test]
    fn phases_at_time_zero_are_thirds_of_a_turn() {
        assert_eq!(instance_phase(0, 0.0), 0.0);
        assert!((instance_phase(1, 0.0) - TAU / 3.0).abs() < 1e-6);
        assert!((instance_phase(2, 0.0) - 2.0 * TAU / 3.0).abs() < 1e-6);
    }

    #[test]
    fn phase_follows_time() {
        assert_eq!(instance_phase(0, 1.5), 1.5);
        assert!((instance_phase(2, 1.5) - (1.5 + 2.0 * PHASE_OFFSET)).abs() < 1e-6);
    }

    #[test]
    fn reordering_the_steps_changes_the_matrix() {
        let expected = model_matrix(0.0);
        let reordered = [
            rotate_z(0.0) * face() * scale() * translate(),
            rotate_z(0.0) * scale() * translate() * face(),
            face() * rotate_z(0.0) * translate() * scale(),
        ];

        for variant in reordered {
            assert!(max_difference(expected, variant) > 1.0);
        }
    }

    #[test]
    fn spin_and_translation_do_not_commute_once_spinning() {
        let phase = 1.0;
        let swapped = translate() * rotate_z(phase) * scale() * face();
        assert!(max_difference(model_matrix(phase), swapped) > 1.0);
    }

    #[test]
    fn instances_differ_by_a_third_turn_about_z() {
        let models = instance_models(0.0);

        for i in 0..INSTANCE_COUNT {
            for j in (i + 1)..INSTANCE_COUNT {
                assert!(max_difference(models[i], models[j]) > 1.0);
            }
        }

        for (i, model) in models.iter().enumerate() {
            let expected = Matrix4::from_angle_z(Deg(120.0 * i as f32)) * models[0];
            assert!(max_difference(*model, expected) < 1e-3);
        }
    }

    #[test]
    fn instance_orbits_at_radius_25() {
        for model in instance_models(0.7) {
            let centre = model * Vector4::new(0.0, 0.0, 0.0, 1.0);
            let radius = (centre.x * centre.x + centre.y * centre.y).sqrt();
            assert!((radius - ORBIT_RADIUS).abs() < 1e-3);
            assert!(centre.z.abs() < 1e-4);
        }
    }
}
