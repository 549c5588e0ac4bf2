//! Shared constructors for tests.

use tf_payloads::{DQuat, DVec3, Transform};

/// Pure-translation transform.
pub fn translation(x: f64, y: f64, z: f64) -> Transform {
    Transform::from_translation(DVec3::new(x, y, z))
}

/// Pure rotation about +Z by `angle` radians.
pub fn rotation_z(angle: f64) -> Transform {
    Transform::from_rotation(DQuat::from_rotation_z(angle))
}
