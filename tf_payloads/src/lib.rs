//! Spatial payload types shared by the transform tree and its consumers.

mod transform;

pub use transform::Transform;

pub use glam::{DAffine3, DQuat, DVec3};
