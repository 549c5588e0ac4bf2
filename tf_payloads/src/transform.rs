use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
use glam::{DAffine3, DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// A rotation this close to zero length cannot be normalized into a unit
/// quaternion and is treated as degenerate.
const MIN_ROTATION_LENGTH_SQUARED: f64 = 1e-12;

/// A rigid-body transform mapping coordinates from a child frame into its
/// parent frame: rotate, then translate.
///
/// Value type: every operation returns a new `Transform`. The rotation is
/// expected to be a unit quaternion; use [`Transform::try_normalized`] at
/// ingestion boundaries where that is not yet guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation,
        }
    }

    /// Both components contain only finite values.
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }

    /// Returns the transform with a unit-length rotation, or `None` when the
    /// rotation is non-finite or too close to zero to normalize.
    pub fn try_normalized(&self) -> Option<Self> {
        if !self.is_finite() {
            return None;
        }
        let len_sq = self.rotation.length_squared();
        if len_sq < MIN_ROTATION_LENGTH_SQUARED {
            return None;
        }
        Some(Self {
            translation: self.translation,
            rotation: self.rotation / len_sq.sqrt(),
        })
    }

    /// The inverse transform: `a * a.inverse()` is the identity within
    /// floating-point tolerance.
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate();
        Self {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    /// Blends between `a` (at `t = 0`) and `b` (at `t = 1`): linear on the
    /// translation, spherical-linear on the rotation, renormalized.
    /// `t` outside `[0, 1]` is clamped.
    pub fn interpolate(a: &Self, b: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            translation: a.translation.lerp(b.translation, t),
            rotation: a.rotation.slerp(b.rotation, t).normalize(),
        }
    }

    /// Maps a point from the child frame into the parent frame.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    pub fn to_affine(&self) -> DAffine3 {
        DAffine3::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn from_affine(affine: &DAffine3) -> Self {
        Self {
            translation: affine.translation,
            rotation: DQuat::from_mat3(&affine.matrix3),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Composition: `a * b` applies `b` first, then `a`.
impl Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            translation: self.translation + self.rotation * rhs.translation,
            rotation: self.rotation * rhs.rotation,
        }
    }
}

impl Encode for Transform {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        self.translation.to_array().encode(encoder)?;
        self.rotation.to_array().encode(encoder)
    }
}

impl<Context> Decode<Context> for Transform {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let translation: [f64; 3] = Decode::decode(decoder)?;
        let rotation: [f64; 4] = Decode::decode(decoder)?;
        Ok(Self {
            translation: DVec3::from_array(translation),
            rotation: DQuat::from_array(rotation),
        })
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for Transform {
    fn borrow_decode<D: BorrowDecoder<'de>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let translation: [f64; 3] = Decode::decode(decoder)?;
        let rotation: [f64; 4] = Decode::decode(decoder)?;
        Ok(Self {
            translation: DVec3::from_array(translation),
            rotation: DQuat::from_array(rotation),
        })
    }
}
