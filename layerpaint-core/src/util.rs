//! Utility types, used throughout the crate.

/// A float which is finite and within `[0, 1]`, such as an opacity.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f32", into = "f32")]
#[repr(transparent)]
pub struct UnitF32(f32);
impl UnitF32 {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);
    pub fn new(val: f32) -> Result<Self, UnitF32Error> {
        if !val.is_finite() {
            Err(UnitF32Error::NotFinite)
        } else if !(0.0..=1.0).contains(&val) {
            Err(UnitF32Error::OutOfRange)
        } else {
            // Normalize -0.0, so that bitwise hashing agrees with equality.
            Ok(Self(val + 0.0))
        }
    }
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }
    /// Quantize to an 8-bit channel value.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        // In range by construction.
        (self.0 * 255.0).round() as u8
    }
}

impl Default for UnitF32 {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<f32> for UnitF32 {
    type Error = UnitF32Error;
    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
impl From<UnitF32> for f32 {
    fn from(value: UnitF32) -> Self {
        value.get()
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitF32Error {
    #[error("not finite")]
    NotFinite,
    #[error("outside of the range 0.0..=1.0")]
    OutOfRange,
}

// Never NaN, so PartialEq can act like Eq.
impl Eq for UnitF32 {}
#[allow(clippy::derive_ord_xor_partial_ord)]
impl Ord for UnitF32 {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl std::hash::Hash for UnitF32 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u32(self.0.to_bits());
    }
}
impl std::fmt::Display for UnitF32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::{UnitF32, UnitF32Error};
    #[test]
    fn rejects_bad_values() {
        assert_eq!(UnitF32::new(f32::NAN), Err(UnitF32Error::NotFinite));
        assert_eq!(UnitF32::new(f32::INFINITY), Err(UnitF32Error::NotFinite));
        assert_eq!(UnitF32::new(1.5), Err(UnitF32Error::OutOfRange));
        assert_eq!(UnitF32::new(-0.25), Err(UnitF32Error::OutOfRange));
    }
    #[test]
    fn negative_zero_is_zero() {
        let neg = UnitF32::new(-0.0).unwrap();
        assert_eq!(neg, UnitF32::ZERO);
        assert!(neg.get().is_sign_positive());
    }
    #[test]
    fn quantize() {
        assert_eq!(UnitF32::ZERO.to_u8(), 0);
        assert_eq!(UnitF32::ONE.to_u8(), 255);
        assert_eq!(UnitF32::new(0.5).unwrap().to_u8(), 128);
    }
}
