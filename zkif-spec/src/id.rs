//! # Variable Identifiers
//!
//! Variable ids travel on the wire as little-endian u64 values and are kept
//! as native u64 everywhere in this crate. Conversions to narrower integer
//! types or to `f64` are explicit and checked: a consumer storing ids as doubles can
//! only represent ids up to `2^53 - 1` exactly, so [`VariableId::to_f64_exact`]
//! refuses anything larger instead of rounding.

use crate::error::{Result, ZkifError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest id that converts to `f64` without loss (`2^53 - 1`)
pub const MAX_EXACT_F64_ID: u64 = (1 << 53) - 1;

/// Identifier of one circuit variable
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct VariableId(u64);

impl VariableId {
    /// Variable 0 always holds the constant one
    pub const ONE: Self = Self(0);

    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Next id, or `None` at the end of the id space
    #[inline]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Convert to `f64`, failing above [`MAX_EXACT_F64_ID`]
    pub fn to_f64_exact(self) -> Result<f64> {
        if self.0 > MAX_EXACT_F64_ID {
            return Err(ZkifError::IdentifierPrecisionLoss {
                id: self.0,
                target: "f64",
            });
        }
        Ok(self.0 as f64)
    }

    /// Convert to a narrower integer type, failing if the id does not fit
    pub fn narrow<T: TryFrom<u64>>(self) -> Result<T> {
        T::try_from(self.0).map_err(|_| ZkifError::IdentifierPrecisionLoss {
            id: self.0,
            target: std::any::type_name::<T>(),
        })
    }
}

/// Wrap an application-level index as a wire identifier (bit-level identity)
#[inline]
pub const fn to_wire_id(n: u64) -> VariableId {
    VariableId(n)
}

/// Unwrap a wire identifier into an application-level index (bit-level identity)
#[inline]
pub const fn from_wire_id(id: VariableId) -> u64 {
    id.0
}

impl From<u64> for VariableId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<VariableId> for u64 {
    fn from(id: VariableId) -> Self {
        id.0
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that `ids` counts up by one starting at `first_id`
pub fn is_contiguous(first_id: VariableId, ids: impl IntoIterator<Item = VariableId>) -> bool {
    let mut expected = Some(first_id);
    for id in ids {
        match expected {
            Some(e) if e == id => expected = e.checked_next(),
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_identity() {
        for n in [0, 1, 1 << 32, MAX_EXACT_F64_ID, 1 << 53, u64::MAX] {
            assert_eq!(from_wire_id(to_wire_id(n)), n);
            assert_eq!(u64::from(VariableId::from(n)), n);
        }
    }

    #[test]
    fn test_to_f64_exact() {
        assert_eq!(VariableId::new(3).to_f64_exact().unwrap(), 3.0);
        assert_eq!(
            VariableId::new(MAX_EXACT_F64_ID).to_f64_exact().unwrap(),
            9007199254740991.0
        );

        let err = VariableId::new(1 << 53).to_f64_exact().unwrap_err();
        assert!(matches!(
            err,
            ZkifError::IdentifierPrecisionLoss { id, target: "f64" } if id == 1 << 53
        ));
        assert!(VariableId::new(u64::MAX).to_f64_exact().is_err());
    }

    #[test]
    fn test_narrow() {
        assert_eq!(VariableId::new(7).narrow::<u8>().unwrap(), 7u8);
        assert_eq!(VariableId::new(u32::MAX as u64).narrow::<u32>().unwrap(), u32::MAX);

        let err = VariableId::new(1 << 32).narrow::<u32>().unwrap_err();
        assert!(matches!(
            err,
            ZkifError::IdentifierPrecisionLoss { target: "u32", .. }
        ));
        assert!(VariableId::new(u64::MAX).narrow::<i64>().is_err());
    }

    #[test]
    fn test_checked_next() {
        assert_eq!(VariableId::ONE.checked_next(), Some(VariableId::new(1)));
        assert_eq!(VariableId::new(u64::MAX).checked_next(), None);
    }

    #[test]
    fn test_is_contiguous() {
        let ids = |v: &[u64]| v.iter().copied().map(VariableId::new).collect::<Vec<_>>();

        assert!(is_contiguous(VariableId::new(1), ids(&[1, 2, 3])));
        assert!(is_contiguous(VariableId::new(5), ids(&[])));
        assert!(!is_contiguous(VariableId::new(1), ids(&[1, 3])));
        assert!(!is_contiguous(VariableId::new(0), ids(&[1])));
        assert!(is_contiguous(VariableId::new(u64::MAX), ids(&[u64::MAX])));
        assert!(!is_contiguous(VariableId::new(u64::MAX), ids(&[u64::MAX, 0])));
    }

    #[test]
    fn test_display_and_serde() {
        let id = VariableId::new(42);
        assert_eq!(id.to_string(), "42");

        let bytes = bincode::serialize(&id).unwrap();
        assert_eq!(bytes, 42u64.to_le_bytes());
        assert_eq!(bincode::deserialize::<VariableId>(&bytes).unwrap(), id);
    }
}
