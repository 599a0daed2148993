//! Value objects: equality by value, not identity.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A non-negative count of stock units.
///
/// Quantities arrive as free text or signed integers from callers and from
/// storage columns. They are normalized here, once, so lifecycle code only
/// ever sees a validated count.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(u32);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    pub const ONE: Quantity = Quantity(1);

    pub const fn new(count: u32) -> Self {
        Self(count)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `None` when `other` is larger than `self`.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Quantity)
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        i64::from(value.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> DomainResult<Self> {
        u32::try_from(value)
            .map(Quantity)
            .map_err(|_| DomainError::validation(format!("quantity {value} is out of range")))
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        let trimmed = s.trim();
        let value = trimmed.parse::<i64>().map_err(|_| {
            DomainError::validation(format!("quantity {trimmed:?} is not a whole number"))
        })?;
        Quantity::try_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_text_once_at_the_boundary() {
        assert_eq!(" 5 ".parse::<Quantity>().unwrap(), Quantity::new(5));
        assert_eq!("0".parse::<Quantity>().unwrap(), Quantity::ZERO);
    }

    #[test]
    fn rejects_negative_and_non_numeric_text() {
        assert!(matches!("-1".parse::<Quantity>(), Err(DomainError::Validation(_))));
        assert!(matches!("three".parse::<Quantity>(), Err(DomainError::Validation(_))));
        assert!(matches!("2.5".parse::<Quantity>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejects_out_of_range_integers() {
        assert!(Quantity::try_from(-4i64).is_err());
        assert!(Quantity::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let q: Quantity = serde_json::from_str("3").unwrap();
        assert_eq!(q.get(), 3);
        assert!(serde_json::from_str::<Quantity>("-3").is_err());
    }

    #[test]
    fn checked_sub_refuses_to_go_below_zero() {
        assert_eq!(Quantity::new(5).checked_sub(Quantity::new(3)), Some(Quantity::new(2)));
        assert_eq!(Quantity::new(2).checked_sub(Quantity::new(3)), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn sub_then_add_is_identity(a in 0u32..1_000_000, b in 0u32..1_000_000) {
            let (big, small) = if a >= b { (a, b) } else { (b, a) };
            let left = Quantity::new(big).checked_sub(Quantity::new(small)).unwrap();
            prop_assert_eq!(left.checked_add(Quantity::new(small)), Some(Quantity::new(big)));
        }
    }
}
