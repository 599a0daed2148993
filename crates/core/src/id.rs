//! Strongly-typed record identifiers.
//!
//! Identifiers are opaque integers assigned by the store on insert. The type
//! parameter names the record kind, so `Id<Unit>` and `Id<License>` never mix
//! even though both wrap an `i64`.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// Store-assigned identifier of a `T` record.
pub struct Id<T> {
    raw: i64,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub const fn new(raw: i64) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    pub const fn get(self) -> i64 {
        self.raw
    }

    /// Re-tag the raw value as an identifier of another record kind.
    ///
    /// Only for places that legitimately carry a foreign id as plain data,
    /// such as the audit ledger's `item_id`.
    pub const fn cast<U>(self) -> Id<U> {
        Id::new(self.raw)
    }
}

// Manual impls: derives would add `T: Trait` bounds the marker does not need.

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.raw)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

impl<T> From<Id<T>> for i64 {
    fn from(value: Id<T>) -> Self {
        value.raw
    }
}

impl<T> FromStr for Id<T> {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<i64>()
            .map_err(|e| DomainError::invalid_id(format!("{s:?}: {e}")))?;
        if raw <= 0 {
            return Err(DomainError::invalid_id(format!("{raw} is not a store-assigned id")));
        }
        Ok(Self::new(raw))
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.raw)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    struct Gadget;

    #[test]
    fn parses_positive_integers() {
        let id: Id<Widget> = " 42 ".parse().unwrap();
        assert_eq!(id.get(), 42);
    }

    #[test]
    fn rejects_garbage_and_non_positive_values() {
        assert!(matches!("abc".parse::<Id<Widget>>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("0".parse::<Id<Widget>>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<Id<Widget>>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let id: Id<Widget> = Id::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: Id<Widget> = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn cast_keeps_raw_value() {
        let widget: Id<Widget> = Id::new(9);
        let gadget: Id<Gadget> = widget.cast();
        assert_eq!(gadget.get(), 9);
    }
}
