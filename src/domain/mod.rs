//! Strongly typed identifiers and small domain primitives.
//!
//! Decision and user ids are both plain integers in the database; the
//! newtypes keep them from being swapped at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a Decision.
///
/// # Examples
///
/// ```rust
/// use decision_tracker::domain::DecisionId;
///
/// let id = DecisionId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DecisionId(i32);

impl DecisionId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DecisionId> for i32 {
    fn from(id: DecisionId) -> Self {
        id.0
    }
}

impl From<i32> for DecisionId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for DecisionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for DecisionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i32::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Unique identifier for a User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(i32);

impl UserId {
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i32(self.0)
    }
}

/// Sort direction for list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    #[must_use]
    pub const fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_id_conversions() {
        let id = DecisionId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(DecisionId::from(42), id);
    }

    #[test]
    fn decision_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&DecisionId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: DecisionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DecisionId::new(7));
    }

    #[test]
    fn sort_order_defaults_to_ascending() {
        assert!(SortOrder::default().is_ascending());
        assert!(!SortOrder::Descending.is_ascending());
    }
}
