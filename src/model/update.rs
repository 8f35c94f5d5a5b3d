//! Tri-state optional fields for partial-update action inputs.
//!
//! Partial updates distinguish three cases per optional field:
//!
//! | Input JSON        | Meaning                                  |
//! |-------------------|------------------------------------------|
//! | key absent        | leave the state field untouched          |
//! | `"key": null`     | clear the state field to its unset value |
//! | `"key": <value>`  | replace the state field                  |
//!
//! A plain `Option<T>` collapses the first two cases, which is a
//! correctness bug for this engine. [`Update<T>`] keeps them apart:
//! deserializing a present-but-null key yields [`Update::Clear`], while
//! an absent key falls back to the serde field default,
//! [`Update::Absent`]. Use sites must annotate the field with
//! `#[serde(default, skip_serializing_if = "Update::is_absent")]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// A tri-state optional field in a partial-update action input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update<T> {
    /// The field was not provided; leave the current value untouched.
    Absent,
    /// The field was provided as explicit null; clear the current value.
    Clear,
    /// The field was provided with a concrete value; replace the current one.
    Set(T),
}

// Not derived: the derive would demand `T: Default` even though no
// variant holds a default-constructed T.
impl<T> Default for Update<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Update<T> {
    /// Returns `true` if the field was not provided.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` if the field was provided as explicit null.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }

    /// Returns `true` if the field carries a concrete value.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Borrow the concrete value, if any.
    #[must_use]
    pub const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Absent | Self::Clear => None,
        }
    }

    /// Apply this update to an optional state field.
    ///
    /// `Absent` leaves the target untouched, `Clear` resets it to `None`,
    /// `Set` replaces it.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Self::Absent => {}
            Self::Clear => *target = None,
            Self::Set(value) => *target = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Update<T> {
    /// Convert a present field: `Some` becomes `Set`, `None` becomes `Clear`.
    ///
    /// There is deliberately no conversion producing `Absent`; absence only
    /// arises from a missing key during deserialization (or `default()`).
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

impl<'de, T> Deserialize<'de> for Update<T>
where
    T: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only ever called when the key is present: null -> Clear,
        // value -> Set. An absent key never reaches this impl; serde uses
        // the field default (Absent) instead.
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T> Serialize for Update<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // Absent is expected to be skipped via skip_serializing_if;
            // if it is serialized anyway, null is the closest wire form.
            Self::Absent | Self::Clear => serializer.serialize_none(),
            Self::Set(value) => serializer.serialize_some(value),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
