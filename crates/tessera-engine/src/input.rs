//! The per-tick set of active input codes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Input codes (keyboard-style symbols such as `"LEFT"` or `"SPACE"`) held
/// down during one tick. Ordered, so iteration is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSet(BTreeSet<String>);

impl InputSet {
    /// An empty set: nothing pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `code` as active for the tick. Pressing twice is a no-op.
    pub fn press(&mut self, code: impl Into<String>) {
        self.0.insert(code.into());
    }

    /// Check whether a single code is active.
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    /// `true` if every code in `required` is active.
    pub fn is_superset_of(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.0)
    }

    /// Active codes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of active codes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when nothing is pressed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for InputSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
