//! Selector specificity

use std::fmt;

/// Specificity triple `(ids, classes, types)`
///
/// - `ids`: ID selectors
/// - `classes`: class selectors, attribute selectors and pseudo-classes
/// - `types`: type selectors
///
/// Universal selectors contribute nothing. Comparison is lexicographic, so a
/// single ID outranks any number of classes and a single class outranks any
/// number of types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Specificity {
    pub ids: u32,
    pub classes: u32,
    pub types: u32,
}

impl Specificity {
    pub const ZERO: Specificity = Specificity::new(0, 0, 0);

    pub const fn new(ids: u32, classes: u32, types: u32) -> Self {
        Self {
            ids,
            classes,
            types,
        }
    }

    /// Component-wise sum
    pub fn add(self, other: Specificity) -> Specificity {
        Specificity {
            ids: self.ids.saturating_add(other.ids),
            classes: self.classes.saturating_add(other.classes),
            types: self.types.saturating_add(other.types),
        }
    }

    pub fn as_tuple(self) -> (u32, u32, u32) {
        (self.ids, self.classes, self.types)
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.ids, self.classes, self.types)
    }
}
