//! Typed theme properties
//!
//! - [`coerce`]: value conversion with unit stripping
//! - [`validate`]: composable constraints
//! - [`descriptor`]: [`ThemeProperty`], cached and inheritance-aware
//! - [`computed`]: [`ComputedProperty`], derived from an owner

pub mod coerce;
pub mod computed;
pub mod descriptor;
pub mod validate;

pub use coerce::{coerce, strip_units, FromPropertyValue};
pub use computed::ComputedProperty;
pub use descriptor::{ChangeListener, PropertySource, ThemeProperty};
pub use validate::Constraints;
