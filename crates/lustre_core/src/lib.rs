//! Lustre Core
//!
//! Shared foundation for the Lustre theme engine:
//!
//! - **Widget adapter**: the narrow read-only [`Widget`] trait hosts implement
//! - **Widget arena**: [`WidgetRegistry`] of stable handles over weak references
//! - **Values**: [`PropertyValue`], [`PropertyMap`] and rule [`Priority`]
//! - **Fault containment**: [`guard`] helpers that turn panics and probe errors
//!   into non-matches
//!
//! # Example
//!
//! ```rust
//! use lustre_core::{properties, Widget, WidgetSnapshot};
//!
//! let button = WidgetSnapshot::new(1, "Button").with_class("primary");
//! assert!(button.has_class("primary"));
//!
//! let props = properties! { "background" => "#1e1e1e", "padding" => 4 };
//! assert_eq!(props.len(), 2);
//! ```

pub mod guard;
pub mod registry;
pub mod stats;
pub mod value;
pub mod widget;

pub use registry::{WidgetHandle, WidgetRegistry};
pub use stats::CacheStats;
pub use value::{Priority, PropertyMap, PropertyValue};
pub use widget::{
    LiveState, Widget, WidgetError, WidgetKey, WidgetResult, WidgetSignature, WidgetSnapshot,
};
