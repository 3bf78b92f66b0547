//! Lustre Selectors
//!
//! CSS-like selectors for theme rules:
//!
//! - **Parsing**: [`Selector::parse`] turns `Button.primary:enabled` into parts
//!   with a [`Specificity`] of `(ids, classes + attributes + pseudos, types)`
//! - **Matching**: [`SelectorMatcher`] tests selectors against live widgets and
//!   caches the structural verdict per `(selector, widget)` pair
//!
//! Combinators are flattened: every part must hold on the subject widget.
//!
//! # Example
//!
//! ```rust
//! use lustre_core::WidgetSnapshot;
//! use lustre_selector::{Selector, SelectorMatcher, Specificity};
//!
//! let selector = Selector::parse("Button.primary:enabled").unwrap();
//! assert_eq!(selector.specificity(), Specificity::new(0, 2, 1));
//!
//! let matcher = SelectorMatcher::new();
//! let button = WidgetSnapshot::new(1, "Button").with_class("primary");
//! assert!(matcher.matches(&selector, &button));
//! ```

pub mod error;
pub mod matcher;
pub mod parser;
pub mod specificity;

pub use error::{Result, SelectorError};
pub use matcher::{PseudoMatcher, SelectorMatcher, DEFAULT_CACHE_CAPACITY};
pub use parser::{
    parse, AttrOp, AttributeSelector, Combinator, PartKind, PseudoClass, Selector, SelectorPart,
};
pub use specificity::Specificity;
