//! Lustre Theme
//!
//! Theme resolution for live widgets:
//!
//! - **Rules**: selectors plus properties, priorities, conditions and names,
//!   registered on a [`MappingEngine`]
//! - **Resolution**: overlapping rules arbitrated by a [`ConflictStrategy`]
//! - **Caching**: per-widget mappings cached against the rule-set version and
//!   the widget's state signature
//! - **Properties**: [`ThemeProperty`] typed accessors with coercion,
//!   validation, inheritance and defaults
//! - **Debugging**: [`MappingVisualizer`] explains where each value came from
//!
//! # Example
//!
//! ```rust
//! use lustre_core::{properties, Priority, WidgetSnapshot};
//! use lustre_theme::{MappingEngine, ThemeProperty};
//!
//! let engine = MappingEngine::new();
//! engine
//!     .rule("Button")
//!     .priority(Priority::LOW)
//!     .properties(properties! { "color" => "red", "padding" => "4px" })
//!     .add()
//!     .unwrap();
//! engine.add_rule(".primary", properties! { "color" => "blue" }).unwrap();
//!
//! let button = WidgetSnapshot::new(1, "Button").with_class("primary");
//! let mapping = engine.get_mapping(&button);
//! assert_eq!(mapping["color"], "blue".into());
//!
//! let padding = ThemeProperty::new("padding", 0_i64);
//! assert_eq!(padding.get(&mapping), 4);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod global;
pub mod property;
pub mod resolver;
pub mod rule;
pub mod visualizer;

pub use config::EngineConfig;
pub use engine::{EngineStats, MappingEngine, RuleBuilder, RuleValidator};
pub use error::{ConfigError, MappingError, Result, ValidationError};
pub use global::{default_engine, install_default_engine, uninstall_default_engine};
pub use property::{
    ComputedProperty, Constraints, FromPropertyValue, PropertySource, ThemeProperty,
};
pub use resolver::{
    resolve, resolve_traced, ConflictStrategy, PropertyTrace, Resolution, ResolutionStrategy,
    RuleRef,
};
pub use rule::{Condition, MappingRule, RuleSet};
pub use visualizer::{Explanation, MappingVisualizer, RuleEvaluation, WidgetSummary};

// Re-export the layers below so hosts can depend on this crate alone
pub use lustre_core::{
    properties, Priority, PropertyMap, PropertyValue, Widget, WidgetHandle, WidgetKey,
    WidgetRegistry, WidgetSnapshot,
};
pub use lustre_pattern::{PatternKind, PatternMatcher};
pub use lustre_selector::{Selector, SelectorError, Specificity};
