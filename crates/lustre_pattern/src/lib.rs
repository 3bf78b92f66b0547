//! Lustre Patterns
//!
//! A secondary matching engine for theme targets that selectors cannot
//! express: globs, regexes, user functions and pluggable pattern types.
//! Every match carries a score in `[0, 1]` used for tie-breaking.
//!
//! # Example
//!
//! ```rust
//! use lustre_core::Priority;
//! use lustre_pattern::{PatternKind, PatternMatcher};
//!
//! let matcher = PatternMatcher::new().with_builtin_plugins();
//! matcher.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
//! matcher.add_pattern(r"test_\d+", PatternKind::Regex, Priority::HIGH).unwrap();
//!
//! assert_eq!(matcher.match_patterns("TestWidget", None).len(), 1);
//! assert!(matcher.get_best_match("test_42", None).is_some());
//! ```

pub mod error;
pub mod glob;
pub mod matcher;
pub mod plugins;

pub use error::{PatternError, Result};
pub use glob::Glob;
pub use matcher::{
    CustomMatchFn, MatchResult, PatternKind, PatternMatch, PatternMatcher, PatternRule,
    PatternStats, DEFAULT_CACHE_CAPACITY,
};
pub use plugins::{HierarchyMatcher, PatternTypeMatcher, StateMatcher};
