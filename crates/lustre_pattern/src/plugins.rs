//! Pluggable pattern types
//!
//! A [`PatternTypeMatcher`] adds a new pattern kind to a
//! [`PatternMatcher`](crate::PatternMatcher) under a name. Patterns added with
//! [`PatternKind::Plugin`](crate::PatternKind::Plugin) are validated by the
//! plugin at registration and handed back to it on every match.
//!
//! Two plugins ship with the crate:
//!
//! - [`HierarchyMatcher`] (`"hierarchy"`): `"Dialog > Button"`, `"Window Button"`
//! - [`StateMatcher`] (`"state"`): `"Button*:enabled:!focused"`

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use lustre_core::{guard, Widget};
use parking_lot::Mutex;

use crate::glob::Glob;
use crate::matcher::MatchResult;

/// A named, pluggable pattern type
pub trait PatternTypeMatcher: Send + Sync {
    /// Name used in `PatternKind::Plugin(name)`
    fn name(&self) -> &str;

    /// Check a pattern before it is registered
    fn validate(&self, pattern: &str) -> Result<(), String>;

    /// Match a validated pattern against a target
    fn matches(&self, pattern: &str, target: &str, widget: Option<&dyn Widget>) -> MatchResult;
}

/// Parsed patterns each built-in plugin keeps
const MEMO_CAPACITY: usize = 256;

/// Bounded compiled-pattern memo shared by the built-in plugins
///
/// An evicted pattern is parsed again on its next match.
struct Compiled<T> {
    entries: Mutex<LruCache<String, Arc<T>>>,
}

impl<T> Compiled<T> {
    fn new() -> Self {
        Self::with_capacity(MEMO_CAPACITY)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    fn get_or_parse(
        &self,
        pattern: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<Arc<T>, String> {
        if let Some(found) = self.entries.lock().get(pattern) {
            return Ok(found.clone());
        }
        let parsed = Arc::new(parse(pattern)?);
        self.entries.lock().put(pattern.to_string(), parsed.clone());
        Ok(parsed)
    }
}

// =============================================================================
// HIERARCHY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// `A B`: any ancestor further up
    Descendant,
    /// `A > B`: the immediate parent
    Child,
}

/// Parsed hierarchy pattern; `ancestors[i]` relates to the segment after it by `steps[i]`
struct Hierarchy {
    target: Glob,
    ancestors: Vec<Glob>,
    steps: Vec<Step>,
}

fn parse_hierarchy(pattern: &str) -> Result<Hierarchy, String> {
    let mut segments: Vec<Glob> = Vec::new();
    let mut steps = Vec::new();
    let mut pending = None;

    for token in pattern.replace('>', " > ").split_whitespace() {
        if token == ">" {
            if segments.is_empty() || pending == Some(Step::Child) {
                return Err("'>' must sit between two segments".to_string());
            }
            pending = Some(Step::Child);
            continue;
        }
        let glob = Glob::new(token).map_err(|e| e.to_string())?;
        if !segments.is_empty() {
            steps.push(pending.take().unwrap_or(Step::Descendant));
        }
        pending = None;
        segments.push(glob);
    }

    if pending.is_some() {
        return Err("pattern ends with '>'".to_string());
    }
    let Some(target) = segments.pop() else {
        return Err("empty hierarchy pattern".to_string());
    };
    Ok(Hierarchy {
        target,
        ancestors: segments,
        steps,
    })
}

impl Hierarchy {
    /// Match ancestor segments right to left against `chain` (nearest first)
    fn ancestors_match(&self, chain: &[String]) -> bool {
        self.match_from(self.ancestors.len(), chain, 0)
    }

    fn match_from(&self, remaining: usize, chain: &[String], pos: usize) -> bool {
        if remaining == 0 {
            return true;
        }
        let segment = &self.ancestors[remaining - 1];
        match self.steps[remaining - 1] {
            Step::Child => chain
                .get(pos)
                .is_some_and(|name| segment.is_match(name) && self.match_from(remaining - 1, chain, pos + 1)),
            Step::Descendant => (pos..chain.len()).any(|i| {
                segment.is_match(&chain[i]) && self.match_from(remaining - 1, chain, i + 1)
            }),
        }
    }
}

/// Matches a target and its widget's ancestor chain
///
/// Segments are globs. The last segment matches the target, the others match
/// `widget.ancestors()` (nearest first). Without a widget only single-segment
/// patterns can match.
pub struct HierarchyMatcher {
    compiled: Compiled<Hierarchy>,
}

impl Default for HierarchyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyMatcher {
    pub const NAME: &'static str = "hierarchy";

    pub fn new() -> Self {
        Self {
            compiled: Compiled::new(),
        }
    }
}

impl PatternTypeMatcher for HierarchyMatcher {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, pattern: &str) -> Result<(), String> {
        self.compiled.get_or_parse(pattern, parse_hierarchy).map(|_| ())
    }

    fn matches(&self, pattern: &str, target: &str, widget: Option<&dyn Widget>) -> MatchResult {
        let Ok(hierarchy) = self.compiled.get_or_parse(pattern, parse_hierarchy) else {
            return MatchResult::NO_MATCH;
        };
        let Some(score) = hierarchy.target.score(target) else {
            return MatchResult::NO_MATCH;
        };
        if hierarchy.ancestors.is_empty() {
            return MatchResult::hit(score);
        }
        let Some(widget) = widget else {
            return MatchResult::NO_MATCH;
        };
        let Some(chain) = guard::contain("ancestors", || widget.ancestors()) else {
            return MatchResult::NO_MATCH;
        };
        if hierarchy.ancestors_match(&chain) {
            MatchResult::hit(score)
        } else {
            MatchResult::NO_MATCH
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Enabled,
    Visible,
    Focused,
}

struct StatePattern {
    target: Glob,
    /// (flag, expected value)
    flags: Vec<(Flag, bool)>,
}

fn parse_state(pattern: &str) -> Result<StatePattern, String> {
    let mut pieces = pattern.split(':');
    let head = pieces.next().unwrap_or_default().trim();
    let target = Glob::new(if head.is_empty() { "*" } else { head }).map_err(|e| e.to_string())?;

    let mut flags = Vec::new();
    for piece in pieces {
        let piece = piece.trim();
        let (negated, name) = match piece.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, piece),
        };
        let (flag, expected) = match name {
            "enabled" => (Flag::Enabled, true),
            "disabled" => (Flag::Enabled, false),
            "visible" => (Flag::Visible, true),
            "hidden" => (Flag::Visible, false),
            "focused" | "focus" => (Flag::Focused, true),
            other => return Err(format!("unknown state '{}'", other)),
        };
        flags.push((flag, expected != negated));
    }
    Ok(StatePattern { target, flags })
}

/// Matches a target glob plus live widget state
///
/// `"Button*:enabled:!focused"` matches targets starting with `Button` whose
/// widget is enabled and not focused. A state that cannot be probed is a
/// non-match, as is any state requirement without a widget.
pub struct StateMatcher {
    compiled: Compiled<StatePattern>,
}

impl Default for StateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMatcher {
    pub const NAME: &'static str = "state";

    pub fn new() -> Self {
        Self {
            compiled: Compiled::new(),
        }
    }
}

impl PatternTypeMatcher for StateMatcher {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, pattern: &str) -> Result<(), String> {
        self.compiled.get_or_parse(pattern, parse_state).map(|_| ())
    }

    fn matches(&self, pattern: &str, target: &str, widget: Option<&dyn Widget>) -> MatchResult {
        let Ok(state) = self.compiled.get_or_parse(pattern, parse_state) else {
            return MatchResult::NO_MATCH;
        };
        let Some(score) = state.target.score(target) else {
            return MatchResult::NO_MATCH;
        };
        if state.flags.is_empty() {
            return MatchResult::hit(score);
        }
        let Some(widget) = widget else {
            return MatchResult::NO_MATCH;
        };

        let holds = state.flags.iter().all(|&(flag, expected)| {
            let actual = match flag {
                Flag::Enabled => guard::try_probe("is_enabled", || widget.is_enabled()),
                Flag::Visible => guard::try_probe("is_visible", || widget.is_visible()),
                Flag::Focused => guard::try_probe("has_focus", || widget.has_focus()),
            };
            actual == Some(expected)
        });
        if holds {
            MatchResult::hit(score)
        } else {
            MatchResult::NO_MATCH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::{WidgetError, WidgetKey, WidgetResult, WidgetSnapshot};

    #[test]
    fn test_hierarchy_child_and_descendant() {
        let m = HierarchyMatcher::new();
        let w = WidgetSnapshot::new(1, "Button").with_ancestors(["Panel", "Dialog", "Window"]);

        assert!(m.matches("Panel > Button", "Button", Some(&w)).matched);
        assert!(!m.matches("Dialog > Button", "Button", Some(&w)).matched);
        assert!(m.matches("Dialog Button", "Button", Some(&w)).matched);
        assert!(m.matches("Window > Dialog > Panel > Button", "Button", Some(&w)).matched);
        assert!(m.matches("Window Panel Button", "Button", Some(&w)).matched);
        assert!(!m.matches("Panel Window Button", "Button", Some(&w)).matched);
        assert!(m.matches("Dia* B*", "Button", Some(&w)).matched);
    }

    #[test]
    fn test_hierarchy_without_widget() {
        let m = HierarchyMatcher::new();
        assert!(m.matches("Butt*", "Button", None).matched);
        assert!(!m.matches("Dialog > Button", "Button", None).matched);
    }

    #[test]
    fn test_hierarchy_validation() {
        let m = HierarchyMatcher::new();
        assert!(m.validate("Dialog > Button").is_ok());
        assert!(m.validate("Dialog>Button").is_ok());
        assert!(m.validate("").is_err());
        assert!(m.validate("> Button").is_err());
        assert!(m.validate("Dialog >").is_err());
        assert!(m.validate("Dialog > > Button").is_err());
        assert!(m.validate("Dialog [x").is_err());
    }

    #[test]
    fn test_state_patterns() {
        let m = StateMatcher::new();
        let enabled = WidgetSnapshot::new(1, "Button");
        let focused = enabled.clone().focused(true);
        let disabled = enabled.clone().enabled(false);

        let p = "Button*:enabled:!focused";
        assert!(m.matches(p, "ButtonPrimary", Some(&enabled)).matched);
        assert!(!m.matches(p, "ButtonPrimary", Some(&focused)).matched);
        assert!(!m.matches(p, "ButtonPrimary", Some(&disabled)).matched);
        assert!(!m.matches(p, "Label", Some(&enabled)).matched);
        assert!(!m.matches(p, "ButtonPrimary", None).matched);

        assert!(m.matches(":disabled", "anything", Some(&disabled)).matched);
        assert!(m.matches("Button", "Button", None).matched);
    }

    #[test]
    fn test_memo_is_bounded() {
        let memo: Compiled<StatePattern> = Compiled::with_capacity(2);
        for pattern in ["A:enabled", "B:enabled", "C:enabled"] {
            assert!(memo.get_or_parse(pattern, parse_state).is_ok());
        }
        assert_eq!(memo.entries.lock().len(), 2);
        assert!(!memo.entries.lock().contains("A:enabled"));

        // Evicted patterns still match after a re-parse
        let m = StateMatcher {
            compiled: Compiled::with_capacity(1),
        };
        let w = WidgetSnapshot::new(1, "Button");
        assert!(m.validate("Button:enabled").is_ok());
        assert!(m.validate("Label:enabled").is_ok());
        assert!(m.matches("Button:enabled", "Button", Some(&w)).matched);
    }

    #[test]
    fn test_state_validation() {
        let m = StateMatcher::new();
        assert!(m.validate("Button:hovered").is_err());
        assert!(m.validate("Button:!hidden").is_ok());
    }

    struct Broken;

    impl Widget for Broken {
        fn key(&self) -> WidgetKey {
            WidgetKey(9)
        }
        fn id(&self) -> Option<&str> {
            None
        }
        fn type_name(&self) -> &str {
            "Button"
        }
        fn classes(&self) -> Vec<String> {
            Vec::new()
        }
        fn is_enabled(&self) -> WidgetResult<bool> {
            Err(WidgetError::Gone)
        }
        fn ancestors(&self) -> Vec<String> {
            panic!("tree torn down")
        }
    }

    #[test]
    fn test_faulty_widget_is_non_matching() {
        assert!(!StateMatcher::new().matches("*:enabled", "Button", Some(&Broken)).matched);
        assert!(!StateMatcher::new().matches("*:!enabled", "Button", Some(&Broken)).matched);
        assert!(!HierarchyMatcher::new().matches("Dialog Button", "Button", Some(&Broken)).matched);
    }
}
