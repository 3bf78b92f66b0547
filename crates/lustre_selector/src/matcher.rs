//! Selector matching against live widgets
//!
//! Every part of a selector must hold on the widget (logical AND, with
//! combinators flattened, see [`crate::parser`]).
//!
//! # Caching
//!
//! The verdict of a selector's *structural* parts (id, type, classes,
//! attributes) is cached per `(selector, widget)` pair. The key also carries
//! the widget's structural signature, so id/type/class changes miss naturally.
//! The cache is **not** keyed by attribute values: call
//! [`SelectorMatcher::clear_cache`] after a widget's attributes change.
//!
//! Pseudo-class parts are never cached. They are probed live on every call,
//! so enabled/visible/focus changes are always observed.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use lustre_core::guard;
use lustre_core::{CacheStats, Widget, WidgetKey, WidgetResult, WidgetSignature};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::parser::{PartKind, PseudoClass, Selector, SelectorPart};

/// Default number of cached structural verdicts
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Matcher for a custom pseudo-class
pub type PseudoMatcher = Arc<dyn Fn(&dyn Widget) -> WidgetResult<bool> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MatchKey {
    selector: u64,
    widget: WidgetKey,
    structure: WidgetSignature,
}

/// Outcome of evaluating structural parts
struct Verdict {
    matched: bool,
    /// False when a widget probe failed; such verdicts are not cached
    cacheable: bool,
}

/// Tests parsed selectors against widgets
pub struct SelectorMatcher {
    cache: Mutex<LruCache<MatchKey, bool>>,
    pseudo: RwLock<FxHashMap<String, PseudoMatcher>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for SelectorMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorMatcher")
            .field("stats", &self.stats())
            .field("pseudo", &self.pseudo.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for SelectorMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorMatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a matcher whose cache holds at most `capacity` verdicts
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            pseudo: RwLock::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Register a matcher for a custom pseudo-class such as `:hovered`
    ///
    /// Replaces any matcher previously registered under the same name.
    pub fn register_pseudo<F>(&self, name: impl Into<String>, matcher: F)
    where
        F: Fn(&dyn Widget) -> WidgetResult<bool> + Send + Sync + 'static,
    {
        self.register_pseudo_matcher(name, Arc::new(matcher));
    }

    /// Register an already shared pseudo-class matcher
    pub fn register_pseudo_matcher(&self, name: impl Into<String>, matcher: PseudoMatcher) {
        self.pseudo.write().insert(name.into(), matcher);
    }

    /// Every registered custom pseudo-class matcher
    pub fn pseudo_matchers(&self) -> Vec<(String, PseudoMatcher)> {
        self.pseudo
            .read()
            .iter()
            .map(|(name, matcher)| (name.clone(), matcher.clone()))
            .collect()
    }

    pub fn has_pseudo(&self, name: &str) -> bool {
        self.pseudo.read().contains_key(name)
    }

    /// Test a selector against a widget
    pub fn matches(&self, selector: &Selector, widget: &dyn Widget) -> bool {
        self.structural_matches(selector, widget) && self.live_matches(selector, widget)
    }

    /// Test a selector without consulting or filling the cache
    pub fn matches_uncached(&self, selector: &Selector, widget: &dyn Widget) -> bool {
        evaluate_structural(selector, widget).matched && self.live_matches(selector, widget)
    }

    /// Test a single part
    pub fn matches_part(&self, part: &SelectorPart, widget: &dyn Widget) -> bool {
        if part.is_live() {
            self.pseudo_holds(part, widget)
        } else {
            guard::contain("selector part", || structural_part_holds(part, widget))
                .and_then(|r| r.ok())
                .unwrap_or(false)
        }
    }

    fn structural_matches(&self, selector: &Selector, widget: &dyn Widget) -> bool {
        let Some(key) = guard::contain("widget identity", || MatchKey {
            selector: selector.fingerprint(),
            widget: widget.key(),
            structure: WidgetSignature::structural(widget),
        }) else {
            return false;
        };

        if let Some(&matched) = self.cache.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return matched;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let verdict = evaluate_structural(selector, widget);
        if verdict.cacheable {
            self.cache.lock().put(key, verdict.matched);
        }
        verdict.matched
    }

    fn live_matches(&self, selector: &Selector, widget: &dyn Widget) -> bool {
        selector
            .live_parts()
            .all(|part| self.pseudo_holds(part, widget))
    }

    fn pseudo_holds(&self, part: &SelectorPart, widget: &dyn Widget) -> bool {
        let Some(pseudo) = &part.pseudo else {
            return false;
        };
        match pseudo {
            PseudoClass::Enabled => guard::probe("is_enabled", || widget.is_enabled()),
            PseudoClass::Disabled => guard::probe("is_enabled", || widget.is_enabled().map(|e| !e)),
            PseudoClass::Visible => guard::probe("is_visible", || widget.is_visible()),
            PseudoClass::Hidden => guard::probe("is_visible", || widget.is_visible().map(|v| !v)),
            PseudoClass::Focused => guard::probe("has_focus", || widget.has_focus()),
            PseudoClass::Custom(name) => {
                let matcher = self.pseudo.read().get(name).cloned();
                match matcher {
                    Some(matcher) => guard::probe(name, || matcher(widget)),
                    None => {
                        debug!(pseudo = %name, "no matcher registered for pseudo-class");
                        false
                    }
                }
            }
        }
    }

    /// Drop every cached verdict
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: cache.len(),
            capacity: cache.cap().get(),
        }
    }
}

fn evaluate_structural(selector: &Selector, widget: &dyn Widget) -> Verdict {
    let outcome = guard::contain("selector match", || {
        for part in selector.structural_parts() {
            match structural_part_holds(part, widget) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    });

    match outcome {
        Some(Ok(matched)) => Verdict {
            matched,
            cacheable: true,
        },
        Some(Err(err)) => {
            debug!(selector = selector.source(), error = %err, "widget probe failed during match");
            Verdict {
                matched: false,
                cacheable: false,
            }
        }
        None => Verdict {
            matched: false,
            cacheable: false,
        },
    }
}

fn structural_part_holds(part: &SelectorPart, widget: &dyn Widget) -> WidgetResult<bool> {
    Ok(match part.kind {
        PartKind::Id => widget.id() == Some(part.value.as_str()),
        PartKind::Class => widget.has_class(&part.value),
        PartKind::Type => widget.type_name() == part.value,
        PartKind::Universal => true,
        PartKind::Attribute => {
            let actual = widget.attribute(&part.value)?;
            part.attribute
                .as_ref()
                .is_some_and(|attr| attr.matches(actual.as_deref()))
        }
        PartKind::Pseudo => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::{WidgetError, WidgetSnapshot};
    use std::sync::atomic::AtomicBool;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    struct Flaky {
        fail: AtomicBool,
    }

    impl Widget for Flaky {
        fn key(&self) -> WidgetKey {
            WidgetKey(77)
        }
        fn id(&self) -> Option<&str> {
            Some("flaky")
        }
        fn type_name(&self) -> &str {
            "Button"
        }
        fn classes(&self) -> Vec<String> {
            vec!["primary".into()]
        }
        fn attribute(&self, _key: &str) -> WidgetResult<Option<String>> {
            if self.fail.load(Ordering::SeqCst) {
                Err(WidgetError::Gone)
            } else {
                Ok(Some("x".into()))
            }
        }
        fn is_enabled(&self) -> WidgetResult<bool> {
            Err(WidgetError::Probe("toolkit error".into()))
        }
    }

    #[test]
    fn test_match_each_kind() {
        let m = SelectorMatcher::new();
        let w = WidgetSnapshot::new(1, "Button")
            .with_id("ok")
            .with_class("primary")
            .with_attribute("role", "confirm");

        assert!(m.matches(&sel("#ok"), &w));
        assert!(!m.matches(&sel("#cancel"), &w));
        assert!(m.matches(&sel(".primary"), &w));
        assert!(!m.matches(&sel(".secondary"), &w));
        assert!(m.matches(&sel("Button"), &w));
        assert!(!m.matches(&sel("Label"), &w));
        assert!(m.matches(&sel("*"), &w));
        assert!(m.matches(&sel("[role]"), &w));
        assert!(m.matches(&sel("[role='confirm']"), &w));
        assert!(m.matches(&sel("[role^=con]"), &w));
        assert!(!m.matches(&sel("[role='cancel']"), &w));
        assert!(!m.matches(&sel("[missing]"), &w));
        assert!(m.matches(&sel(":enabled:visible"), &w));
        assert!(!m.matches(&sel(":focused"), &w));
        assert!(!m.matches(&sel(":disabled"), &w));
    }

    #[test]
    fn test_flattened_combinators() {
        let m = SelectorMatcher::new();
        let w = WidgetSnapshot::new(1, "Button").with_id("dialog").with_class("button");
        assert!(m.matches(&sel("#dialog .button:enabled"), &w));
        assert!(m.matches(&sel("#dialog > .button"), &w));

        let other = WidgetSnapshot::new(2, "Button").with_class("button");
        assert!(!m.matches(&sel("#dialog .button"), &other));
    }

    #[test]
    fn test_pseudo_parts_are_live() {
        let m = SelectorMatcher::new();
        let s = sel("Button:focused");
        let unfocused = WidgetSnapshot::new(1, "Button");
        let focused = unfocused.clone().focused(true);

        assert!(!m.matches(&s, &unfocused));
        // Same key and structure, different live state: no clear_cache needed
        assert!(m.matches(&s, &focused));
        assert!(m.stats().hits >= 1);
    }

    #[test]
    fn test_cache_hits_and_clear() {
        let m = SelectorMatcher::new();
        let s = sel(".primary");
        let w = WidgetSnapshot::new(1, "Button").with_class("primary");

        assert!(m.matches(&s, &w));
        assert!(m.matches(&s, &w));
        let stats = m.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);

        m.clear_cache();
        assert_eq!(m.stats().entries, 0);
    }

    #[test]
    fn test_attribute_change_needs_clear_cache() {
        let m = SelectorMatcher::new();
        let s = sel("[role='ok']");
        let before = WidgetSnapshot::new(1, "Button").with_attribute("role", "ok");
        let after = WidgetSnapshot::new(1, "Button").with_attribute("role", "cancel");

        assert!(m.matches(&s, &before));
        // Documented staleness window: attribute values are not part of the key
        assert!(m.matches(&s, &after));
        m.clear_cache();
        assert!(!m.matches(&s, &after));
        assert!(!m.matches_uncached(&s, &after));
    }

    #[test]
    fn test_probe_failures_are_non_matches() {
        let m = SelectorMatcher::new();
        let w = Flaky {
            fail: AtomicBool::new(true),
        };

        assert!(!m.matches(&sel(":enabled"), &w));
        assert!(!m.matches(&sel(":disabled"), &w));
        assert!(!m.matches(&sel("[role]"), &w));
        // A failed probe is not cached
        w.fail.store(false, Ordering::SeqCst);
        assert!(m.matches(&sel("[role]"), &w));
    }

    #[test]
    fn test_custom_pseudo_classes() {
        let m = SelectorMatcher::new();
        let w = WidgetSnapshot::new(1, "Button").with_attribute("hover", "1");
        let s = sel(":hovered");

        assert!(!m.matches(&s, &w));
        m.register_pseudo("hovered", |w: &dyn Widget| {
            Ok(w.attribute("hover")?.is_some())
        });
        assert!(m.has_pseudo("hovered"));
        assert!(m.matches(&s, &w));

        m.register_pseudo("exploding", |_: &dyn Widget| -> WidgetResult<bool> {
            panic!("custom pseudo failed")
        });
        assert!(!m.matches(&sel(":exploding"), &w));
    }

    #[test]
    fn test_matches_part() {
        let m = SelectorMatcher::new();
        let s = sel("Button.primary:focused");
        let w = WidgetSnapshot::new(1, "Button");
        let results: Vec<bool> = s.parts().iter().map(|p| m.matches_part(p, &w)).collect();
        assert_eq!(results, vec![true, false, false]);
    }
}
