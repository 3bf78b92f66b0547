//! Scored pattern matching with an LRU result cache
//!
//! Patterns live in slots indexed by registration order. Removal is a soft
//! delete: the index stays reserved and is never reused.
//!
//! Match lists are cached per `(target, widget signature)`. Removing a pattern
//! leaves cache entries in place, but lists read back from the cache are
//! filtered against the live slots, so a removed pattern is never reported.
//! Adding a pattern starts a new cache generation.
//!
//! Custom and plugin patterns may read anything from the widget (ancestors,
//! attributes, host state). A lookup that hands a widget to one of them is
//! computed fresh and never cached.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use lustre_core::{guard, Priority, Widget, WidgetSignature};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{PatternError, Result};
use crate::glob::{ratio, Glob};
use crate::plugins::{HierarchyMatcher, PatternTypeMatcher, StateMatcher};

/// Default number of cached match lists
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Compiled globs kept for reuse across registrations
const GLOB_CACHE_CAPACITY: usize = 256;

/// User-supplied match function for [`PatternKind::Custom`]
pub type CustomMatchFn = Arc<dyn Fn(&str, Option<&dyn Widget>) -> bool + Send + Sync>;

/// How a pattern string is interpreted
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Glob,
    Regex,
    Custom,
    /// A registered [`PatternTypeMatcher`], by name
    Plugin(String),
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Glob => write!(f, "glob"),
            PatternKind::Regex => write!(f, "regex"),
            PatternKind::Custom => write!(f, "custom"),
            PatternKind::Plugin(name) => write!(f, "plugin:{}", name),
        }
    }
}

/// Outcome of testing one pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Quality of the match in `[0, 1]`, used for tie-breaking
    pub score: f64,
}

impl MatchResult {
    pub const NO_MATCH: MatchResult = MatchResult {
        matched: false,
        score: 0.0,
    };

    /// A successful match; the score is clamped into `[0, 1]`
    pub fn hit(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            matched: true,
            score,
        }
    }
}

enum Compiled {
    Glob(Arc<Glob>),
    Regex(Regex),
    Custom(CustomMatchFn),
    Plugin(Arc<dyn PatternTypeMatcher>),
}

/// A registered pattern
pub struct PatternRule {
    pub pattern: String,
    pub kind: PatternKind,
    pub priority: Priority,
    compiled: Compiled,
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRule")
            .field("pattern", &self.pattern)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish()
    }
}

impl PatternRule {
    /// Whether a match may depend on more of the widget than its signature
    fn reads_widget(&self) -> bool {
        matches!(self.compiled, Compiled::Custom(_) | Compiled::Plugin(_))
    }

    fn evaluate(&self, target: &str, widget: Option<&dyn Widget>) -> MatchResult {
        match &self.compiled {
            Compiled::Glob(glob) => glob.score(target).map_or(MatchResult::NO_MATCH, MatchResult::hit),
            Compiled::Regex(re) => match re.find(target) {
                Some(m) => MatchResult::hit(ratio(
                    m.as_str().chars().count(),
                    target.chars().count(),
                )),
                None => MatchResult::NO_MATCH,
            },
            Compiled::Custom(f) => {
                let matched = guard::contain(&self.pattern, || f(target, widget)).unwrap_or(false);
                if matched {
                    MatchResult::hit(1.0)
                } else {
                    MatchResult::NO_MATCH
                }
            }
            Compiled::Plugin(plugin) => {
                let result = guard::contain(plugin.name(), || {
                    plugin.matches(&self.pattern, target, widget)
                })
                .unwrap_or(MatchResult::NO_MATCH);
                if result.matched {
                    MatchResult::hit(result.score)
                } else {
                    MatchResult::NO_MATCH
                }
            }
        }
    }
}

/// A pattern that matched a target
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Registration index of the pattern
    pub index: usize,
    pub rule: Arc<PatternRule>,
    pub result: MatchResult,
}

/// Snapshot of matcher state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternStats {
    /// Patterns ever registered, including removed ones
    pub total: usize,
    pub active: usize,
    /// Active patterns per kind (`glob`, `regex`, `custom`, `plugin:<name>`)
    pub by_kind: BTreeMap<String, usize>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    target: String,
    widget: WidgetSignature,
    generation: u64,
}

#[derive(Default)]
struct Slots {
    rules: Vec<Option<Arc<PatternRule>>>,
    generation: u64,
}

/// Registry of glob, regex, custom and plugin patterns
pub struct PatternMatcher {
    slots: RwLock<Slots>,
    plugins: RwLock<FxHashMap<String, Arc<dyn PatternTypeMatcher>>>,
    globs: Mutex<LruCache<String, Arc<Glob>>>,
    cache: Mutex<LruCache<CacheKey, Arc<[(usize, MatchResult)]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for PatternMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a matcher whose result cache holds at most `capacity` lists
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            plugins: RwLock::new(FxHashMap::default()),
            globs: Mutex::new(LruCache::new(
                NonZeroUsize::new(GLOB_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Register the `hierarchy` and `state` plugins
    pub fn with_builtin_plugins(self) -> Self {
        self.register_matcher(HierarchyMatcher::new());
        self.register_matcher(StateMatcher::new());
        self
    }

    /// Register a plugin under its name, replacing any previous one
    ///
    /// Patterns already registered keep the plugin they were validated with.
    pub fn register_matcher<M: PatternTypeMatcher + 'static>(&self, matcher: M) {
        let name = matcher.name().to_string();
        debug!(plugin = %name, "registered pattern matcher");
        self.plugins.write().insert(name, Arc::new(matcher));
    }

    pub fn has_matcher(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Register a glob, regex or plugin pattern
    pub fn add_pattern(
        &self,
        pattern: impl Into<String>,
        kind: PatternKind,
        priority: Priority,
    ) -> Result<usize> {
        self.add_pattern_with(pattern, kind, priority, None)
    }

    /// Register a custom pattern backed by `f`
    pub fn add_custom<F>(&self, pattern: impl Into<String>, priority: Priority, f: F) -> Result<usize>
    where
        F: Fn(&str, Option<&dyn Widget>) -> bool + Send + Sync + 'static,
    {
        self.add_pattern_with(pattern, PatternKind::Custom, priority, Some(Arc::new(f)))
    }

    /// Register a pattern of any kind
    ///
    /// `custom` is required for [`PatternKind::Custom`] and ignored otherwise.
    /// Nothing is registered on error.
    pub fn add_pattern_with(
        &self,
        pattern: impl Into<String>,
        kind: PatternKind,
        priority: Priority,
        custom: Option<CustomMatchFn>,
    ) -> Result<usize> {
        let pattern = pattern.into();
        let compiled = self.compile(&pattern, &kind, custom)?;
        let rule = Arc::new(PatternRule {
            pattern,
            kind,
            priority,
            compiled,
        });

        let index = {
            let mut slots = self.slots.write();
            slots.rules.push(Some(rule.clone()));
            slots.generation += 1;
            slots.rules.len() - 1
        };
        self.cache.lock().clear();
        debug!(index, pattern = %rule.pattern, kind = %rule.kind, "added pattern");
        Ok(index)
    }

    fn compile(
        &self,
        pattern: &str,
        kind: &PatternKind,
        custom: Option<CustomMatchFn>,
    ) -> Result<Compiled> {
        match kind {
            PatternKind::Glob => Ok(Compiled::Glob(self.glob(pattern)?)),
            PatternKind::Regex => Regex::new(pattern)
                .map(Compiled::Regex)
                .map_err(|e| PatternError::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                }),
            PatternKind::Custom => custom
                .map(Compiled::Custom)
                .ok_or_else(|| PatternError::MissingCustomFunction(pattern.to_string())),
            PatternKind::Plugin(name) => {
                let plugin = self
                    .plugins
                    .read()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| PatternError::UnknownPlugin(name.clone()))?;
                let verdict = guard::contain(name, || plugin.validate(pattern))
                    .unwrap_or_else(|| Err("validator panicked".to_string()));
                verdict.map_err(|message| PatternError::Rejected {
                    plugin: name.clone(),
                    pattern: pattern.to_string(),
                    message,
                })?;
                Ok(Compiled::Plugin(plugin))
            }
        }
    }

    /// Compile a glob once, reusing it for identical patterns
    fn glob(&self, pattern: &str) -> Result<Arc<Glob>> {
        if let Some(glob) = self.globs.lock().get(pattern) {
            return Ok(glob.clone());
        }
        let glob = Arc::new(Glob::new(pattern)?);
        self.globs.lock().put(pattern.to_string(), glob.clone());
        Ok(glob)
    }

    /// Soft-delete a pattern; false for unknown or already removed indices
    pub fn remove_pattern(&self, index: usize) -> bool {
        let removed = self
            .slots
            .write()
            .rules
            .get_mut(index)
            .and_then(Option::take);
        let Some(rule) = removed else {
            return false;
        };
        if rule.kind == PatternKind::Glob {
            self.globs.lock().pop(&rule.pattern);
        }
        debug!(index, "removed pattern");
        true
    }

    pub fn pattern(&self, index: usize) -> Option<Arc<PatternRule>> {
        self.slots.read().rules.get(index).cloned().flatten()
    }

    /// Number of active patterns
    pub fn len(&self) -> usize {
        self.slots.read().rules.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every active pattern matching `target`, in registration order
    pub fn match_patterns(&self, target: &str, widget: Option<&dyn Widget>) -> Vec<PatternMatch> {
        let (live, generation) = {
            let slots = self.slots.read();
            let live: Vec<(usize, Arc<PatternRule>)> = slots
                .rules
                .iter()
                .enumerate()
                .filter_map(|(i, r)| r.clone().map(|r| (i, r)))
                .collect();
            (live, slots.generation)
        };

        let signature = match widget {
            Some(_) if live.iter().any(|(_, rule)| rule.reads_widget()) => {
                trace!(subject = target, "widget-dependent patterns, bypassing cache");
                None
            }
            Some(w) => guard::contain("widget signature", || WidgetSignature::of(w)),
            None => Some(WidgetSignature::NONE),
        };
        let key = signature.map(|widget| CacheKey {
            target: target.to_string(),
            widget,
            generation,
        });

        if let Some(key) = &key {
            let cached = self.cache.lock().get(key).cloned();
            if let Some(cached) = cached {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return self.resolve_cached(&cached);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let results: Vec<(usize, MatchResult)> = live
            .iter()
            .filter_map(|(index, rule)| {
                let result = rule.evaluate(target, widget);
                result.matched.then_some((*index, result))
            })
            .collect();
        trace!(subject = target, matched = results.len(), "computed pattern matches");

        if let Some(key) = key {
            self.cache.lock().put(key, results.clone().into());
        }

        let by_index: FxHashMap<usize, Arc<PatternRule>> = live.into_iter().collect();
        results
            .into_iter()
            .filter_map(|(index, result)| {
                by_index.get(&index).map(|rule| PatternMatch {
                    index,
                    rule: rule.clone(),
                    result,
                })
            })
            .collect()
    }

    /// Turn a cached list into matches, skipping patterns removed since
    fn resolve_cached(&self, cached: &[(usize, MatchResult)]) -> Vec<PatternMatch> {
        let slots = self.slots.read();
        cached
            .iter()
            .filter_map(|&(index, result)| {
                let rule = slots.rules.get(index)?.clone()?;
                Some(PatternMatch {
                    index,
                    rule,
                    result,
                })
            })
            .collect()
    }

    /// The single best match: highest priority, then score, then earliest registration
    pub fn get_best_match(&self, target: &str, widget: Option<&dyn Widget>) -> Option<PatternMatch> {
        self.match_patterns(target, widget)
            .into_iter()
            .max_by(|a, b| {
                a.rule
                    .priority
                    .cmp(&b.rule.priority)
                    .then(a.result.score.total_cmp(&b.result.score))
                    .then(b.index.cmp(&a.index))
            })
    }

    /// Drop every cached match list
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> PatternStats {
        let slots = self.slots.read();
        let mut by_kind = BTreeMap::new();
        for rule in slots.rules.iter().flatten() {
            *by_kind.entry(rule.kind.to_string()).or_insert(0) += 1;
        }
        PatternStats {
            total: slots.rules.len(),
            active: by_kind.values().sum(),
            by_kind,
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            cached_entries: self.cache.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::{WidgetError, WidgetKey, WidgetResult, WidgetSnapshot};

    #[test]
    fn test_glob_and_regex() {
        let m = PatternMatcher::new();
        let glob = m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        let re = m.add_pattern(r"test_\d+", PatternKind::Regex, Priority::NORMAL).unwrap();

        let hits = m.match_patterns("TestWidget", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, glob);
        assert!(m.match_patterns("NoMatch", None).is_empty());

        let hits = m.match_patterns("test_123", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, re);
        assert!(m.match_patterns("test_abc", None).is_empty());
    }

    #[test]
    fn test_scores() {
        let m = PatternMatcher::new();
        m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        m.add_pattern("Widget", PatternKind::Regex, Priority::NORMAL).unwrap();

        let hits = m.match_patterns("TestWidget", None);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].result.score, 0.4);
        // Regex uses search semantics
        assert_eq!(hits[1].result.score, 0.6);
    }

    #[test]
    fn test_invalid_patterns_register_nothing() {
        let m = PatternMatcher::new();
        assert!(matches!(
            m.add_pattern("(unclosed", PatternKind::Regex, Priority::NORMAL),
            Err(PatternError::InvalidRegex { .. })
        ));
        assert!(matches!(
            m.add_pattern("a[b", PatternKind::Glob, Priority::NORMAL),
            Err(PatternError::InvalidGlob { .. })
        ));
        assert!(matches!(
            m.add_pattern("x", PatternKind::Custom, Priority::NORMAL),
            Err(PatternError::MissingCustomFunction(_))
        ));
        assert!(matches!(
            m.add_pattern("x", PatternKind::Plugin("nope".into()), Priority::NORMAL),
            Err(PatternError::UnknownPlugin(_))
        ));
        assert_eq!(m.stats().total, 0);
    }

    #[test]
    fn test_best_match_ordering() {
        let m = PatternMatcher::new();
        m.add_pattern("Button", PatternKind::Glob, Priority::LOW).unwrap();
        let high_loose = m.add_pattern("B*", PatternKind::Glob, Priority::HIGH).unwrap();
        let high_tight = m.add_pattern("Butt*", PatternKind::Glob, Priority::HIGH).unwrap();

        let best = m.get_best_match("Button", None).unwrap();
        assert_eq!(best.index, high_tight);

        // Equal priority and score: earliest registration wins
        let dup = m.add_pattern("Butt*", PatternKind::Glob, Priority::HIGH).unwrap();
        assert!(dup > high_tight);
        assert_eq!(m.get_best_match("Button", None).unwrap().index, high_tight);
        assert!(m.remove_pattern(high_tight));
        assert_eq!(m.get_best_match("Button", None).unwrap().index, dup);
        assert!(m.remove_pattern(dup));
        assert_eq!(m.get_best_match("Button", None).unwrap().index, high_loose);
        assert!(m.get_best_match("Label", None).is_none());
    }

    #[test]
    fn test_cache_hits_match_recomputation() {
        let m = PatternMatcher::new();
        m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        m.add_pattern(r"\w+", PatternKind::Regex, Priority::LOW).unwrap();
        let w = WidgetSnapshot::new(1, "TestWidget");

        let first = m.match_patterns("TestWidget", Some(&w));
        let second = m.match_patterns("TestWidget", Some(&w));
        assert!(m.stats().cache_hits > 0);

        m.clear_cache();
        let fresh = m.match_patterns("TestWidget", Some(&w));
        let summary = |v: &[PatternMatch]| -> Vec<(usize, f64)> {
            v.iter().map(|p| (p.index, p.result.score)).collect()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(summary(&first), summary(&fresh));
    }

    #[test]
    fn test_removed_pattern_not_served_from_cache() {
        let m = PatternMatcher::new();
        let a = m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        let b = m.add_pattern("*Widget", PatternKind::Glob, Priority::NORMAL).unwrap();
        assert_eq!(m.match_patterns("TestWidget", None).len(), 2);

        assert!(m.remove_pattern(a));
        assert!(!m.remove_pattern(a));
        assert!(!m.remove_pattern(99));
        let hits = m.match_patterns("TestWidget", None);
        assert_eq!(m.stats().cache_hits, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, b);
    }

    #[test]
    fn test_adding_pattern_invalidates_cache() {
        let m = PatternMatcher::new();
        m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        assert_eq!(m.match_patterns("TestWidget", None).len(), 1);
        m.add_pattern("*Widget", PatternKind::Glob, Priority::NORMAL).unwrap();
        assert_eq!(m.match_patterns("TestWidget", None).len(), 2);
    }

    #[test]
    fn test_reparented_widget_is_rematched() {
        let m = PatternMatcher::new().with_builtin_plugins();
        m.add_pattern("Dialog > Button", PatternKind::Plugin("hierarchy".into()), Priority::HIGH)
            .unwrap();
        let in_dialog = WidgetSnapshot::new(1, "Button").with_ancestors(["Dialog"]);
        let in_panel = WidgetSnapshot::new(1, "Button").with_ancestors(["Panel"]);

        assert_eq!(m.match_patterns("Button", Some(&in_dialog)).len(), 1);
        assert!(m.match_patterns("Button", Some(&in_panel)).is_empty());
        assert_eq!(m.match_patterns("Button", Some(&in_dialog)).len(), 1);
        assert_eq!(m.stats().cache_hits, 0);

        // Without a widget the list depends on the target alone
        m.match_patterns("Button", None);
        m.match_patterns("Button", None);
        assert_eq!(m.stats().cache_hits, 1);
    }

    #[test]
    fn test_custom_patterns_see_current_widget() {
        let m = PatternMatcher::new();
        m.add_custom("wide", Priority::NORMAL, |_, widget| {
            widget.is_some_and(|w| w.attribute("width").ok().flatten().as_deref() == Some("wide"))
        })
        .unwrap();
        let narrow = WidgetSnapshot::new(2, "Panel").with_attribute("width", "narrow");
        let wide = WidgetSnapshot::new(2, "Panel").with_attribute("width", "wide");

        assert!(m.match_patterns("Panel", Some(&narrow)).is_empty());
        assert_eq!(m.match_patterns("Panel", Some(&wide)).len(), 1);
    }

    #[test]
    fn test_glob_memo_is_purged_on_removal() {
        let m = PatternMatcher::new();
        let a = m.add_pattern("Test*", PatternKind::Glob, Priority::NORMAL).unwrap();
        let b = m.add_pattern("Test*", PatternKind::Glob, Priority::LOW).unwrap();
        assert_eq!(m.globs.lock().len(), 1);

        assert!(m.remove_pattern(a));
        assert_eq!(m.globs.lock().len(), 0);
        // The remaining pattern keeps its own compiled glob
        assert_eq!(m.match_patterns("TestWidget", None)[0].index, b);
        assert_eq!(m.globs.lock().cap().get(), GLOB_CACHE_CAPACITY);
    }

    #[test]
    fn test_custom_patterns_contain_panics() {
        let m = PatternMatcher::new();
        m.add_custom("long", Priority::NORMAL, |target, _| target.len() > 5).unwrap();
        m.add_custom("boom", Priority::NORMAL, |_, _| panic!("custom matcher failed"))
            .unwrap();

        let hits = m.match_patterns("LongTarget", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rule.pattern, "long");
        assert_eq!(hits[0].result.score, 1.0);
    }

    #[test]
    fn test_builtin_plugins() {
        let m = PatternMatcher::new().with_builtin_plugins();
        assert!(m.has_matcher("hierarchy"));
        m.add_pattern("Dialog > Button", PatternKind::Plugin("hierarchy".into()), Priority::HIGH)
            .unwrap();
        m.add_pattern("Button:focused", PatternKind::Plugin("state".into()), Priority::NORMAL)
            .unwrap();
        assert!(matches!(
            m.add_pattern("Button:hovered", PatternKind::Plugin("state".into()), Priority::NORMAL),
            Err(PatternError::Rejected { .. })
        ));

        let in_dialog = WidgetSnapshot::new(1, "Button").with_ancestors(["Dialog"]);
        let hits = m.match_patterns("Button", Some(&in_dialog));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rule.kind, PatternKind::Plugin("hierarchy".into()));

        let focused = in_dialog.clone().focused(true);
        assert_eq!(m.match_patterns("Button", Some(&focused)).len(), 2);
    }

    struct Failing;

    impl Widget for Failing {
        fn key(&self) -> WidgetKey {
            WidgetKey(3)
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
            Err(WidgetError::Probe("handle closed".into()))
        }
    }

    #[test]
    fn test_failing_widget_never_fails_matching() {
        let m = PatternMatcher::new().with_builtin_plugins();
        m.add_pattern("*:enabled", PatternKind::Plugin("state".into()), Priority::NORMAL)
            .unwrap();
        m.add_pattern("Butt*", PatternKind::Glob, Priority::NORMAL).unwrap();

        let hits = m.match_patterns("Button", Some(&Failing));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rule.kind, PatternKind::Glob);
    }

    #[test]
    fn test_stats() {
        let m = PatternMatcher::with_capacity(8).with_builtin_plugins();
        m.add_pattern("a*", PatternKind::Glob, Priority::NORMAL).unwrap();
        m.add_pattern("b*", PatternKind::Glob, Priority::NORMAL).unwrap();
        let r = m.add_pattern("c+", PatternKind::Regex, Priority::NORMAL).unwrap();
        m.add_pattern("X", PatternKind::Plugin("hierarchy".into()), Priority::NORMAL)
            .unwrap();
        m.remove_pattern(r);

        let stats = m.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.by_kind.get("glob"), Some(&2));
        assert_eq!(stats.by_kind.get("regex"), None);
        assert_eq!(stats.by_kind.get("plugin:hierarchy"), Some(&1));
        assert_eq!(m.len(), 3);
    }
}
