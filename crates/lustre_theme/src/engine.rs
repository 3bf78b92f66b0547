//! The mapping engine
//!
//! [`MappingEngine`] owns the rule set and answers "which properties apply to
//! this widget?".
//!
//! # Concurrency
//!
//! Rules are held as an immutable [`RuleSet`] snapshot behind a lock. A
//! mutation builds the next snapshot and swaps it in, so a concurrent
//! `get_mapping` sees either the whole old set or the whole new one. Cached
//! mappings are keyed by the snapshot version, so an entry computed against an
//! old snapshot is never served for a new one.
//!
//! # Caching
//!
//! Mappings are cached per `(widget key, widget signature, rule-set version,
//! strategy)`. The signature covers the widget's id, type, classes, live
//! state and the values of every attribute a rule selector reads, so an
//! attribute change misses the mapping cache. The selector matcher's own
//! verdicts are not keyed by attribute values: after changing a widget's
//! attributes, call `selectors().clear_cache()` (or [`MappingEngine::clear_caches`]).
//! A mapping that consulted a rule condition is not cached, since a condition
//! may depend on anything.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use lustre_core::{
    guard, CacheStats, Priority, PropertyMap, PropertyValue, Widget, WidgetHandle, WidgetKey,
    WidgetRegistry, WidgetResult, WidgetSignature,
};
use lustre_pattern::{PatternMatcher, PatternStats};
use lustre_selector::{Selector, SelectorMatcher};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::{MappingError, Result};
use crate::resolver::{self, ConflictStrategy, Resolution};
use crate::rule::{Condition, MappingRule, RuleSet};

/// Check run against every rule before it is registered
pub type RuleValidator = Arc<dyn Fn(&MappingRule) -> std::result::Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MappingKey {
    widget: WidgetKey,
    signature: WidgetSignature,
    version: u64,
    strategy: ConflictStrategy,
}

/// Snapshot of engine state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    /// Rules ever added, including removed ones
    pub total_rules: usize,
    pub active_rules: usize,
    pub version: u64,
    pub mappings: CacheStats,
    /// Mappings computed without caching because a condition was consulted
    pub uncached_mappings: u64,
    pub selectors: CacheStats,
    pub patterns: PatternStats,
}

/// Resolves theme properties for widgets from registered rules
pub struct MappingEngine {
    config: EngineConfig,
    rules: RwLock<Arc<RuleSet>>,
    validators: RwLock<Vec<RuleValidator>>,
    selectors: SelectorMatcher,
    patterns: PatternMatcher,
    cache: Mutex<LruCache<MappingKey, Arc<PropertyMap>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    uncached: AtomicU64,
}

impl std::fmt::Debug for MappingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules = self.snapshot();
        f.debug_struct("MappingEngine")
            .field("rules", &rules.len())
            .field("active", &rules.active_len())
            .field("version", &rules.version())
            .field("strategy", &self.config.default_strategy)
            .finish()
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            selectors: SelectorMatcher::with_capacity(config.selector_cache_capacity),
            patterns: PatternMatcher::with_capacity(config.pattern_cache_capacity)
                .with_builtin_plugins(),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(config.mapping_cache_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            rules: RwLock::new(Arc::new(RuleSet::default())),
            validators: RwLock::new(Vec::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            uncached: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The selector matcher used for rule selectors
    pub fn selectors(&self) -> &SelectorMatcher {
        &self.selectors
    }

    /// Pattern matcher sized from the engine config, with the built-in plugins
    pub fn patterns(&self) -> &PatternMatcher {
        &self.patterns
    }

    /// Current rule snapshot
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules.read().clone()
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// Register a rule with normal priority, no conditions and no name
    pub fn add_rule(&self, selector: &str, properties: PropertyMap) -> Result<usize> {
        self.rule(selector).properties(properties).add()
    }

    /// Start building a rule for `selector`
    pub fn rule(&self, selector: impl Into<String>) -> RuleBuilder<'_> {
        RuleBuilder {
            engine: self,
            selector: selector.into(),
            properties: PropertyMap::new(),
            priority: Priority::NORMAL,
            conditions: Vec::new(),
            name: None,
        }
    }

    fn insert(&self, builder: RuleBuilder<'_>) -> Result<usize> {
        let selector = Selector::parse(&builder.selector)?;
        if builder.properties.is_empty() {
            return Err(MappingError::EmptyProperties(builder.selector));
        }

        let mut rule = MappingRule {
            selector,
            properties: builder.properties,
            priority: builder.priority,
            conditions: builder.conditions,
            name: builder.name,
            index: self.rules.read().len(),
        };
        self.check(&rule)?;

        let index = {
            let mut rules = self.rules.write();
            let next = Arc::make_mut(&mut *rules);
            rule.index = next.rules.len();
            let index = rule.index;
            next.push(Arc::new(rule));
            next.version += 1;
            index
        };
        self.invalidate_cache();
        debug!(index, selector = %builder.selector, "added mapping rule");
        Ok(index)
    }

    fn check(&self, rule: &MappingRule) -> Result<()> {
        let validators = self.validators.read().clone();
        for validator in validators {
            let verdict = guard::contain("rule validator", || validator(rule))
                .unwrap_or_else(|| Err("validator panicked".to_string()));
            if let Err(reason) = verdict {
                debug!(selector = rule.selector.source(), %reason, "rule rejected");
                return Err(MappingError::Rejected {
                    selector: rule.selector.source().to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Soft-delete a rule; false for unknown or already removed indices
    pub fn remove_rule(&self, index: usize) -> bool {
        let removed = {
            let mut rules = self.rules.write();
            if rules.get(index).is_none() {
                return false;
            }
            let next = Arc::make_mut(&mut *rules);
            next.version += 1;
            next.rules[index].take()
        };
        self.invalidate_cache();
        debug!(index, "removed mapping rule");
        removed.is_some()
    }

    /// Every subsequent `add_rule` must satisfy `validator`
    pub fn add_validator<F>(&self, validator: F)
    where
        F: Fn(&MappingRule) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validators.write().push(Arc::new(validator));
    }

    /// Register a matcher for a custom pseudo-class used in rule selectors
    pub fn register_pseudo<F>(&self, name: impl Into<String>, matcher: F)
    where
        F: Fn(&dyn Widget) -> WidgetResult<bool> + Send + Sync + 'static,
    {
        self.selectors.register_pseudo(name, matcher);
        self.invalidate_cache();
    }

    /// Active rules in registration order
    pub fn rules(&self) -> Vec<Arc<MappingRule>> {
        self.snapshot().active().cloned().collect()
    }

    pub fn rule_at(&self, index: usize) -> Option<Arc<MappingRule>> {
        self.snapshot().get(index).cloned()
    }

    /// Rules ever added, including removed ones
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    pub fn active_rule_count(&self) -> usize {
        self.rules.read().active_len()
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    /// Properties for `widget` under the default strategy
    ///
    /// Never fails; the worst case is an empty map.
    pub fn get_mapping(&self, widget: &dyn Widget) -> PropertyMap {
        self.get_mapping_with(widget, self.config.default_strategy)
    }

    /// Properties for `widget` under `strategy`
    pub fn get_mapping_with(&self, widget: &dyn Widget, strategy: ConflictStrategy) -> PropertyMap {
        let started = Instant::now();
        let rules = self.snapshot();

        let key = guard::contain("widget signature", || MappingKey {
            widget: widget.key(),
            signature: WidgetSignature::of(widget).with_attributes(widget, rules.attribute_keys()),
            version: rules.version(),
            strategy,
        });

        if let Some(key) = &key {
            let cached = self.cache.lock().get(key).cloned();
            if let Some(mapping) = cached {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return mapping.as_ref().clone();
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let (matching, consulted) = self.collect(&rules, widget);
        let mapping = resolver::resolve(&matching, strategy);

        match key {
            Some(key) if !consulted => {
                self.cache.lock().put(key, Arc::new(mapping.clone()));
            }
            _ => {
                self.uncached.fetch_add(1, Ordering::Relaxed);
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.config.slow_mapping_threshold() {
            debug!(
                elapsed_us = elapsed.as_micros() as u64,
                rules = rules.active_len(),
                matched = matching.len(),
                "slow theme mapping"
            );
        } else {
            trace!(matched = matching.len(), properties = mapping.len(), "theme mapping computed");
        }
        mapping
    }

    /// Resolve through the widget arena; a dead handle yields an empty map
    pub fn get_mapping_for(&self, registry: &WidgetRegistry, handle: WidgetHandle) -> PropertyMap {
        match registry.get(handle) {
            Some(widget) => self.get_mapping(widget.as_ref()),
            None => {
                debug!(?handle, "widget is gone, returning empty mapping");
                PropertyMap::new()
            }
        }
    }

    /// Look up one resolved property for `widget`
    pub fn get_property(&self, widget: &dyn Widget, property: &str) -> Option<PropertyValue> {
        self.get_mapping(widget).shift_remove(property)
    }

    /// Active rules whose selector and conditions hold for `widget`
    pub fn matching_rules(&self, widget: &dyn Widget) -> Vec<Arc<MappingRule>> {
        self.collect(&self.snapshot(), widget).0
    }

    /// Resolve with provenance, bypassing the mapping cache
    pub fn resolve_traced(&self, widget: &dyn Widget, strategy: ConflictStrategy) -> Resolution {
        let matching = self.matching_rules(widget);
        resolver::resolve_traced(&matching, strategy)
    }

    /// Matching rules, plus whether any rule condition was consulted
    fn collect(&self, rules: &RuleSet, widget: &dyn Widget) -> (Vec<Arc<MappingRule>>, bool) {
        let mut consulted = false;
        let matching = rules
            .active()
            .filter(|rule| {
                if !self.selectors.matches(&rule.selector, widget) {
                    return false;
                }
                if rule.has_conditions() {
                    consulted = true;
                    return rule.conditions_hold(widget);
                }
                true
            })
            .cloned()
            .collect();
        (matching, consulted)
    }

    // =========================================================================
    // Composition
    // =========================================================================

    /// A new engine with `self`'s active rules followed by `other`'s
    ///
    /// Validators and custom pseudo-classes of both engines carry over;
    /// `self`'s config applies. Indices are reassigned in the new engine.
    pub fn compose_with(&self, other: &MappingEngine) -> MappingEngine {
        let composed = MappingEngine::with_config(self.config.clone());

        {
            let mut next = RuleSet::default();
            for rule in self.snapshot().active().chain(other.snapshot().active()) {
                let mut copy = MappingRule::clone(rule);
                copy.index = next.rules.len();
                next.push(Arc::new(copy));
            }
            next.version = 1;
            *composed.rules.write() = Arc::new(next);
        }

        {
            let mut validators = composed.validators.write();
            validators.extend(self.validators.read().iter().cloned());
            validators.extend(other.validators.read().iter().cloned());
        }

        for (name, matcher) in other.selectors.pseudo_matchers() {
            composed.selectors.register_pseudo_matcher(name, matcher);
        }
        for (name, matcher) in self.selectors.pseudo_matchers() {
            composed.selectors.register_pseudo_matcher(name, matcher);
        }

        debug!(rules = composed.rule_count(), "composed mapping engines");
        composed
    }

    // =========================================================================
    // Caches
    // =========================================================================

    /// Drop every cached mapping
    pub fn invalidate_cache(&self) {
        self.cache.lock().clear();
    }

    /// Drop cached mappings, selector verdicts and pattern matches
    pub fn clear_caches(&self) {
        self.invalidate_cache();
        self.selectors.clear_cache();
        self.patterns.clear_cache();
    }

    pub fn stats(&self) -> EngineStats {
        let rules = self.snapshot();
        let (entries, capacity) = {
            let cache = self.cache.lock();
            (cache.len(), cache.cap().get())
        };
        EngineStats {
            total_rules: rules.len(),
            active_rules: rules.active_len(),
            version: rules.version(),
            mappings: CacheStats {
                hits: self.hits.load(Ordering::Relaxed),
                misses: self.misses.load(Ordering::Relaxed),
                entries,
                capacity,
            },
            uncached_mappings: self.uncached.load(Ordering::Relaxed),
            selectors: self.selectors.stats(),
            patterns: self.patterns.stats(),
        }
    }
}

/// Builder returned by [`MappingEngine::rule`]
#[must_use = "a rule is only registered by calling `add`"]
pub struct RuleBuilder<'e> {
    engine: &'e MappingEngine,
    selector: String,
    properties: PropertyMap,
    priority: Priority,
    conditions: Vec<Condition>,
    name: Option<String>,
}

impl RuleBuilder<'_> {
    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Add a runtime condition; every condition must hold
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&dyn Widget) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Arc::new(condition));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties(mut self, properties: PropertyMap) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Validate and register the rule, returning its index
    pub fn add(self) -> Result<usize> {
        self.engine.insert(self)
    }
}
