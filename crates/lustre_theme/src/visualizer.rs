//! Human-readable explanations of a widget's mapping
//!
//! [`MappingVisualizer::explain`] re-runs matching and resolution for one
//! widget with provenance tracking, bypassing the mapping cache. Use it to
//! answer "why is this button blue?".

use std::fmt;

use lustre_core::{guard, LiveState, Widget, WidgetKey};
use lustre_pattern::PatternMatch;

use crate::engine::MappingEngine;
use crate::resolver::{self, ConflictStrategy, Resolution, RuleRef};

/// Identity and live state of the explained widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSummary {
    pub key: WidgetKey,
    pub type_name: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub live: LiveState,
}

impl WidgetSummary {
    /// Summarize a widget; a panicking accessor reports a placeholder
    fn of(widget: &dyn Widget) -> Self {
        Self {
            key: guard::contain("key", || widget.key()).unwrap_or_default(),
            type_name: guard::contain("type_name", || widget.type_name().to_string())
                .unwrap_or_else(|| "?".to_string()),
            id: guard::contain("id", || widget.id().map(str::to_string)).flatten(),
            classes: guard::contain("classes", || widget.classes()).unwrap_or_default(),
            live: LiveState::probe(widget),
        }
    }
}

impl fmt::Display for WidgetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        let flag = |state: Option<bool>, yes: &'static str, no: &'static str| match state {
            Some(true) => yes,
            Some(false) => no,
            None => "?",
        };
        write!(
            f,
            " (key {}) [{}, {}, {}]",
            self.key.raw(),
            flag(self.live.enabled, "enabled", "disabled"),
            flag(self.live.visible, "visible", "hidden"),
            flag(self.live.focused, "focused", "unfocused"),
        )
    }
}

/// How one active rule fared against the widget
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEvaluation {
    pub rule: RuleRef,
    /// Each selector part with its verdict
    pub parts: Vec<(String, bool)>,
    pub selector_matched: bool,
    /// `None` when the rule has no conditions or its selector failed
    pub conditions: Option<bool>,
}

impl RuleEvaluation {
    pub fn matched(&self) -> bool {
        self.selector_matched && self.conditions.unwrap_or(true)
    }
}

/// Full explanation of a widget's mapping
#[derive(Debug, Clone)]
pub struct Explanation {
    pub widget: WidgetSummary,
    pub rules: Vec<RuleEvaluation>,
    pub resolution: Resolution,
    /// Engine patterns matching the widget's type name
    pub patterns: Vec<PatternMatch>,
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.widget)?;
        writeln!(f, "strategy: {}", self.resolution.strategy)?;

        writeln!(f, "rules:")?;
        if self.rules.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for eval in &self.rules {
            let mark = if eval.matched() { "[x]" } else { "[ ]" };
            write!(f, "  {} {}", mark, eval.rule)?;
            let failed: Vec<&str> = eval
                .parts
                .iter()
                .filter(|(_, ok)| !ok)
                .map(|(part, _)| part.as_str())
                .collect();
            if !failed.is_empty() {
                write!(f, " failed: {}", failed.join(" "))?;
            } else if eval.conditions == Some(false) {
                write!(f, " failed: conditions")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "properties:")?;
        if self.resolution.properties.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for trace in &self.resolution.properties {
            writeln!(f, "  {} = {}  <- {}", trace.property, trace.value, trace.winner)?;
            for (loser, value) in trace.overridden.iter().rev() {
                writeln!(f, "      overrides {} = {}", loser, value)?;
            }
        }
        for skipped in &self.resolution.skipped {
            writeln!(f, "  skipped by strategy: {}", skipped)?;
        }

        if !self.patterns.is_empty() {
            writeln!(f, "patterns:")?;
            for m in &self.patterns {
                writeln!(
                    f,
                    "  #{} {} '{}' [priority {}, score {:.2}]",
                    m.index, m.rule.kind, m.rule.pattern, m.rule.priority, m.result.score
                )?;
            }
        }
        Ok(())
    }
}

/// Debug view over a [`MappingEngine`]
#[derive(Debug, Clone, Copy)]
pub struct MappingVisualizer<'e> {
    engine: &'e MappingEngine,
}

impl<'e> MappingVisualizer<'e> {
    pub fn new(engine: &'e MappingEngine) -> Self {
        Self { engine }
    }

    /// Explain `widget` under the engine's default strategy
    pub fn explain(&self, widget: &dyn Widget) -> Explanation {
        self.explain_with(widget, self.engine.config().default_strategy)
    }

    pub fn explain_with(&self, widget: &dyn Widget, strategy: ConflictStrategy) -> Explanation {
        let selectors = self.engine.selectors();
        let mut matching = Vec::new();
        let mut rules = Vec::new();

        for rule in self.engine.rules() {
            let parts: Vec<(String, bool)> = rule
                .selector
                .parts()
                .iter()
                .map(|part| (part.to_string(), selectors.matches_part(part, widget)))
                .collect();
            let selector_matched = parts.iter().all(|(_, ok)| *ok);
            let conditions = (selector_matched && rule.has_conditions())
                .then(|| rule.conditions_hold(widget));

            let eval = RuleEvaluation {
                rule: RuleRef::of(&rule),
                parts,
                selector_matched,
                conditions,
            };
            if eval.matched() {
                matching.push(rule.clone());
            }
            rules.push(eval);
        }

        let patterns = guard::contain("type_name", || widget.type_name().to_string())
            .map(|name| self.engine.patterns().match_patterns(&name, Some(widget)))
            .unwrap_or_default();

        Explanation {
            widget: WidgetSummary::of(widget),
            rules,
            resolution: resolver::resolve_traced(&matching, strategy),
            patterns,
        }
    }

    /// Render [`explain`](Self::explain) as text
    pub fn render(&self, widget: &dyn Widget) -> String {
        self.explain(widget).to_string()
    }
}
