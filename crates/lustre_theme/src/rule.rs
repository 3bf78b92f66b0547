//! Mapping rules and rule-set snapshots

use std::fmt;
use std::sync::Arc;

use lustre_core::{guard, Priority, PropertyMap, Widget};
use lustre_selector::{PartKind, Selector, Specificity};

/// Runtime predicate attached to a rule
///
/// A condition that panics evaluates to `false`.
pub type Condition = Arc<dyn Fn(&dyn Widget) -> bool + Send + Sync>;

/// A registered style rule
///
/// Immutable once added. `index` is the registration index and stays stable
/// after other rules are removed.
#[derive(Clone)]
pub struct MappingRule {
    pub selector: Selector,
    pub properties: PropertyMap,
    pub priority: Priority,
    pub conditions: Vec<Condition>,
    pub name: Option<String>,
    pub index: usize,
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRule")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("selector", &self.selector.source())
            .field("priority", &self.priority)
            .field("conditions", &self.conditions.len())
            .field("properties", &self.properties)
            .finish()
    }
}

impl MappingRule {
    pub fn specificity(&self) -> Specificity {
        self.selector.specificity()
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Whether every condition holds; panicking conditions count as false
    pub fn conditions_hold(&self, widget: &dyn Widget) -> bool {
        self.conditions
            .iter()
            .all(|condition| guard::contain(self.label(), || condition(widget)).unwrap_or(false))
    }

    /// Name if set, otherwise the selector text
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.selector.source())
    }
}

/// Immutable snapshot of every rule ever added, in registration order
///
/// Removed rules leave a `None` so indices stay stable. Each mutation produces
/// a new snapshot with a higher version.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub(crate) rules: Vec<Option<Arc<MappingRule>>>,
    pub(crate) version: u64,
    /// Sorted attribute names read by any rule selector ever added
    attributes: Vec<String>,
}

impl RuleSet {
    /// Append a rule, recording the attributes its selector reads
    pub(crate) fn push(&mut self, rule: Arc<MappingRule>) {
        for part in rule.selector.parts() {
            if part.kind == PartKind::Attribute {
                if let Err(at) = self.attributes.binary_search(&part.value) {
                    self.attributes.insert(at, part.value.clone());
                }
            }
        }
        self.rules.push(Some(rule));
    }

    /// Attribute names whose values can change a mapping
    ///
    /// Names stay listed after their rules are removed.
    pub fn attribute_keys(&self) -> &[String] {
        &self.attributes
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of rules ever added, including removed ones
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<MappingRule>> {
        self.rules.get(index)?.as_ref()
    }

    /// Active rules in registration order
    pub fn active(&self) -> impl Iterator<Item = &Arc<MappingRule>> {
        self.rules.iter().flatten()
    }

    pub fn active_len(&self) -> usize {
        self.active().count()
    }
}
