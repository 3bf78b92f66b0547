//! Read-only widget adapter
//!
//! The engine never owns widgets. Hosts expose each widget through the narrow
//! [`Widget`] trait and lend it to the engine for the duration of a single
//! call. Live predicates (`is_enabled`, `is_visible`, `has_focus`) and
//! attribute lookups are fallible: a widget that has been torn down on the host
//! side, or whose toolkit call fails, reports a [`WidgetError`] and the engine
//! treats it as a non-match.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use thiserror::Error;

use crate::guard;

/// Stable identity of a widget, used for cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WidgetKey(pub u64);

impl WidgetKey {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for WidgetKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Failure while probing a widget
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    /// The underlying toolkit object no longer exists
    #[error("widget is no longer alive")]
    Gone,

    /// The adapter cannot answer this query
    #[error("widget does not support '{0}'")]
    Unsupported(&'static str),

    /// The toolkit call failed
    #[error("widget probe failed: {0}")]
    Probe(String),
}

/// Result type for widget probes
pub type WidgetResult<T> = std::result::Result<T, WidgetError>;

/// Read-only capability surface a host toolkit provides per widget
pub trait Widget: Send + Sync {
    /// Stable identity (must not change for the lifetime of the widget)
    fn key(&self) -> WidgetKey;

    /// Element id matched by `#id` selectors
    fn id(&self) -> Option<&str>;

    /// Type name matched by type selectors (e.g. `Button`)
    fn type_name(&self) -> &str;

    /// Style classes matched by `.class` selectors
    fn classes(&self) -> Vec<String>;

    fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Attribute lookup for `[attr]` selectors
    fn attribute(&self, _key: &str) -> WidgetResult<Option<String>> {
        Ok(None)
    }

    fn is_enabled(&self) -> WidgetResult<bool> {
        Ok(true)
    }

    fn is_visible(&self) -> WidgetResult<bool> {
        Ok(true)
    }

    fn has_focus(&self) -> WidgetResult<bool> {
        Ok(false)
    }

    /// Type names of the widget's ancestors, nearest parent first
    fn ancestors(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Snapshot of a widget's live predicates
///
/// `None` means the probe failed (error or panic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LiveState {
    pub enabled: Option<bool>,
    pub visible: Option<bool>,
    pub focused: Option<bool>,
}

impl LiveState {
    /// Probe all live predicates, containing faults
    pub fn probe(widget: &dyn Widget) -> Self {
        Self {
            enabled: guard::try_probe("is_enabled", || widget.is_enabled()),
            visible: guard::try_probe("is_visible", || widget.is_visible()),
            focused: guard::try_probe("has_focus", || widget.has_focus()),
        }
    }
}

/// Cheap 64-bit fingerprint of a widget's observable state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetSignature(u64);

impl WidgetSignature {
    /// Signature used when no widget takes part in a match
    pub const NONE: WidgetSignature = WidgetSignature(0);

    /// Fingerprint of identity, structure and live state
    pub fn of(widget: &dyn Widget) -> Self {
        let mut hasher = FxHasher::default();
        hash_structure(widget, &mut hasher);
        LiveState::probe(widget).hash(&mut hasher);
        Self(hasher.finish() | 1)
    }

    /// Fingerprint of identity and structure only (id, type, classes)
    pub fn structural(widget: &dyn Widget) -> Self {
        let mut hasher = FxHasher::default();
        hash_structure(widget, &mut hasher);
        Self(hasher.finish() | 1)
    }

    /// Fold the current values of the attributes named in `keys` into the signature
    ///
    /// An attribute probe that fails hashes as its own value.
    pub fn with_attributes<S: AsRef<str>>(self, widget: &dyn Widget, keys: &[S]) -> Self {
        if keys.is_empty() {
            return self;
        }
        let mut hasher = FxHasher::default();
        self.0.hash(&mut hasher);
        for key in keys {
            let key = key.as_ref();
            key.hash(&mut hasher);
            guard::try_probe("attribute", || widget.attribute(key)).hash(&mut hasher);
        }
        Self(hasher.finish() | 1)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

fn hash_structure(widget: &dyn Widget, hasher: &mut FxHasher) {
    widget.key().hash(hasher);
    widget.id().hash(hasher);
    widget.type_name().hash(hasher);
    let mut classes = widget.classes();
    classes.sort_unstable();
    classes.hash(hasher);
}

/// Plain-data widget
///
/// Useful for hosts that snapshot their widgets before resolving a theme, and
/// for tests.
#[derive(Debug, Clone, Default)]
pub struct WidgetSnapshot {
    pub key: WidgetKey,
    pub id: Option<String>,
    pub type_name: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub enabled: bool,
    pub visible: bool,
    pub focused: bool,
    pub ancestors: Vec<String>,
}

impl WidgetSnapshot {
    /// Create an enabled, visible, unfocused widget
    pub fn new(key: u64, type_name: impl Into<String>) -> Self {
        Self {
            key: WidgetKey(key),
            type_name: type_name.into(),
            enabled: true,
            visible: true,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Set ancestor type names, nearest parent first
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl Widget for WidgetSnapshot {
    fn key(&self) -> WidgetKey {
        self.key
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn classes(&self) -> Vec<String> {
        self.classes.clone()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, key: &str) -> WidgetResult<Option<String>> {
        Ok(self
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn is_enabled(&self) -> WidgetResult<bool> {
        Ok(self.enabled)
    }

    fn is_visible(&self) -> WidgetResult<bool> {
        Ok(self.visible)
    }

    fn has_focus(&self) -> WidgetResult<bool> {
        Ok(self.focused)
    }

    fn ancestors(&self) -> Vec<String> {
        self.ancestors.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Widget for Broken {
        fn key(&self) -> WidgetKey {
            WidgetKey(9)
        }
        fn id(&self) -> Option<&str> {
            None
        }
        fn type_name(&self) -> &str {
            "Broken"
        }
        fn classes(&self) -> Vec<String> {
            Vec::new()
        }
        fn is_enabled(&self) -> WidgetResult<bool> {
            Err(WidgetError::Gone)
        }
        fn has_focus(&self) -> WidgetResult<bool> {
            panic!("focus probe exploded")
        }
    }

    #[test]
    fn test_snapshot_probes() {
        let w = WidgetSnapshot::new(1, "Button")
            .with_id("ok")
            .with_class("primary")
            .with_attribute("role", "confirm")
            .focused(true);

        assert_eq!(w.id(), Some("ok"));
        assert!(w.has_class("primary"));
        assert!(!w.has_class("secondary"));
        assert_eq!(w.attribute("role"), Ok(Some("confirm".to_string())));
        assert_eq!(w.attribute("missing"), Ok(None));
        assert_eq!(w.has_focus(), Ok(true));
    }

    #[test]
    fn test_live_state_contains_faults() {
        let state = LiveState::probe(&Broken);
        assert_eq!(state.enabled, None);
        assert_eq!(state.visible, Some(true));
        assert_eq!(state.focused, None);
    }

    #[test]
    fn test_signature_tracks_live_state() {
        let a = WidgetSnapshot::new(1, "Button");
        let b = a.clone().focused(true);

        assert_ne!(WidgetSignature::of(&a), WidgetSignature::of(&b));
        assert_eq!(WidgetSignature::structural(&a), WidgetSignature::structural(&b));
    }

    #[test]
    fn test_signature_ignores_class_order() {
        let a = WidgetSnapshot::new(1, "Button").with_class("x").with_class("y");
        let b = WidgetSnapshot::new(1, "Button").with_class("y").with_class("x");
        assert_eq!(WidgetSignature::of(&a), WidgetSignature::of(&b));
        assert_ne!(WidgetSignature::of(&a), WidgetSignature::NONE);
    }

    #[test]
    fn test_signature_with_attributes() {
        let ok = WidgetSnapshot::new(1, "Button").with_attribute("role", "ok");
        let cancel = WidgetSnapshot::new(1, "Button").with_attribute("role", "cancel");
        let base = WidgetSignature::of(&ok);
        assert_eq!(base, WidgetSignature::of(&cancel));

        let none: &[&str] = &[];
        assert_eq!(base.with_attributes(&ok, none), base);
        assert_ne!(
            base.with_attributes(&ok, &["role"]),
            WidgetSignature::of(&cancel).with_attributes(&cancel, &["role"])
        );
        assert_eq!(
            base.with_attributes(&ok, &["size"]),
            WidgetSignature::of(&cancel).with_attributes(&cancel, &["size"])
        );
    }
}
