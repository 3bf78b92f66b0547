//! Widget arena with stable handles
//!
//! The registry hands out [`WidgetHandle`]s for host widgets while holding only
//! weak references. A handle whose widget has been dropped stays valid as a
//! key but no longer resolves; callers check liveness explicitly instead of
//! relying on finalizers.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use crate::widget::Widget;

new_key_type! {
    /// Stable handle to a registered widget
    pub struct WidgetHandle;
}

/// Arena of weakly-held widgets
pub struct WidgetRegistry {
    slots: RwLock<SlotMap<WidgetHandle, Weak<dyn Widget>>>,
}

impl std::fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(SlotMap::with_key()),
        }
    }

    /// Register a widget, keeping only a weak reference
    pub fn register<W: Widget + 'static>(&self, widget: &Arc<W>) -> WidgetHandle {
        let weak: Weak<W> = Arc::downgrade(widget);
        self.insert(weak)
    }

    /// Register an already type-erased widget
    pub fn register_dyn(&self, widget: &Arc<dyn Widget>) -> WidgetHandle {
        self.insert(Arc::downgrade(widget))
    }

    fn insert(&self, weak: Weak<dyn Widget>) -> WidgetHandle {
        self.slots.write().insert(weak)
    }

    /// Borrow the widget behind a handle, if it is still alive
    pub fn get(&self, handle: WidgetHandle) -> Option<Arc<dyn Widget>> {
        self.slots.read().get(handle)?.upgrade()
    }

    pub fn is_alive(&self, handle: WidgetHandle) -> bool {
        self.slots
            .read()
            .get(handle)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Forget a handle; returns whether it was registered
    pub fn unregister(&self, handle: WidgetHandle) -> bool {
        self.slots.write().remove(handle).is_some()
    }

    /// Drop slots whose widget is gone; returns how many were removed
    pub fn prune(&self) -> usize {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|_, weak| weak.strong_count() > 0);
        let removed = before - slots.len();
        if removed > 0 {
            tracing::debug!(removed, "pruned dead widget handles");
        }
        removed
    }

    /// Number of registered handles (alive or not)
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles whose widget is still alive
    pub fn live_handles(&self) -> Vec<WidgetHandle> {
        self.slots
            .read()
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .map(|(handle, _)| handle)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::WidgetSnapshot;

    #[test]
    fn test_register_and_resolve() {
        let registry = WidgetRegistry::new();
        let widget = Arc::new(WidgetSnapshot::new(1, "Button"));
        let handle = registry.register(&widget);

        assert!(registry.is_alive(handle));
        let resolved = registry.get(handle).unwrap();
        assert_eq!(resolved.type_name(), "Button");
    }

    #[test]
    fn test_dropped_widget_is_dead() {
        let registry = WidgetRegistry::new();
        let widget = Arc::new(WidgetSnapshot::new(1, "Button"));
        let handle = registry.register(&widget);
        drop(widget);

        assert!(!registry.is_alive(handle));
        assert!(registry.get(handle).is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.prune(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = WidgetRegistry::new();
        let widget: Arc<dyn Widget> = Arc::new(WidgetSnapshot::new(2, "Label"));
        let handle = registry.register_dyn(&widget);

        assert_eq!(registry.live_handles(), vec![handle]);
        assert!(registry.unregister(handle));
        assert!(!registry.unregister(handle));
        assert!(registry.get(handle).is_none());
    }

    struct Toggle;

    impl Widget for Toggle {
        fn key(&self) -> crate::widget::WidgetKey {
            crate::widget::WidgetKey(5)
        }
        fn id(&self) -> Option<&str> {
            None
        }
        fn type_name(&self) -> &str {
            "Toggle"
        }
        fn classes(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_register_concrete_widget_type() {
        let registry = WidgetRegistry::new();
        let widget = Arc::new(Toggle);
        let handle = registry.register(&widget);

        assert_eq!(registry.get(handle).map(|w| w.type_name().to_string()), Some("Toggle".into()));
        assert_eq!(Arc::strong_count(&widget), 1);
        drop(widget);
        assert!(!registry.is_alive(handle));
    }
}
