//! Typed, cached theme properties
//!
//! A [`ThemeProperty`] is bound to a path such as `"window.background"`. Reads
//! resolve through a [`PropertySource`] in a fixed order:
//!
//! 1. a value stored with [`ThemeProperty::set`]
//! 2. the primary path, coerced and validated
//! 3. the inherited path, if configured, coerced and validated
//! 4. the default
//!
//! A value that fails coercion or validation counts as absent. The result is
//! cached until [`ThemeProperty::invalidate_cache`], `set` or `clear`.
//!
//! A property caches one value, so it belongs to one owner. Invalidate it when
//! that owner's source changes.

use std::fmt;
use std::sync::Arc;

use lustre_core::{PropertyMap, PropertyValue};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::ValidationError;
use crate::property::coerce::{coerce, FromPropertyValue};
use crate::property::validate::Constraints;

/// Where resolved values come from
pub trait PropertySource {
    fn lookup(&self, path: &str) -> Option<PropertyValue>;
}

impl PropertySource for PropertyMap {
    fn lookup(&self, path: &str) -> Option<PropertyValue> {
        self.get(path).cloned()
    }
}

impl<F> PropertySource for F
where
    F: Fn(&str) -> Option<PropertyValue>,
{
    fn lookup(&self, path: &str) -> Option<PropertyValue> {
        self(path)
    }
}

/// Listener called with `(path, old, new)` after a successful `set`
pub type ChangeListener<T> = Arc<dyn Fn(&str, Option<&T>, &T) + Send + Sync>;

struct Slot<T> {
    explicit: Option<T>,
    cached: Option<T>,
    /// Bumped on every invalidation so a racing `get` cannot store a stale value
    generation: u64,
}

impl<T> Slot<T> {
    fn invalidate(&mut self) {
        self.cached = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// A typed accessor for one resolved theme value
pub struct ThemeProperty<T> {
    path: String,
    inherit: Option<String>,
    default: T,
    constraints: Constraints<T>,
    slot: Mutex<Slot<T>>,
    listeners: RwLock<Vec<ChangeListener<T>>>,
}

impl<T: fmt::Debug> fmt::Debug for ThemeProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeProperty")
            .field("path", &self.path)
            .field("inherit", &self.inherit)
            .field("default", &self.default)
            .finish()
    }
}

impl<T> ThemeProperty<T>
where
    T: FromPropertyValue + Clone + Send + 'static,
{
    pub fn new(path: impl Into<String>, default: T) -> Self {
        Self {
            path: path.into(),
            inherit: None,
            default,
            constraints: Constraints::new(),
            slot: Mutex::new(Slot {
                explicit: None,
                cached: None,
                generation: 0,
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Fall back to `path` when the primary path resolves to nothing
    pub fn inherit_from(mut self, path: impl Into<String>) -> Self {
        self.inherit = Some(path.into());
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints<T>) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Current value, resolving through `source` on a cache miss
    pub fn get(&self, source: &dyn PropertySource) -> T {
        let generation = {
            let slot = self.slot.lock();
            if let Some(value) = slot.explicit.as_ref().or(slot.cached.as_ref()) {
                return value.clone();
            }
            slot.generation
        };

        let value = self.resolve(source);

        let mut slot = self.slot.lock();
        if slot.generation == generation {
            slot.cached = Some(value.clone());
        }
        value
    }

    fn resolve(&self, source: &dyn PropertySource) -> T {
        if let Some(value) = self.read_path(source, &self.path) {
            return value;
        }
        if let Some(inherit) = &self.inherit {
            if let Some(value) = self.read_path(source, inherit) {
                return value;
            }
        }
        self.default.clone()
    }

    fn read_path(&self, source: &dyn PropertySource, path: &str) -> Option<T> {
        let raw = source.lookup(path)?;
        match self.accept(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(property = %self.path, source_path = path, error = %err, "ignoring unusable theme value");
                None
            }
        }
    }

    fn accept(&self, raw: &PropertyValue) -> Result<T, ValidationError> {
        let value = coerce::<T>(&self.path, raw)?;
        self.constraints.validate(&self.path, &value)?;
        Ok(value)
    }

    /// Store an explicit value that takes precedence over any source
    ///
    /// On error nothing changes.
    pub fn set(&self, value: impl Into<PropertyValue>) -> Result<(), ValidationError> {
        let value = self.accept(&value.into())?;
        let previous = {
            let mut slot = self.slot.lock();
            let previous = slot.explicit.take().or_else(|| slot.cached.take());
            slot.explicit = Some(value.clone());
            slot.invalidate();
            previous
        };
        debug!(property = %self.path, "theme property set");

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(&self.path, previous.as_ref(), &value);
        }
        Ok(())
    }

    /// Drop a value stored with [`set`](Self::set)
    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        slot.explicit = None;
        slot.invalidate();
    }

    /// Force the next `get` to resolve again
    pub fn invalidate_cache(&self) {
        self.slot.lock().invalidate();
    }

    /// Whether a resolved value is cached
    pub fn is_cached(&self) -> bool {
        self.slot.lock().cached.is_some()
    }

    /// Whether an explicit value is stored
    pub fn is_set(&self) -> bool {
        self.slot.lock().explicit.is_some()
    }

    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&str, Option<&T>, &T) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::properties;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_coerces_and_caches() {
        let padding = ThemeProperty::new("button.padding", 0_i64);
        let source = properties! { "button.padding" => "12px" };

        assert!(!padding.is_cached());
        assert_eq!(padding.get(&source), 12);
        assert!(padding.is_cached());

        // Cached: a different source is not consulted
        let other = properties! { "button.padding" => 99 };
        assert_eq!(padding.get(&other), 12);
        padding.invalidate_cache();
        assert_eq!(padding.get(&other), 99);
    }

    #[test]
    fn test_inheritance_then_default() {
        let fg = ThemeProperty::new("button.foreground", "black".to_string()).inherit_from("window.foreground");

        let inherited = properties! { "window.foreground" => "#eee" };
        assert_eq!(fg.get(&inherited), "#eee");

        fg.invalidate_cache();
        assert_eq!(fg.get(&PropertyMap::new()), "black");
    }

    #[test]
    fn test_invalid_primary_falls_through() {
        let opacity = ThemeProperty::new("opacity", 1.0_f64)
            .inherit_from("base.opacity")
            .with_constraints(Constraints::new().range(0.0, 1.0));
        let source = properties! { "opacity" => 4.5, "base.opacity" => "0.5" };
        assert_eq!(opacity.get(&source), 0.5);

        opacity.invalidate_cache();
        let garbage = properties! { "opacity" => "thick" };
        assert_eq!(opacity.get(&garbage), 1.0);
    }

    #[test]
    fn test_set_validates_and_overrides() {
        let size = ThemeProperty::new("font.size", 12_i64).with_constraints(Constraints::new().range(6, 72));
        let source = properties! { "font.size" => 14 };

        size.set("18px").unwrap();
        assert_eq!(size.get(&source), 18);

        assert!(matches!(size.set(200), Err(ValidationError::Constraint { .. })));
        assert!(matches!(size.set("huge"), Err(ValidationError::Coercion { .. })));
        // Prior value preserved
        assert_eq!(size.get(&source), 18);

        size.clear();
        assert!(!size.is_set());
        assert_eq!(size.get(&source), 14);
    }

    #[test]
    fn test_change_listeners() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let enabled = ThemeProperty::new("animations", true);
        enabled.on_change(move |path, old, new| {
            assert_eq!(path, "animations");
            assert_eq!(old, None);
            assert!(!*new);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        enabled.set("off").unwrap();
        assert!(enabled.set("maybe").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closure_source() {
        let radius = ThemeProperty::new("radius", 0_u32);
        let source = |path: &str| (path == "radius").then(|| PropertyValue::from("4px"));
        assert_eq!(radius.get(&source), 4);
    }
}
