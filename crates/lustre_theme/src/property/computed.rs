//! Properties derived from their owner

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Compute<O, T> = Arc<dyn Fn(&O) -> T + Send + Sync>;

/// A cached value computed from an owner `O`
///
/// Same caching contract as [`ThemeProperty`](super::ThemeProperty): the
/// first `get` computes and caches, later calls return the cached value until
/// [`invalidate_cache`](Self::invalidate_cache).
pub struct ComputedProperty<O, T> {
    name: String,
    compute: Compute<O, T>,
    slot: Mutex<(Option<T>, u64)>,
}

impl<O, T> fmt::Debug for ComputedProperty<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedProperty")
            .field("name", &self.name)
            .field("cached", &self.slot.lock().0.is_some())
            .finish()
    }
}

impl<O, T: Clone> ComputedProperty<O, T> {
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            compute: Arc::new(compute),
            slot: Mutex::new((None, 0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, owner: &O) -> T {
        let generation = {
            let slot = self.slot.lock();
            if let Some(value) = &slot.0 {
                return value.clone();
            }
            slot.1
        };

        let value = (self.compute)(owner);

        let mut slot = self.slot.lock();
        if slot.1 == generation {
            slot.0 = Some(value.clone());
        }
        value
    }

    pub fn invalidate_cache(&self) {
        let mut slot = self.slot.lock();
        slot.0 = None;
        slot.1 = slot.1.wrapping_add(1);
    }

    pub fn is_cached(&self) -> bool {
        self.slot.lock().0.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Window {
        width: u32,
        scale: f32,
    }

    #[test]
    fn test_computed_caches_until_invalidated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let physical = ComputedProperty::new("physical_width", move |w: &Window| {
            counter.fetch_add(1, Ordering::SeqCst);
            (w.width as f32 * w.scale) as u32
        });

        let window = Window { width: 800, scale: 2.0 };
        assert_eq!(physical.get(&window), 1600);
        assert_eq!(physical.get(&window), 1600);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(physical.is_cached());

        let resized = Window { width: 400, scale: 2.0 };
        assert_eq!(physical.get(&resized), 1600);
        physical.invalidate_cache();
        assert!(!physical.is_cached());
        assert_eq!(physical.get(&resized), 800);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
