//! Optional process-wide default engine
//!
//! Engines are normally constructed and passed by reference. Hosts that want
//! one shared engine can install it here.

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::MappingEngine;

static DEFAULT_ENGINE: LazyLock<RwLock<Option<Arc<MappingEngine>>>> =
    LazyLock::new(|| RwLock::new(None));

/// Install `engine` as the process default, returning the previous one
pub fn install_default_engine(engine: Arc<MappingEngine>) -> Option<Arc<MappingEngine>> {
    debug!("installed default mapping engine");
    DEFAULT_ENGINE.write().replace(engine)
}

/// The installed default engine, if any
pub fn default_engine() -> Option<Arc<MappingEngine>> {
    DEFAULT_ENGINE.read().clone()
}

/// Remove the default engine, returning it
pub fn uninstall_default_engine() -> Option<Arc<MappingEngine>> {
    DEFAULT_ENGINE.write().take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_core::properties;

    #[test]
    fn test_install_and_uninstall() {
        let engine = Arc::new(MappingEngine::new());
        engine.add_rule("Button", properties! { "color" => "red" }).unwrap();

        install_default_engine(engine.clone());
        let installed = default_engine().unwrap();
        assert!(Arc::ptr_eq(&installed, &engine));

        let replaced = install_default_engine(Arc::new(MappingEngine::new())).unwrap();
        assert!(Arc::ptr_eq(&replaced, &engine));

        assert!(uninstall_default_engine().is_some());
        assert!(default_engine().is_none());
    }
}
