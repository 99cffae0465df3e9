use std::{collections::HashMap, sync::Arc};

use super::plugin::TransportPlugin;

/// Registry of loaded transport plugins, keyed by plugin id.
#[derive(Default)]
pub struct TransportRegistry {
    plugins: HashMap<String, Arc<dyn TransportPlugin>>,
}

impl TransportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn TransportPlugin>) {
        self.plugins.insert(plugin.id().to_string(), plugin);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn TransportPlugin>> {
        self.plugins.get(id).map(Arc::clone)
    }

    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }
}
