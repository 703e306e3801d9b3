//! Registry of command handlers keyed by prefix.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::traits::CommandHandler;

/// Registry for command handlers
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Arc<dyn CommandHandler>>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handler under its prefix
    pub fn register(&self, handler: Arc<dyn CommandHandler>) {
        let mut handlers = self.handlers.write();
        handlers.insert(handler.prefix().to_string(), handler);
    }

    /// Get a handler by prefix
    pub fn get(&self, prefix: &str) -> Option<Arc<dyn CommandHandler>> {
        let handlers = self.handlers.read();
        handlers.get(prefix).cloned()
    }

    /// Check if a prefix is registered
    pub fn contains(&self, prefix: &str) -> bool {
        let handlers = self.handlers.read();
        handlers.contains_key(prefix)
    }

    /// List all registered prefixes
    pub fn list(&self) -> Vec<String> {
        let handlers = self.handlers.read();
        handlers.keys().cloned().collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
