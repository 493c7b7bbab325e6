//! Name → backend registry, built once at startup and handed to the manager.

use super::{MemoryProvider, Provider};
use crate::error::{Result, SessionError};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Name under which the in-memory backend is registered
pub const MEMORY_PROVIDER: &str = "memory";

#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the in-memory backend available as `"memory"`.
    pub fn with_memory(max_entries: Option<NonZeroUsize>) -> Self {
        let provider = match max_entries {
            Some(cap) => MemoryProvider::with_capacity(cap),
            None => MemoryProvider::new(),
        };
        let mut registry = Self::new();
        registry
            .providers
            .insert(MEMORY_PROVIDER.to_string(), Arc::new(provider));
        registry
    }

    /// Associate `name` with `provider`.
    ///
    /// Registering a name twice is a configuration error; callers are
    /// expected to abort startup on it rather than continue with whichever
    /// backend won.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(SessionError::Config(
                "session provider name must not be empty".to_string(),
            ));
        }
        if self.providers.contains_key(&name) {
            return Err(SessionError::DuplicateProvider(name));
        }
        tracing::debug!("Registered session provider '{}'", name);
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownProvider(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
