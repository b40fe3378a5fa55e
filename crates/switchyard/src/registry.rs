//! Handler registry: the single place new capability is added.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use crate::error::{CoreError, CoreResult};
use crate::handler::{Handler, HandlerDescriptor};

struct Entry {
    descriptor: HandlerDescriptor,
    handler: Arc<dyn Handler>,
}

#[derive(Default)]
struct RegistryInner {
    /// Registration order.
    entries: Vec<Entry>,
    /// Lowercased name -> index into `entries`.
    index: HashMap<String, usize>,
}

/// Registry of handlers keyed by unique, case-insensitive name.
///
/// Read-mostly: lookups take a shared lock, registration a short exclusive one.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Fails with [`CoreError::DuplicateName`] if the name is
    /// taken, leaving the registry unchanged.
    pub fn register(&self, handler: Arc<dyn Handler>) -> CoreResult<HandlerDescriptor> {
        let descriptor = HandlerDescriptor::of(handler.as_ref())?;
        let key = descriptor.name.to_lowercase();

        let mut inner = self
            .inner
            .write()
            .map_err(|_| CoreError::Internal("registry lock poisoned".to_string()))?;
        if inner.index.contains_key(&key) {
            return Err(CoreError::DuplicateName(descriptor.name));
        }
        let position = inner.entries.len();
        inner.entries.push(Entry {
            descriptor: descriptor.clone(),
            handler,
        });
        inner.index.insert(key, position);

        tracing::info!(handler = %descriptor.name, "registered handler");
        Ok(descriptor)
    }

    /// Look up a handler by name (case-insensitive).
    pub fn get(&self, name: &str) -> CoreResult<Arc<dyn Handler>> {
        let inner = self.read()?;
        inner
            .index
            .get(&name.to_lowercase())
            .map(|&position| inner.entries[position].handler.clone())
            .ok_or_else(|| CoreError::NotFound(name.to_string()))
    }

    /// Canonical registered name for `name`, compared case-insensitively.
    pub fn resolve(&self, name: &str) -> CoreResult<Option<String>> {
        let inner = self.read()?;
        Ok(inner
            .index
            .get(&name.to_lowercase())
            .map(|&position| inner.entries[position].descriptor.name.clone()))
    }

    /// Descriptors for every handler, in registration order.
    pub fn all(&self) -> CoreResult<Vec<HandlerDescriptor>> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> CoreResult<Vec<String>> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .iter()
            .map(|entry| entry.descriptor.name.clone())
            .collect())
    }

    pub fn len(&self) -> CoreResult<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Handler with the highest [`Handler::confidence`] for `request`, among
    /// those that implement it. Ties go to the earliest registration.
    pub fn best_by_confidence(&self, request: &str) -> CoreResult<Option<(String, f64)>> {
        let inner = self.read()?;
        let mut best: Option<(String, f64)> = None;
        for entry in &inner.entries {
            let Some(score) = entry.handler.confidence(request) else {
                continue;
            };
            if score.is_nan() {
                continue;
            }
            let score = score.clamp(0.0, 1.0);
            if best.as_ref().map_or(true, |(_, current)| score > *current) {
                best = Some((entry.descriptor.name.clone(), score));
            }
        }
        Ok(best)
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, RegistryInner>> {
        self.inner
            .read()
            .map_err(|_| CoreError::Internal("registry lock poisoned".to_string()))
    }
}
