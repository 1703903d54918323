use std::collections::BTreeMap;
use std::sync::Arc;

use provctl_core::ResourceId;
use thiserror::Error;

use crate::error::EngineError;
use crate::provider::CloudProvider;

#[derive(Debug, Clone, Error)]
#[error("provider {name:?} is not registered")]
pub struct ProviderNotFound {
    pub name: String,
}

/// Providers keyed by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn CloudProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name, returning any provider it
    /// replaced.
    pub fn register(&mut self, provider: Arc<dyn CloudProvider>) -> Option<Arc<dyn CloudProvider>> {
        let name = provider.name().to_string();
        tracing::debug!(provider = %name, "registering provider");
        self.providers.insert(name, provider)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn CloudProvider>, ProviderNotFound> {
        self.providers.get(name).ok_or_else(|| ProviderNotFound {
            name: name.to_string(),
        })
    }

    /// The provider responsible for `resource`.
    pub fn resolve(&self, resource: &ResourceId) -> Result<&Arc<dyn CloudProvider>, EngineError> {
        self.get(&resource.provider)
            .map_err(|e| EngineError::ProviderNotFound {
                provider: e.name,
                resource: resource.clone(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Providers in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn CloudProvider>)> {
        self.providers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
