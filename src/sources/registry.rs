//! Registry for managing database backend plugins.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Source, SourceError};

/// Registry of all available database backends
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create a registry with every compiled-in backend
    pub fn new() -> Result<Self, SourceError> {
        let mut registry = Self {
            sources: HashMap::new(),
        };

        #[cfg(feature = "source-arxiv")]
        registry.register(Arc::new(super::ArxivSource::new()?));
        #[cfg(feature = "source-biorxiv")]
        registry.register(Arc::new(super::BiorxivSource::new()?));
        #[cfg(feature = "source-pubmed")]
        registry.register(Arc::new(super::PubMedSource::new()?));

        Ok(registry)
    }

    /// Create an empty registry (for tests)
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Register a new backend
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Get a backend by id
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.get(id)
    }

    /// Get a backend by id, returning an error if not registered
    pub fn get_required(&self, id: &str) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(id)
            .ok_or_else(|| SourceError::UnknownDatabase(id.to_string()))
    }

    /// All registered backends
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// All registered backend ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(|s| s.as_str())
    }

    /// Check if a backend exists
    pub fn has(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected_source_count() -> usize {
        let mut count = 0;
        if cfg!(feature = "source-arxiv") {
            count += 1;
        }
        if cfg!(feature = "source-biorxiv") {
            count += 1;
        }
        if cfg!(feature = "source-pubmed") {
            count += 1;
        }
        count
    }

    #[test]
    fn test_registry_default_backends() {
        let registry = SourceRegistry::new().unwrap();
        assert_eq!(registry.len(), expected_source_count());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_get_required() {
        let registry = SourceRegistry::new().unwrap();

        #[cfg(feature = "source-arxiv")]
        assert_eq!(registry.get_required("arxiv").unwrap().id(), "arxiv");

        let missing = registry.get_required("nonexistent");
        assert!(matches!(missing, Err(SourceError::UnknownDatabase(_))));
    }

    #[test]
    fn test_register_custom_backend() {
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(crate::sources::MockSource::new()));

        assert!(registry.has("mock"));
        assert_eq!(registry.len(), 1);
    }
}
