//! Registry resolving repository names to repository plugins.

use std::collections::BTreeMap;

use super::{
    IeeePaperRepository, PaperRepository, RepositoryError, ScienceDirectPaperRepository,
};

/// Suffix every registered repository name carries
pub const REPOSITORY_SUFFIX: &str = "PaperRepository";

/// Builds a fresh repository instance
pub type RepositoryConstructor = fn() -> Result<Box<dyn PaperRepository>, RepositoryError>;

/// Registry of all available paper repositories
///
/// Repositories are registered under their full name (`IEEEPaperRepository`)
/// and looked up with or without the [`REPOSITORY_SUFFIX`].
#[derive(Debug, Clone)]
pub struct RepositoryRegistry {
    constructors: BTreeMap<String, RepositoryConstructor>,
}

impl RepositoryRegistry {
    /// Create a new registry with the built-in repositories
    pub fn new() -> Self {
        let mut registry = Self {
            constructors: BTreeMap::new(),
        };

        registry.register("IEEE", || {
            Ok(Box::new(IeeePaperRepository::new()?) as Box<dyn PaperRepository>)
        });
        registry.register("ScienceDirect", || {
            Ok(Box::new(ScienceDirectPaperRepository::new()?) as Box<dyn PaperRepository>)
        });

        registry
    }

    /// Register a repository constructor, replacing any previous one with the
    /// same name
    pub fn register(&mut self, name: &str, constructor: RepositoryConstructor) {
        self.constructors.insert(full_name(name), constructor);
    }

    /// Instantiate the repository registered under `name`.
    ///
    /// Fails with [`RepositoryError::Unsupported`] if no repository has that
    /// name, or with whatever error its constructor returns.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn PaperRepository>, RepositoryError> {
        let constructor = self
            .constructors
            .get(&full_name(name))
            .ok_or_else(|| RepositoryError::Unsupported(name.to_string()))?;
        constructor()
    }

    /// Check if a repository exists
    pub fn has(&self, name: &str) -> bool {
        self.constructors.contains_key(&full_name(name))
    }

    /// Registered names without the suffix, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors
            .keys()
            .map(|name| name.strip_suffix(REPOSITORY_SUFFIX).unwrap_or(name))
    }

    /// Get the number of registered repositories
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn full_name(name: &str) -> String {
    if name.ends_with(REPOSITORY_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, REPOSITORY_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_basic() {
        let registry = RepositoryRegistry::new();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["IEEE", "ScienceDirect"]);
    }

    #[test]
    fn test_resolve_with_and_without_suffix() {
        let registry = RepositoryRegistry::new();

        let ieee = registry.resolve("IEEE").unwrap();
        assert_eq!(ieee.name(), "IEEE");

        let ieee = registry.resolve("IEEEPaperRepository").unwrap();
        assert_eq!(ieee.name(), "IEEE");

        let science_direct = registry.resolve("ScienceDirect").unwrap();
        assert_eq!(science_direct.name(), "ScienceDirect");
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let registry = RepositoryRegistry::new();
        assert!(registry.has("IEEE"));
        assert!(!registry.has("ieee"));
    }

    #[test]
    fn test_resolve_unsupported() {
        let registry = RepositoryRegistry::new();
        let err = registry.resolve("ACM").unwrap_err();
        assert!(matches!(err, RepositoryError::Unsupported(ref name) if name == "ACM"));
        assert!(err.to_string().contains("ACM"));
    }

    #[test]
    fn test_resolve_instantiation_failure() {
        let mut registry = RepositoryRegistry::new();
        registry.register("Broken", || {
            Err(RepositoryError::Instantiation {
                name: "Broken".to_string(),
                reason: "no default configuration".to_string(),
            })
        });

        let err = registry.resolve("Broken").unwrap_err();
        assert!(matches!(err, RepositoryError::Instantiation { .. }));
    }

    #[test]
    fn test_register_runtime_repository() {
        let mut registry = RepositoryRegistry::new();
        registry.register("LocalPaperRepository", || {
            let repository = crate::repository::MockPaperRepository::new("http://localhost")?;
            Ok(Box::new(repository) as Box<dyn PaperRepository>)
        });

        assert!(registry.has("Local"));
        assert_eq!(registry.resolve("Local").unwrap().name(), "Mock");
    }
}
