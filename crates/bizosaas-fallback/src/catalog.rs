//! Registry of named fallback generators

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::generator::{FallbackContext, FallbackGenerator};
use crate::shape::FixtureShape;
use crate::{FallbackError, Result, fixtures};

#[derive(Clone, Default)]
pub struct FallbackCatalog {
    generators: HashMap<String, Arc<dyn FallbackGenerator>>,
}

impl FallbackCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the built-in fixtures
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        for (name, generator) in fixtures::builtin() {
            catalog.generators.insert(name.to_string(), generator);
        }
        catalog
    }

    /// Register a generator under a new name
    pub fn register(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn FallbackGenerator>,
    ) -> Result<()> {
        let name = name.into();
        if self.generators.contains_key(&name) {
            return Err(FallbackError::Duplicate(name));
        }
        debug!("Registered fallback fixture '{}'", name);
        self.generators.insert(name, generator);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FallbackGenerator>> {
        self.generators.get(name).cloned()
    }

    pub fn shape(&self, name: &str) -> Option<&FixtureShape> {
        self.generators.get(name).map(|g| g.shape())
    }

    /// Generate the payload for a named fixture
    pub fn generate(&self, name: &str, ctx: &FallbackContext) -> Result<Value> {
        let generator = self
            .generators
            .get(name)
            .ok_or_else(|| FallbackError::UnknownFixture(name.to_string()))?;
        Ok(generator.generate(ctx))
    }

    /// Sorted fixture names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generators.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Check every generator's output against its declared shape
    pub fn validate_all(&self) -> Result<()> {
        let ctx = FallbackContext::default();
        for name in self.names() {
            let generator = &self.generators[&name];
            let payload = generator.generate(&ctx);
            if let Err(violations) = generator.shape().validate(&payload) {
                return Err(FallbackError::ShapeMismatch { name, violations });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FallbackCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCatalog")
            .field("fixtures", &self.names())
            .finish()
    }
}
