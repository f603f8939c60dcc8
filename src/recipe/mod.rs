mod llm;

pub use llm::{build_prompt, extract_translation, LlmRecipe, LlmSettings};

use crate::client::ChatModel;
use crate::config::RecipeConfig;
use crate::corpus::Corpus;
use crate::error::{RecipeError, Result};
use crate::language::LanguagePair;
use crate::similarity::Embedder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A named translation + scoring strategy applied to every row of one input file.
///
/// Implementations return the same rows with `translated` and
/// `similarity_score` added or overwritten.
#[async_trait]
pub trait Recipe: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, corpus: Corpus, pair: &LanguagePair) -> Result<Corpus>;
}

/// Recipes registered at startup, iterated in name order.
#[derive(Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, Arc<dyn Recipe>>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, recipe: Arc<dyn Recipe>) -> Result<()> {
        let name = recipe.name().to_string();
        if name.trim().is_empty() {
            return Err(RecipeError::Invalid {
                name,
                reason: "name must not be empty".to_string(),
            }
            .into());
        }
        if self.recipes.contains_key(&name) {
            return Err(RecipeError::Duplicate(name).into());
        }
        self.recipes.insert(name, recipe);
        Ok(())
    }

    /// Builds one LLM recipe per configuration table, sharing the chat and
    /// embedding collaborators. Any invalid table fails the whole registry.
    pub fn from_config(
        configs: &[RecipeConfig],
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for config in configs {
            let settings = LlmSettings::from_config(config, batch_size)?;
            registry.register(Arc::new(LlmRecipe::new(
                settings,
                Arc::clone(&chat),
                Arc::clone(&embedder),
            )))?;
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Recipe>> {
        self.recipes.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.recipes.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Recipe>)> {
        self.recipes.iter().map(|(name, recipe)| (name.as_str(), recipe))
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Recipe for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn process(&self, corpus: Corpus, _pair: &LanguagePair) -> Result<Corpus> {
            Ok(corpus)
        }
    }

    #[test]
    fn iterates_in_name_order() {
        let mut registry = RecipeRegistry::new();
        registry.register(Arc::new(Named("zeta"))).unwrap();
        registry.register(Arc::new(Named("alpha"))).unwrap();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
        assert_eq!(registry.iter().next().map(|(n, _)| n), Some("alpha"));
    }

    #[test]
    fn rejects_duplicates_and_empty_names() {
        let mut registry = RecipeRegistry::new();
        registry.register(Arc::new(Named("a"))).unwrap();
        assert!(registry.register(Arc::new(Named("a"))).is_err());
        assert!(registry.register(Arc::new(Named(" "))).is_err());
        assert_eq!(registry.len(), 1);
    }
}
