use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::models::{Unit, UnitSequence, Verdict};
use crate::domain::ports::Oracle;

type Predicate<U> = dyn Fn(&UnitSequence<U>) -> Verdict + Send + Sync;

/// Oracle backed by an in-process closure.
pub struct PredicateOracle<U: Unit> {
    predicate: Arc<Predicate<U>>,
    name: String,
}

impl<U: Unit> PredicateOracle<U> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&UnitSequence<U>) -> Verdict + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            name: "predicate".to_string(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<U: Unit> Clone for PredicateOracle<U> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            name: self.name.clone(),
        }
    }
}

impl<U: Unit> fmt::Debug for PredicateOracle<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateOracle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<U: Unit> Oracle<U> for PredicateOracle<U> {
    async fn test(&self, input: &UnitSequence<U>) -> Result<Verdict> {
        Ok((self.predicate)(input))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
