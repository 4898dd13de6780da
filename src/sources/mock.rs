//! Mock registry for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::sources::{MetadataRegistry, RegistryAnswer, SourceError};

/// Canned answer for one encoded DOI
#[derive(Debug, Clone)]
pub enum MockAnswer {
    Journal(String),
    NoContainerTitle,
    Fail(String),
}

/// A registry that returns predefined answers and records every lookup.
///
/// DOIs without a configured answer are reported as not found.
#[derive(Debug, Default)]
pub struct MockRegistry {
    id: String,
    answers: Mutex<HashMap<String, MockAnswer>>,
    calls: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    /// Set the answer for an encoded DOI
    pub fn set_answer(&self, encoded_doi: &str, answer: MockAnswer) {
        let mut guard = self.answers.lock().unwrap();
        guard.insert(encoded_doi.to_string(), answer);
    }

    /// Encoded DOIs looked up so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataRegistry for MockRegistry {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Registry"
    }

    async fn lookup_journal(&self, encoded_doi: &str) -> Result<RegistryAnswer, SourceError> {
        self.calls.lock().unwrap().push(encoded_doi.to_string());

        let answer = self.answers.lock().unwrap().get(encoded_doi).cloned();
        match answer {
            Some(MockAnswer::Journal(journal)) => Ok(RegistryAnswer::Journal(journal)),
            Some(MockAnswer::NoContainerTitle) => Ok(RegistryAnswer::NoContainerTitle),
            Some(MockAnswer::Fail(msg)) => Err(SourceError::Api(msg)),
            None => {
                Err(SourceError::NotFound(encoded_doi.to_string()))
            }
        }
    }
}
