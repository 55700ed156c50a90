//! In-memory quad store
//!
//! Quads are kept in insertion order with subject and predicate indices. The
//! store answers statement lookups for the evaluation engine.

use super::factory::TermFactory;
use super::types::{NamedNode, Quad, QuadPattern, RdfSubject, RdfTerm};
use crate::query::evaluation::{EvaluationResult, StatementIteration, TripleSource, VecIteration};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

/// RDF store errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RdfStoreError {
    /// Quad not found
    #[error("Quad not found: {0}")]
    QuadNotFound(String),

    /// Duplicate quad
    #[error("Duplicate quad: {0}")]
    DuplicateQuad(String),
}

pub type RdfStoreResult<T> = Result<T, RdfStoreError>;

/// Quad store with subject and predicate indices
#[derive(Clone, Default)]
pub struct RdfStore {
    /// All quads (primary storage)
    quads: IndexSet<Quad>,

    /// Subject -> quads with that subject
    subject_index: FxHashMap<RdfSubject, Vec<Quad>>,

    /// Predicate -> quads with that predicate
    predicate_index: FxHashMap<NamedNode, Vec<Quad>>,

    /// Factory handed to the evaluation engine
    factory: TermFactory,
}

impl RdfStore {
    /// Create a new empty RDF store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a statement into the default graph
    pub fn insert(
        &mut self,
        subject: impl Into<RdfSubject>,
        predicate: NamedNode,
        object: impl Into<RdfTerm>,
    ) -> RdfStoreResult<()> {
        self.insert_quad(Quad::triple(subject, predicate, object))
    }

    /// Insert a quad
    pub fn insert_quad(&mut self, quad: Quad) -> RdfStoreResult<()> {
        if self.quads.contains(&quad) {
            return Err(RdfStoreError::DuplicateQuad(quad.to_string()));
        }

        self.subject_index
            .entry(quad.subject.clone())
            .or_default()
            .push(quad.clone());
        self.predicate_index
            .entry(quad.predicate.clone())
            .or_default()
            .push(quad.clone());
        self.quads.insert(quad);

        Ok(())
    }

    /// Remove a quad
    pub fn remove(&mut self, quad: &Quad) -> RdfStoreResult<()> {
        if !self.quads.shift_remove(quad) {
            return Err(RdfStoreError::QuadNotFound(quad.to_string()));
        }

        if let Some(quads) = self.subject_index.get_mut(&quad.subject) {
            quads.retain(|q| q != quad);
            if quads.is_empty() {
                self.subject_index.remove(&quad.subject);
            }
        }
        if let Some(quads) = self.predicate_index.get_mut(&quad.predicate) {
            quads.retain(|q| q != quad);
            if quads.is_empty() {
                self.predicate_index.remove(&quad.predicate);
            }
        }

        Ok(())
    }

    /// Check if a quad exists in the store
    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    /// Get the total number of quads
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Clear all quads
    pub fn clear(&mut self) {
        self.quads.clear();
        self.subject_index.clear();
        self.predicate_index.clear();
    }

    /// Quads matching a pattern, in insertion order
    pub fn query(&self, pattern: &QuadPattern) -> Vec<Quad> {
        let candidates: Box<dyn Iterator<Item = &Quad>> = match (&pattern.subject, &pattern.predicate) {
            (Some(subject), _) => Box::new(self.subject_index.get(subject).into_iter().flatten()),
            (None, Some(predicate)) => Box::new(self.predicate_index.get(predicate).into_iter().flatten()),
            (None, None) => Box::new(self.quads.iter()),
        };
        candidates.filter(|quad| pattern.matches(quad)).cloned().collect()
    }

    /// Get an iterator over all quads
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// Named graphs that hold at least one quad
    pub fn graphs(&self) -> Vec<NamedNode> {
        self.quads
            .iter()
            .filter_map(|quad| quad.graph.clone())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

impl TripleSource for RdfStore {
    fn get_statements(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&NamedNode>,
        object: Option<&RdfTerm>,
        contexts: &[Option<NamedNode>],
    ) -> EvaluationResult<StatementIteration<'_>> {
        let pattern = QuadPattern {
            subject: subject.cloned(),
            predicate: predicate.cloned(),
            object: object.cloned(),
            graph: None,
        };
        let quads: Vec<Quad> = self
            .query(&pattern)
            .into_iter()
            .filter(|quad| contexts.is_empty() || contexts.contains(&quad.graph))
            .collect();
        trace!("Statement lookup matched {} quads", quads.len());
        Ok(Box::new(VecIteration::new(quads)))
    }

    fn term_factory(&self) -> &TermFactory {
        &self.factory
    }
}
