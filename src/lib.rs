//! RDF query algebra engine
//!
//! Lazy, pull-based evaluation of RDF query-algebra trees against a triple
//! source, plus a cost-based join-order optimizer.
//!
//! # Architecture
//!
//! - [`rdf`]: terms, quads, a term factory and an in-memory quad store
//! - [`query::algebra`]: the arena-backed query tree
//! - [`query::binding`]: result rows (binding sets)
//! - [`query::evaluation`]: the evaluation strategy and one closeable iterator
//!   per operator
//! - [`query::optimizer`]: join chain reordering
//! - [`query::QueryEngine`]: optimize-then-evaluate front end, configured by
//!   [`EngineConfig`]
//!
//! ## Example Usage
//!
//! ```rust
//! use rdf_algebra::query::algebra::{ProjectionElemList, QueryModel, StatementPattern, Var};
//! use rdf_algebra::query::{BindingSet, CloseableIteration, DefaultEvaluationStrategy, QueryBindingSet};
//! use rdf_algebra::rdf::{Literal, NamedNode, RdfStore};
//! use rdf_algebra::QueryEngine;
//!
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let mut store = RdfStore::new();
//! store
//!     .insert(NamedNode::new("http://example.org/alice").unwrap(), name.clone(), Literal::new_simple_literal("Alice"))
//!     .unwrap();
//!
//! // SELECT ?n WHERE { ?person foaf:name ?n }
//! let mut model = QueryModel::new();
//! let pattern = model
//!     .statement_pattern(StatementPattern::new(Var::new("person"), Var::constant("-const-name", name), Var::new("n")))
//!     .unwrap();
//! let root = model.projection(pattern, ProjectionElemList::of_names(&["n"])).unwrap();
//! model.set_root(root).unwrap();
//!
//! let engine = QueryEngine::default();
//! engine.optimize(&mut model).unwrap();
//!
//! let strategy = DefaultEvaluationStrategy::new(&store);
//! let rows = engine
//!     .evaluate(&strategy, &model, &QueryBindingSet::new())
//!     .unwrap()
//!     .collect_all()
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get("n").unwrap().as_literal().unwrap().value(), "Alice");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod query;
pub mod rdf;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, EngineConfig};

pub use query::{
    GraphQueryResult, QueryEngine, QueryEvaluationError, QueryModel, TupleQueryResult,
};

pub use rdf::{BlankNode, Literal, NamedNode, Quad, RdfStore, RdfTerm};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "1.0.0");
    }
}
