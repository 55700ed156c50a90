//! RDF data model
//!
//! Terms (IRIs, blank nodes, literals), quads, a term factory for values
//! computed during evaluation, and an in-memory quad store that serves as a
//! triple source.
//!
//! # Example
//!
//! ```rust
//! use rdf_algebra::rdf::{Literal, NamedNode, QuadPattern, RdfStore};
//!
//! let mut store = RdfStore::new();
//!
//! let alice = NamedNode::new("http://example.org/alice").unwrap();
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! store.insert(alice.clone(), name, Literal::new_simple_literal("Alice")).unwrap();
//!
//! let pattern = QuadPattern { subject: Some(alice.into()), ..Default::default() };
//! assert_eq!(store.query(&pattern).len(), 1);
//! ```

mod factory;
mod store;
mod types;

pub use factory::TermFactory;
pub use store::{RdfStore, RdfStoreError, RdfStoreResult};
pub use types::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfResult, RdfSubject, RdfTerm,
};
