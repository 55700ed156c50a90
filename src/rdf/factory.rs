//! Term factory
//!
//! Creates IRIs, blank nodes and typed literals for values computed during
//! query evaluation (string functions, arithmetic, boolean results).

use super::types::{BlankNode, Literal, NamedNode, RdfResult};
use oxrdf::vocab::xsd;
use oxrdf::NamedNodeRef;
use rust_decimal::Decimal;

/// Factory for RDF terms produced by the evaluation engine
#[derive(Debug, Clone, Default)]
pub struct TermFactory;

impl TermFactory {
    /// Create a new term factory
    pub fn new() -> Self {
        Self
    }

    /// Create an IRI, validating its syntax
    pub fn create_iri(&self, iri: &str) -> RdfResult<NamedNode> {
        NamedNode::new(iri)
    }

    /// Create a fresh blank node
    pub fn create_bnode(&self) -> BlankNode {
        BlankNode::new()
    }

    /// Create a simple literal
    pub fn create_literal(&self, label: impl Into<String>) -> Literal {
        Literal::new_simple_literal(label)
    }

    /// Create a language-tagged literal
    pub fn create_language_literal(&self, label: impl Into<String>, language: &str) -> RdfResult<Literal> {
        Literal::new_language_tagged_literal(label, language)
    }

    /// Create a literal with an explicit datatype
    pub fn create_typed_literal(&self, label: impl Into<String>, datatype: NamedNode) -> Literal {
        Literal::new_typed_literal(label, datatype)
    }

    /// Create an `xsd:boolean` literal
    pub fn create_boolean(&self, value: bool) -> Literal {
        typed(if value { "true" } else { "false" }, xsd::BOOLEAN)
    }

    /// Create an `xsd:integer` literal
    pub fn create_integer(&self, value: i128) -> Literal {
        typed(value.to_string(), xsd::INTEGER)
    }

    /// Create an `xsd:decimal` literal
    pub fn create_decimal(&self, value: Decimal) -> Literal {
        typed(value.normalize().to_string(), xsd::DECIMAL)
    }

    /// Create an `xsd:double` literal
    pub fn create_double(&self, value: f64) -> Literal {
        typed(format_floating(value), xsd::DOUBLE)
    }

    /// Create an `xsd:float` literal
    pub fn create_float(&self, value: f32) -> Literal {
        typed(format_floating(f64::from(value)), xsd::FLOAT)
    }
}

fn typed(label: impl Into<String>, datatype: NamedNodeRef<'_>) -> Literal {
    Literal::new_typed_literal(label, NamedNode::from(datatype.into_owned()))
}

fn format_floating(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        format!("{:E}", value)
    }
}
