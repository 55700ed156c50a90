//! Query evaluation
//!
//! The [`EvaluationStrategy`] turns an algebra node plus a row of input
//! bindings into a lazy [`BindingSetIteration`]. Evaluation is pull-based:
//! building the iterator for a node recursively builds the iterators of its
//! operands, and rows only flow when the consumer asks for the next one.
//!
//! Two error channels exist:
//!
//! - [`QueryEvaluationError`] is a real failure (mostly from the
//!   [`TripleSource`]); it propagates unchanged through every iterator, each
//!   of which closes what it opened on the way out.
//! - [`ConditionEvaluationError`] signals that a condition could not be
//!   decided for one row (type mismatch, unbound variable, ...). Filters and
//!   optional joins treat it as "does not match"; it never escapes
//!   [`EvaluationStrategy::evaluate`].

mod iteration;
pub mod iterator;
mod strategy;
mod value;

pub use iteration::{
    Advance, CloseableIteration, EmptyIteration, LookAhead, Producer, SingletonIteration,
    VecIteration,
};
pub use strategy::DefaultEvaluationStrategy;
pub use value::{compare_terms, effective_boolean_value, like_matches};

use crate::query::algebra::{AlgebraError, NodeId, QueryModel, ValueExpr};
use crate::query::binding::QueryBindingSet;
use crate::rdf::{NamedNode, Quad, RdfSubject, RdfTerm, TermFactory};
use thiserror::Error;

/// Evaluation errors
#[derive(Error, Debug)]
pub enum QueryEvaluationError {
    /// Failure reported by the triple source
    #[error("Triple source error: {0}")]
    TripleSource(String),

    /// Query model that cannot be evaluated
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Query model access error
    #[error("Algebra error: {0}")]
    Algebra(#[from] AlgebraError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EvaluationResult<T> = Result<T, QueryEvaluationError>;

/// A condition could not be decided for the current row
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionEvaluationError {
    /// Required variable has no value
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    /// Operand of the wrong kind or datatype
    #[error("Type error: {0}")]
    TypeError(String),

    /// Terms that cannot be ordered or compared
    #[error("Incomparable values: {0}")]
    Incomparable(String),

    /// Sub-query failed while evaluating a condition
    #[error("Sub-query failed: {0}")]
    Subquery(String),
}

pub type ConditionResult<T> = Result<T, ConditionEvaluationError>;

/// Boxed row iteration
pub type BindingSetIteration<'a> = Box<dyn CloseableIteration<Item = QueryBindingSet> + 'a>;

/// Boxed statement iteration
pub type StatementIteration<'a> = Box<dyn CloseableIteration<Item = Quad> + 'a>;

/// Statement lookup consumed by the evaluation strategy
///
/// Implementations must present a consistent snapshot for the duration of one
/// evaluation.
pub trait TripleSource {
    /// Statements matching the given positions (`None` = wildcard)
    ///
    /// `contexts` restricts the graphs: empty means every graph, a `None`
    /// entry stands for the default graph.
    fn get_statements(
        &self,
        subject: Option<&RdfSubject>,
        predicate: Option<&NamedNode>,
        object: Option<&RdfTerm>,
        contexts: &[Option<NamedNode>],
    ) -> EvaluationResult<StatementIteration<'_>>;

    /// Factory for terms created during evaluation
    fn term_factory(&self) -> &TermFactory;
}

/// Evaluates algebra nodes and expressions
pub trait EvaluationStrategy {
    /// Lazy rows of `node` evaluated under `bindings`
    ///
    /// Closing the returned iteration releases everything opened by this
    /// call, including iterations opened later by nested operators.
    fn evaluate<'a>(
        &'a self,
        model: &'a QueryModel,
        node: NodeId,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<BindingSetIteration<'a>>;

    /// Value of `expr`, or `None` if it cannot be computed for this row
    fn value(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> Option<RdfTerm>;

    /// Truth value of `expr`
    fn is_true(
        &self,
        model: &QueryModel,
        expr: &ValueExpr,
        bindings: &QueryBindingSet,
    ) -> ConditionResult<bool>;
}
