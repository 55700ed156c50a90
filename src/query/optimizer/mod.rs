//! Query optimization
//!
//! Rewrites a [`QueryModel`](crate::query::algebra::QueryModel) before it is
//! evaluated. The only rewrite is join reordering: chains of nested joins are
//! flattened, sorted by an injected [`CostComparator`] and rebuilt. Results
//! never change, only the order in which operands are joined.

mod join;

pub use join::{CostComparator, QueryJoinOptimizer, VarCountCostComparator};

use crate::query::algebra::AlgebraError;
use thiserror::Error;

/// Optimizer errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptimizerError {
    /// Cost comparator could not compare two operands
    #[error("Cost comparison failed: {0}")]
    Comparator(String),

    /// Model has no root to optimize
    #[error("Query model has no root")]
    NoRoot,

    /// Query model access error
    #[error("Algebra error: {0}")]
    Algebra(#[from] AlgebraError),
}

pub type OptimizerResult<T> = Result<T, OptimizerError>;
