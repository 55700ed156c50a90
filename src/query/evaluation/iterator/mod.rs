//! Operator iterators
//!
//! One iterator per algebra operator. Iterators that need to skip over
//! input are [`Producer`](super::Producer)s driven by
//! [`LookAhead`](super::LookAhead); simple one-to-one conversions implement
//! [`CloseableIteration`] directly.

mod distinct;
mod extension;
mod join;
mod membership;
mod multi_projection;
mod optional_join;
mod projection;
mod selection;
mod slice;
mod statement_pattern;
mod union;

pub use distinct::DistinctIterator;
pub use extension::ExtensionIterator;
pub use join::JoinIterator;
pub use membership::MembershipFilterIterator;
pub use multi_projection::MultiProjectionIterator;
pub use optional_join::OptionalJoinIterator;
pub use projection::{project, ProjectionIterator};
pub use selection::SelectionIterator;
pub use slice::SliceIterator;
pub use statement_pattern::StatementPatternIterator;
pub use union::UnionIterator;

use super::{CloseableIteration, EvaluationResult};
use tracing::trace;

/// Close `iter` if `result` is an error, returning `result` unchanged
pub(crate) fn close_on_error<T, I>(iter: &mut I, result: EvaluationResult<T>) -> EvaluationResult<T>
where
    I: CloseableIteration + ?Sized,
{
    if result.is_err() {
        if let Err(close_err) = iter.close() {
            trace!("Close after evaluation error failed: {}", close_err);
        }
    }
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Row sources with observable `close` calls

    use super::super::{BindingSetIteration, CloseableIteration, EvaluationResult, QueryEvaluationError};
    use crate::query::binding::QueryBindingSet;
    use crate::rdf::{Literal, RdfTerm};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Simple literal term
    pub fn lit(s: &str) -> RdfTerm {
        Literal::new_simple_literal(s).into()
    }

    /// Row from `(name, label)` pairs
    pub fn row(pairs: &[(&str, &str)]) -> QueryBindingSet {
        let mut row = QueryBindingSet::new();
        for (name, label) in pairs {
            row.add_binding(*name, lit(label));
        }
        row
    }

    /// Fixed rows; counts `close` calls and can fail after `fail_after` rows
    pub struct TrackedRows {
        rows: std::vec::IntoIter<QueryBindingSet>,
        closes: Rc<Cell<usize>>,
        fail_after: Option<usize>,
        served: usize,
    }

    impl TrackedRows {
        pub fn boxed<'a>(rows: Vec<QueryBindingSet>, closes: &Rc<Cell<usize>>) -> BindingSetIteration<'a> {
            Box::new(Self {
                rows: rows.into_iter(),
                closes: Rc::clone(closes),
                fail_after: None,
                served: 0,
            })
        }

        pub fn failing<'a>(
            rows: Vec<QueryBindingSet>,
            fail_after: usize,
            closes: &Rc<Cell<usize>>,
        ) -> BindingSetIteration<'a> {
            Box::new(Self {
                rows: rows.into_iter(),
                closes: Rc::clone(closes),
                fail_after: Some(fail_after),
                served: 0,
            })
        }
    }

    impl CloseableIteration for TrackedRows {
        type Item = QueryBindingSet;

        fn has_next(&mut self) -> EvaluationResult<bool> {
            Ok(!self.rows.as_slice().is_empty())
        }

        fn next(&mut self) -> EvaluationResult<Option<QueryBindingSet>> {
            if Some(self.served) == self.fail_after {
                return Err(QueryEvaluationError::TripleSource("source failure".to_string()));
            }
            self.served += 1;
            Ok(self.rows.next())
        }

        fn close(&mut self) -> EvaluationResult<()> {
            self.closes.set(self.closes.get() + 1);
            self.rows = Vec::new().into_iter();
            Ok(())
        }
    }
}
