//! Filter iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{QueryModel, ValueExpr};
use crate::query::binding::QueryBindingSet;
use tracing::trace;

/// Keeps the rows for which the condition is true
///
/// Rows whose condition cannot be decided are dropped; that never ends the
/// iteration.
pub struct SelectionIterator<'a> {
    /// Strategy used to test the condition
    strategy: &'a dyn EvaluationStrategy,
    /// Query being evaluated
    model: &'a QueryModel,
    /// Input rows
    arg: BindingSetIteration<'a>,
    /// Filter condition
    condition: &'a ValueExpr,
}

impl<'a> SelectionIterator<'a> {
    /// Create a new selection iterator over `arg`
    pub fn new(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        arg: BindingSetIteration<'a>,
        condition: &'a ValueExpr,
    ) -> LookAhead<Self> {
        LookAhead::new(Self {
            strategy,
            model,
            arg,
            condition,
        })
    }

    fn accept(&self, row: &QueryBindingSet) -> bool {
        match self.strategy.is_true(self.model, self.condition, row) {
            Ok(accepted) => accepted,
            Err(e) => {
                trace!("Rejecting row {}: {}", row, e);
                false
            }
        }
    }
}

impl<'a> Producer for SelectionIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        match self.arg.next()? {
            Some(row) if self.accept(&row) => Ok(Advance::Ready(row)),
            Some(_) => Ok(Advance::NotReady),
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.arg.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algebra::CompareOp;
    use crate::query::evaluation::iterator::test_support::{lit, row, TrackedRows};
    use crate::query::evaluation::DefaultEvaluationStrategy;
    use crate::rdf::RdfStore;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_selection_filters_rows() {
        let store = RdfStore::new();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let model = QueryModel::new();
        let closes = Rc::new(Cell::new(0));
        let input = TrackedRows::boxed(
            vec![row(&[("x", "a")]), row(&[("x", "b")]), row(&[("x", "a")])],
            &closes,
        );
        let condition = ValueExpr::compare(ValueExpr::var("x"), CompareOp::Eq, ValueExpr::constant(lit("a")));

        let mut selection = SelectionIterator::new(&strategy, &model, input, &condition);
        let rows = selection.collect_all().unwrap();
        assert_eq!(rows, vec![row(&[("x", "a")]), row(&[("x", "a")])]);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_selection_absorbs_condition_errors() {
        let store = RdfStore::new();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let model = QueryModel::new();
        let closes = Rc::new(Cell::new(0));
        // The second row leaves ?y unbound, so the comparison cannot be decided
        let input = TrackedRows::boxed(
            vec![
                row(&[("x", "a"), ("y", "a")]),
                row(&[("x", "a")]),
                row(&[("x", "b"), ("y", "b")]),
            ],
            &closes,
        );
        let condition = ValueExpr::compare(ValueExpr::var("x"), CompareOp::Eq, ValueExpr::var("y"));

        let mut selection = SelectionIterator::new(&strategy, &model, input, &condition);
        let rows = selection.collect_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&[("x", "b"), ("y", "b")]));
    }

    #[test]
    fn test_selection_close_twice() {
        let store = RdfStore::new();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let model = QueryModel::new();
        let closes = Rc::new(Cell::new(0));
        let input = TrackedRows::boxed(vec![row(&[("x", "a")])], &closes);
        let condition = ValueExpr::Bound("x".to_string());

        let mut selection = SelectionIterator::new(&strategy, &model, input, &condition);
        selection.close().unwrap();
        selection.close().unwrap();
        assert_eq!(closes.get(), 1);
        assert!(!selection.has_next().unwrap());
    }
}
