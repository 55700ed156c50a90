//! Inner join iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{NodeId, QueryModel};
use crate::query::binding::QueryBindingSet;

/// Nested-loop join with binding propagation
///
/// For every left row the right operand is evaluated with that row as its
/// input bindings, so every right row already extends the left row.
pub struct JoinIterator<'a> {
    /// Strategy used to open the right operand
    strategy: &'a dyn EvaluationStrategy,
    /// Query being evaluated
    model: &'a QueryModel,
    /// Right operand
    right_arg: NodeId,
    /// Left rows
    left: BindingSetIteration<'a>,
    /// Right rows for the current left row
    right: Option<BindingSetIteration<'a>>,
}

impl<'a> JoinIterator<'a> {
    /// Create a new join iterator; the left operand is opened immediately
    pub fn new(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left_arg: NodeId,
        right_arg: NodeId,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<LookAhead<Self>> {
        let left = strategy.evaluate(model, left_arg, bindings)?;
        Ok(LookAhead::new(Self {
            strategy,
            model,
            right_arg,
            left,
            right: None,
        }))
    }
}

impl<'a> Producer for JoinIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        if let Some(right) = self.right.as_mut() {
            if let Some(row) = right.next()? {
                return Ok(Advance::Ready(row));
            }
            right.close()?;
            self.right = None;
            return Ok(Advance::NotReady);
        }

        match self.left.next()? {
            Some(left_row) => {
                self.right = Some(self.strategy.evaluate(self.model, self.right_arg, &left_row)?);
                Ok(Advance::NotReady)
            }
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        let right = match self.right.take() {
            Some(mut right) => right.close(),
            None => Ok(()),
        };
        let left = self.left.close();
        right.and(left)
    }
}
