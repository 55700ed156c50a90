//! Union iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{NodeId, QueryModel};
use crate::query::binding::QueryBindingSet;

/// Rows of the left operand followed by rows of the right operand
///
/// Each operand is only opened once the previous one is exhausted.
pub struct UnionIterator<'a> {
    strategy: &'a dyn EvaluationStrategy,
    model: &'a QueryModel,
    /// Operands in output order
    args: [NodeId; 2],
    /// Next operand to open
    next_arg: usize,
    /// Input bindings for both operands
    bindings: QueryBindingSet,
    /// Operand currently being drained
    current: Option<BindingSetIteration<'a>>,
}

impl<'a> UnionIterator<'a> {
    /// Create a new union iterator; neither operand is opened yet
    pub fn new(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left: NodeId,
        right: NodeId,
        bindings: &QueryBindingSet,
    ) -> LookAhead<Self> {
        LookAhead::new(Self {
            strategy,
            model,
            args: [left, right],
            next_arg: 0,
            bindings: bindings.clone(),
            current: None,
        })
    }
}

impl<'a> Producer for UnionIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        if let Some(current) = self.current.as_mut() {
            if let Some(row) = current.next()? {
                return Ok(Advance::Ready(row));
            }
            current.close()?;
            self.current = None;
            return Ok(Advance::NotReady);
        }

        match self.args.get(self.next_arg) {
            Some(arg) => {
                self.next_arg += 1;
                self.current = Some(self.strategy.evaluate(self.model, *arg, &self.bindings)?);
                Ok(Advance::NotReady)
            }
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.next_arg = self.args.len();
        match self.current.take() {
            Some(mut current) => current.close(),
            None => Ok(()),
        }
    }
}
