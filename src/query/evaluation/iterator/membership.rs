//! Difference and intersection

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{NodeId, QueryModel};
use crate::query::binding::QueryBindingSet;
use rustc_hash::FxHashSet;

/// Filters left rows by membership in the right operand's rows
///
/// The right operand is materialized into a hash set when the first row is
/// requested. [`minus`](Self::minus) keeps left rows that are not in the set,
/// [`intersect`](Self::intersect) keeps those that are.
pub struct MembershipFilterIterator<'a> {
    strategy: &'a dyn EvaluationStrategy,
    model: &'a QueryModel,
    /// Left rows
    left: BindingSetIteration<'a>,
    /// Right operand
    right_arg: NodeId,
    /// Input bindings for the right operand
    bindings: QueryBindingSet,
    /// Materialized right rows
    right_rows: Option<FxHashSet<QueryBindingSet>>,
    /// Keep members (intersection) or non-members (difference)
    keep_members: bool,
}

impl<'a> MembershipFilterIterator<'a> {
    /// Left rows that do not occur in the right operand
    pub fn minus(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left: BindingSetIteration<'a>,
        right_arg: NodeId,
        bindings: &QueryBindingSet,
    ) -> LookAhead<Self> {
        Self::create(strategy, model, left, right_arg, bindings, false)
    }

    /// Left rows that also occur in the right operand
    pub fn intersect(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left: BindingSetIteration<'a>,
        right_arg: NodeId,
        bindings: &QueryBindingSet,
    ) -> LookAhead<Self> {
        Self::create(strategy, model, left, right_arg, bindings, true)
    }

    fn create(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left: BindingSetIteration<'a>,
        right_arg: NodeId,
        bindings: &QueryBindingSet,
        keep_members: bool,
    ) -> LookAhead<Self> {
        LookAhead::new(Self {
            strategy,
            model,
            left,
            right_arg,
            bindings: bindings.clone(),
            right_rows: None,
            keep_members,
        })
    }
}

impl<'a> Producer for MembershipFilterIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        if self.right_rows.is_none() {
            let mut right = self.strategy.evaluate(self.model, self.right_arg, &self.bindings)?;
            self.right_rows = Some(right.collect_all()?.into_iter().collect());
        }
        let Some(right_rows) = self.right_rows.as_ref() else {
            return Ok(Advance::Done);
        };

        match self.left.next()? {
            Some(row) if right_rows.contains(&row) == self.keep_members => Ok(Advance::Ready(row)),
            Some(_) => Ok(Advance::NotReady),
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.right_rows = None;
        self.left.close()
    }
}
