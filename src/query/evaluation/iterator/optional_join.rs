//! Left outer join iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{NodeId, QueryModel, ValueExpr};
use crate::query::binding::QueryBindingSet;
use tracing::trace;

enum State<'a> {
    /// Pull the next left row and open the right operand for it
    PrimingLeft,
    /// Emit accepted right rows; on exhaustion fall back to the left row if
    /// nothing was accepted
    ProbingRight {
        right: BindingSetIteration<'a>,
        fallback: QueryBindingSet,
        matched: bool,
    },
    /// Left side exhausted
    Done,
}

/// Optional (left outer) join
///
/// Every left row appears in the output at least once: either extended by
/// the right rows that satisfy the join condition, or, if there are none,
/// unchanged. A condition that cannot be decided counts as not satisfied.
pub struct OptionalJoinIterator<'a> {
    /// Strategy used to open the right operand and test the condition
    strategy: &'a dyn EvaluationStrategy,
    /// Query being evaluated
    model: &'a QueryModel,
    /// Right operand
    right_arg: NodeId,
    /// Join condition, tested on the joined row
    condition: Option<&'a ValueExpr>,
    /// Left rows
    left: BindingSetIteration<'a>,
    /// Current state
    state: State<'a>,
}

impl<'a> OptionalJoinIterator<'a> {
    /// Create a new optional join iterator; the left operand is opened immediately
    pub fn new(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        left_arg: NodeId,
        right_arg: NodeId,
        condition: Option<&'a ValueExpr>,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<LookAhead<Self>> {
        let left = strategy.evaluate(model, left_arg, bindings)?;
        Ok(LookAhead::new(Self {
            strategy,
            model,
            right_arg,
            condition,
            left,
            state: State::PrimingLeft,
        }))
    }

    fn accepts(
        strategy: &dyn EvaluationStrategy,
        model: &QueryModel,
        condition: Option<&ValueExpr>,
        row: &QueryBindingSet,
    ) -> bool {
        let Some(condition) = condition else {
            return true;
        };
        match strategy.is_true(model, condition, row) {
            Ok(accepted) => accepted,
            Err(e) => {
                trace!("Optional join condition undecided for {}: {}", row, e);
                false
            }
        }
    }
}

impl<'a> Producer for OptionalJoinIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        match &mut self.state {
            State::Done => Ok(Advance::Done),
            State::PrimingLeft => match self.left.next()? {
                Some(left_row) => {
                    let right = self.strategy.evaluate(self.model, self.right_arg, &left_row)?;
                    self.state = State::ProbingRight {
                        right,
                        fallback: left_row,
                        matched: false,
                    };
                    Ok(Advance::NotReady)
                }
                None => {
                    self.state = State::Done;
                    Ok(Advance::Done)
                }
            },
            State::ProbingRight { right, matched, .. } => {
                while let Some(row) = right.next()? {
                    if Self::accepts(self.strategy, self.model, self.condition, &row) {
                        *matched = true;
                        return Ok(Advance::Ready(row));
                    }
                }

                // Right side exhausted for this left row
                let State::ProbingRight { mut right, fallback, matched } =
                    std::mem::replace(&mut self.state, State::PrimingLeft)
                else {
                    return Ok(Advance::NotReady);
                };
                right.close()?;
                if matched {
                    Ok(Advance::NotReady)
                } else {
                    Ok(Advance::Ready(fallback))
                }
            }
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        let right = match std::mem::replace(&mut self.state, State::Done) {
            State::ProbingRight { mut right, .. } => right.close(),
            _ => Ok(()),
        };
        let left = self.left.close();
        right.and(left)
    }
}
