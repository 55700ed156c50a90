//! Duplicate elimination

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, LookAhead, Producer,
};
use crate::query::binding::QueryBindingSet;
use rustc_hash::FxHashSet;

/// Drops rows equal to a row already emitted
pub struct DistinctIterator<'a> {
    /// Input rows
    arg: BindingSetIteration<'a>,
    /// Rows emitted so far
    seen: FxHashSet<QueryBindingSet>,
}

impl<'a> DistinctIterator<'a> {
    /// Create a new distinct iterator over `arg`
    pub fn new(arg: BindingSetIteration<'a>) -> LookAhead<Self> {
        LookAhead::new(Self {
            arg,
            seen: FxHashSet::default(),
        })
    }
}

impl<'a> Producer for DistinctIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        match self.arg.next()? {
            Some(row) if self.seen.contains(&row) => Ok(Advance::NotReady),
            Some(row) => {
                self.seen.insert(row.clone());
                Ok(Advance::Ready(row))
            }
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.seen.clear();
        self.arg.close()
    }
}
