//! Offset/limit iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, LookAhead, Producer,
};
use crate::query::binding::QueryBindingSet;

/// Skips `offset` rows, then emits at most `limit` rows
///
/// Once the limit is reached the input is closed without being drained.
pub struct SliceIterator<'a> {
    /// Input rows
    arg: BindingSetIteration<'a>,
    /// Rows to skip
    offset: usize,
    /// Maximum number of rows to emit
    limit: Option<usize>,
    /// Rows skipped so far
    skipped: usize,
    /// Rows emitted so far
    returned: usize,
}

impl<'a> SliceIterator<'a> {
    /// Create a new slice iterator over `arg`
    pub fn new(arg: BindingSetIteration<'a>, offset: usize, limit: Option<usize>) -> LookAhead<Self> {
        LookAhead::new(Self {
            arg,
            offset,
            limit,
            skipped: 0,
            returned: 0,
        })
    }
}

impl<'a> Producer for SliceIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        if self.limit.is_some_and(|limit| self.returned >= limit) {
            return Ok(Advance::Done);
        }
        match self.arg.next()? {
            Some(_) if self.skipped < self.offset => {
                self.skipped += 1;
                Ok(Advance::NotReady)
            }
            Some(row) => {
                self.returned += 1;
                Ok(Advance::Ready(row))
            }
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
    use crate::query::evaluation::iterator::test_support::{row, TrackedRows};
    use std::cell::Cell;
    use std::rc::Rc;

    fn numbered(n: usize) -> Vec<QueryBindingSet> {
        (0..n).map(|i| row(&[("n", i.to_string().as_str())])).collect()
    }

    #[test]
    fn test_offset_and_limit() {
        let closes = Rc::new(Cell::new(0));
        let rows = SliceIterator::new(TrackedRows::boxed(numbered(10), &closes), 3, Some(2))
            .collect_all()
            .unwrap();
        assert_eq!(rows, vec![row(&[("n", "3")]), row(&[("n", "4")])]);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_offset_past_end() {
        let closes = Rc::new(Cell::new(0));
        let rows = SliceIterator::new(TrackedRows::boxed(numbered(2), &closes), 5, None)
            .collect_all()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_zero_limit_never_pulls() {
        let closes = Rc::new(Cell::new(0));
        let mut slice = SliceIterator::new(TrackedRows::failing(numbered(3), 0, &closes), 0, Some(0));
        assert!(!slice.has_next().unwrap());
        assert_eq!(closes.get(), 1);
    }
}
