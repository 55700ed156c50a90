//! Projection iterator

use super::super::{BindingSetIteration, CloseableIteration, EvaluationResult};
use super::close_on_error;
use crate::query::algebra::ProjectionElemList;
use crate::query::binding::{BindingSet, QueryBindingSet};

/// Build a row holding `row[source]` under `target` for every element
///
/// Sources that are unbound in `row` stay unbound in the result.
pub fn project(elements: &ProjectionElemList, row: &dyn BindingSet) -> QueryBindingSet {
    let mut result = QueryBindingSet::with_capacity(elements.len());
    for elem in elements.iter() {
        if let Some(value) = row.get(&elem.source) {
            result.add_binding(elem.target.as_str(), value.clone());
        }
    }
    result
}

/// Applies one projection to every input row
pub struct ProjectionIterator<'a> {
    /// Input rows
    arg: BindingSetIteration<'a>,
    /// Projection applied to each row
    elements: &'a ProjectionElemList,
    /// Set once `arg` has been closed
    closed: bool,
}

impl<'a> ProjectionIterator<'a> {
    /// Create a new projection iterator over `arg`
    pub fn new(arg: BindingSetIteration<'a>, elements: &'a ProjectionElemList) -> Self {
        Self {
            arg,
            elements,
            closed: false,
        }
    }
}

impl<'a> CloseableIteration for ProjectionIterator<'a> {
    type Item = QueryBindingSet;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        if self.closed {
            return Ok(false);
        }
        let result = self.arg.has_next();
        close_on_error(self, result)
    }

    fn next(&mut self) -> EvaluationResult<Option<QueryBindingSet>> {
        if self.closed {
            return Ok(None);
        }
        let result = self.arg.next();
        let row = close_on_error(self, result)?;
        Ok(row.map(|row| project(self.elements, &row)))
    }

    fn close(&mut self) -> EvaluationResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.arg.close()
    }
}
