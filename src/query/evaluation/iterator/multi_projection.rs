//! Multi-projection iterator

use super::super::{BindingSetIteration, CloseableIteration, EvaluationResult, QueryEvaluationError};
use super::{close_on_error, project};
use crate::query::algebra::ProjectionElemList;
use crate::query::binding::QueryBindingSet;

/// Emits one row per projection for every input row
///
/// With `k` projections and `m` input rows the output has `m * k` rows in
/// row-major order: all projections of the first input row, then all
/// projections of the second, and so on.
pub struct MultiProjectionIterator<'a> {
    /// Input rows
    arg: BindingSetIteration<'a>,
    /// Projections, applied in order
    projections: &'a [ProjectionElemList],
    /// Input row currently being projected
    current: Option<QueryBindingSet>,
    /// Next projection to apply to `current`
    next_index: usize,
    /// `close` already ran
    closed: bool,
}

impl<'a> MultiProjectionIterator<'a> {
    /// Create a new multi-projection iterator; fails on an empty projection list
    pub fn new(mut arg: BindingSetIteration<'a>, projections: &'a [ProjectionElemList]) -> EvaluationResult<Self> {
        if projections.is_empty() {
            arg.close()?;
            return Err(QueryEvaluationError::MalformedQuery(
                "multi-projection requires at least one projection".to_string(),
            ));
        }
        Ok(Self {
            arg,
            projections,
            current: None,
            next_index: 0,
            closed: false,
        })
    }
}

impl<'a> CloseableIteration for MultiProjectionIterator<'a> {
    type Item = QueryBindingSet;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        if self.closed {
            return Ok(false);
        }
        if self.current.is_some() && self.next_index < self.projections.len() {
            return Ok(true);
        }
        let result = self.arg.has_next();
        close_on_error(self, result)
    }

    fn next(&mut self) -> EvaluationResult<Option<QueryBindingSet>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            if let Some(row) = &self.current {
                if let Some(elements) = self.projections.get(self.next_index) {
                    self.next_index += 1;
                    return Ok(Some(project(elements, row)));
                }
            }

            let result = self.arg.next();
            match close_on_error(self, result)? {
                Some(row) => {
                    self.current = Some(row);
                    self.next_index = 0;
                }
                None => {
                    self.current = None;
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) -> EvaluationResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.next_index = self.projections.len();
        self.current = None;
        self.arg.close()
    }
}
