//! Extension iterator

use super::super::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, EvaluationStrategy, LookAhead,
    Producer,
};
use crate::query::algebra::{ExtensionElem, QueryModel};
use crate::query::binding::QueryBindingSet;

/// Adds computed bindings to every input row
///
/// Elements are evaluated in order, so later elements see the bindings added
/// by earlier ones. An element whose value cannot be computed adds nothing.
pub struct ExtensionIterator<'a> {
    strategy: &'a dyn EvaluationStrategy,
    model: &'a QueryModel,
    arg: BindingSetIteration<'a>,
    elements: &'a [ExtensionElem],
}

impl<'a> ExtensionIterator<'a> {
    /// Create a new extension iterator over `arg`
    pub fn new(
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        arg: BindingSetIteration<'a>,
        elements: &'a [ExtensionElem],
    ) -> LookAhead<Self> {
        LookAhead::new(Self {
            strategy,
            model,
            arg,
            elements,
        })
    }
}

impl<'a> Producer for ExtensionIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        let Some(mut row) = self.arg.next()? else {
            return Ok(Advance::Done);
        };
        for elem in self.elements {
            if let Some(value) = self.strategy.value(self.model, &elem.expr, &row) {
                row.add_binding(elem.name.as_str(), value);
            }
        }
        Ok(Advance::Ready(row))
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.arg.close()
    }
}
