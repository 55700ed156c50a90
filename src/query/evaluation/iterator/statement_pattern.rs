//! Statement pattern matching

use super::super::{
    Advance, CloseableIteration, EvaluationResult, LookAhead, Producer, StatementIteration,
};
use crate::query::algebra::{StatementPattern, Var};
use crate::query::binding::{BindingSet, QueryBindingSet};
use crate::rdf::{Quad, RdfTerm};

/// Turns matching statements into rows
///
/// Each row extends the input bindings with the pattern's free variables. A
/// variable that occurs in several positions must bind equal terms, otherwise
/// the statement is skipped. Constants and an unnamed default graph add no
/// binding.
pub struct StatementPatternIterator<'a> {
    /// Candidate statements from the triple source
    statements: StatementIteration<'a>,
    /// Pattern being matched
    pattern: &'a StatementPattern,
    /// Input bindings every row extends
    bindings: QueryBindingSet,
    /// Skip statements in the default graph
    named_graphs_only: bool,
}

impl<'a> StatementPatternIterator<'a> {
    /// Create a new statement pattern iterator over `statements`
    pub fn new(
        statements: StatementIteration<'a>,
        pattern: &'a StatementPattern,
        bindings: &QueryBindingSet,
        named_graphs_only: bool,
    ) -> LookAhead<Self> {
        LookAhead::new(Self {
            statements,
            pattern,
            bindings: bindings.clone(),
            named_graphs_only,
        })
    }

    fn convert(&self, quad: &Quad) -> Option<QueryBindingSet> {
        if self.named_graphs_only && quad.graph.is_none() {
            return None;
        }

        let mut row = self.bindings.clone();
        let subject = RdfTerm::from(quad.subject.clone());
        let predicate = RdfTerm::from(quad.predicate.clone());
        let graph = quad.graph.clone().map(RdfTerm::from);

        let positions = [
            (Some(&self.pattern.subject), Some(subject)),
            (Some(&self.pattern.predicate), Some(predicate)),
            (Some(&self.pattern.object), Some(quad.object.clone())),
            (self.pattern.context.as_ref(), graph),
        ];
        for (var, value) in positions {
            let (Some(var), Some(value)) = (var, value) else {
                continue;
            };
            if !bind(&mut row, var, value) {
                return None;
            }
        }
        Some(row)
    }
}

/// Bind `var` to `value` unless it is a constant; false on a conflicting binding
fn bind(row: &mut QueryBindingSet, var: &Var, value: RdfTerm) -> bool {
    if var.has_value() {
        return true;
    }
    match row.get(var.name()) {
        Some(existing) => *existing == value,
        None => {
            row.add_binding(var.name(), value);
            true
        }
    }
}

impl<'a> Producer for StatementPatternIterator<'a> {
    type Item = QueryBindingSet;

    fn produce(&mut self) -> EvaluationResult<Advance<QueryBindingSet>> {
        match self.statements.next()? {
            Some(quad) => Ok(match self.convert(&quad) {
                Some(row) => Advance::Ready(row),
                None => Advance::NotReady,
            }),
            None => Ok(Advance::Done),
        }
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.statements.close()
    }
}
