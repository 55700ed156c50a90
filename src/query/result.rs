//! Query results
//!
//! Lazy wrappers over the row iteration produced by the evaluation engine.
//! Both must be closed (or drained) to release the underlying iterators.

use crate::query::binding::{BindingSet, ListBindingSet, QueryBindingSet};
use crate::query::evaluation::{
    Advance, BindingSetIteration, CloseableIteration, EvaluationResult, LookAhead, Producer,
};
use crate::rdf::{Quad, RdfTerm};
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::debug;

/// Rows of a tuple query
///
/// Every row shares the same name list, in [`binding_names`](Self::binding_names)
/// order.
pub struct TupleQueryResult<'a> {
    /// Column names
    names: Arc<[String]>,
    /// Evaluated rows
    rows: BindingSetIteration<'a>,
}

impl<'a> TupleQueryResult<'a> {
    /// Wrap `rows`, reporting them under `names`; repeated names are kept once
    pub fn new(names: Vec<String>, rows: BindingSetIteration<'a>) -> Self {
        let names: IndexSet<String> = names.into_iter().collect();
        Self {
            names: names.into_iter().collect(),
            rows,
        }
    }

    /// Column names
    pub fn binding_names(&self) -> &[String] {
        &self.names
    }
}

impl<'a> CloseableIteration for TupleQueryResult<'a> {
    type Item = ListBindingSet;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        self.rows.has_next()
    }

    fn next(&mut self) -> EvaluationResult<Option<ListBindingSet>> {
        Ok(self
            .rows
            .next()?
            .map(|row| ListBindingSet::from_binding_set(Arc::clone(&self.names), &row)))
    }

    fn close(&mut self) -> EvaluationResult<()> {
        self.rows.close()
    }
}

/// Statements of a graph query
///
/// Built from rows binding `subject`, `predicate`, `object` and optionally
/// `context`. Rows that do not form a valid statement are skipped.
pub struct GraphQueryResult<'a> {
    statements: LookAhead<StatementBuilder<'a>>,
}

impl<'a> GraphQueryResult<'a> {
    /// Wrap `rows`
    pub fn new(rows: BindingSetIteration<'a>) -> Self {
        Self {
            statements: LookAhead::new(StatementBuilder { rows }),
        }
    }
}

impl<'a> CloseableIteration for GraphQueryResult<'a> {
    type Item = Quad;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        self.statements.has_next()
    }

    fn next(&mut self) -> EvaluationResult<Option<Quad>> {
        self.statements.next()
    }

    fn close(&mut self) -> EvaluationResult<()> {
        self.statements.close()
    }
}

struct StatementBuilder<'a> {
    rows: BindingSetIteration<'a>,
}

fn to_quad(row: &QueryBindingSet) -> Option<Quad> {
    let subject = row.get("subject")?.to_subject()?;
    let predicate = row.get("predicate")?.as_named_node()?.clone();
    let object = row.get("object")?.clone();
    let graph = match row.get("context") {
        Some(RdfTerm::NamedNode(graph)) => Some(graph.clone()),
        Some(_) => return None,
        None => None,
    };
    Some(Quad::new(subject, predicate, object, graph))
}

impl<'a> Producer for StatementBuilder<'a> {
    type Item = Quad;

    fn produce(&mut self) -> EvaluationResult<Advance<Quad>> {
        let Some(row) = self.rows.next()? else {
            return Ok(Advance::Done);
        };
        Ok(match to_quad(&row) {
            Some(quad) => Advance::Ready(quad),
            None => {
                debug!("Skipping row that is not a statement: {}", row);
                Advance::NotReady
            }
        })
    }

    fn release(&mut self) -> EvaluationResult<()> {
        self.rows.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::evaluation::VecIteration;
    use crate::rdf::{Literal, NamedNode};

    fn iri(s: &str) -> RdfTerm {
        NamedNode::new(&format!("http://example.org/{}", s)).unwrap().into()
    }

    fn row(pairs: &[(&str, RdfTerm)]) -> QueryBindingSet {
        let mut row = QueryBindingSet::new();
        for (name, value) in pairs {
            row.add_binding(*name, value.clone());
        }
        row
    }

    #[test]
    fn test_tuple_rows_share_names() {
        let rows = vec![row(&[("x", iri("a"))]), row(&[("y", iri("b")), ("x", iri("c"))])];
        let mut result = TupleQueryResult::new(
            vec!["x".to_string(), "y".to_string()],
            Box::new(VecIteration::new(rows)),
        );
        assert_eq!(result.binding_names(), ["x".to_string(), "y".to_string()]);

        let rows = result.collect_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].names(), rows[1].names());
        assert_eq!(rows[0].value_at(1), None);
        assert_eq!(rows[1].value_at(0), Some(&iri("c")));
        assert_eq!(rows[1].size(), 2);
    }

    #[test]
    fn test_repeated_names_reported_once() {
        let result = TupleQueryResult::new(
            vec!["x".to_string(), "y".to_string(), "x".to_string()],
            Box::new(VecIteration::new(Vec::new())),
        );
        assert_eq!(result.binding_names(), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_graph_rows_become_quads() {
        let rows = vec![
            row(&[("subject", iri("a")), ("predicate", iri("p")), ("object", iri("b"))]),
            // literal subject
            row(&[
                ("subject", Literal::new_simple_literal("x").into()),
                ("predicate", iri("p")),
                ("object", iri("b")),
            ]),
            row(&[
                ("subject", iri("a")),
                ("predicate", iri("p")),
                ("object", Literal::new_simple_literal("v").into()),
                ("context", iri("g")),
            ]),
            // missing object
            row(&[("subject", iri("a")), ("predicate", iri("p"))]),
        ];

        let quads = GraphQueryResult::new(Box::new(VecIteration::new(rows)))
            .collect_all()
            .unwrap();
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].graph, None);
        assert_eq!(quads[1].graph.as_ref().map(NamedNode::as_str), Some("http://example.org/g"));
    }
}
