//! Query processing module
//!
//! A query arrives as an algebra tree ([`algebra::QueryModel`]). The
//! [`QueryEngine`] optionally reorders its join chains
//! ([`optimizer::QueryJoinOptimizer`]) and then evaluates it lazily through an
//! [`evaluation::EvaluationStrategy`].
//!
//! Architecture follows the Volcano iterator model: every operator is a
//! pull-based iterator over its operands, and nothing is computed until the
//! caller asks for the next row.

pub mod algebra;
pub mod binding;
pub mod evaluation;
pub mod optimizer;
pub mod result;

// Re-export main types
pub use algebra::{AlgebraError, AlgebraResult, NodeId, QueryModel, TupleExpr, ValueExpr};
pub use binding::{BindingSet, ListBindingSet, QueryBindingSet};
pub use evaluation::{
    CloseableIteration, ConditionEvaluationError, DefaultEvaluationStrategy, EvaluationResult,
    EvaluationStrategy, QueryEvaluationError, TripleSource,
};
pub use optimizer::{
    CostComparator, OptimizerError, OptimizerResult, QueryJoinOptimizer, VarCountCostComparator,
};
pub use result::{GraphQueryResult, TupleQueryResult};

use crate::config::EngineConfig;
use tracing::{debug, warn};

/// Query engine - optimizes and evaluates query models
pub struct QueryEngine {
    /// Engine configuration
    config: EngineConfig,
    /// Join cost estimate
    comparator: Box<dyn CostComparator>,
}

impl QueryEngine {
    /// Create a new query engine with the variable-count cost comparator
    pub fn new(config: EngineConfig) -> Self {
        Self::with_comparator(config, VarCountCostComparator)
    }

    /// Create a new query engine with a custom cost comparator
    pub fn with_comparator(config: EngineConfig, comparator: impl CostComparator + 'static) -> Self {
        Self {
            config,
            comparator: Box::new(comparator),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reorder the join chains of `model`
    ///
    /// Best effort: a failed pass leaves a valid model and is only logged,
    /// unless `fail_on_optimizer_error` is set.
    pub fn optimize(&self, model: &mut QueryModel) -> OptimizerResult<()> {
        if !self.config.optimize_joins {
            return Ok(());
        }
        if self.config.log_query_model {
            debug!("Query model before optimization:\n{}", model);
        }

        match QueryJoinOptimizer::new(self.comparator.as_ref()).optimize(model) {
            Ok(root) => {
                if self.config.log_query_model {
                    debug!("Optimized query model (root {}):\n{}", root, model);
                }
                Ok(())
            }
            Err(e) if self.config.fail_on_optimizer_error => Err(e),
            Err(e) => {
                warn!("Join optimization failed, evaluating the query as written: {}", e);
                Ok(())
            }
        }
    }

    /// Evaluate a tuple query
    ///
    /// Columns are the names bound by the tree followed by the input binding
    /// names it does not mention.
    pub fn evaluate<'a>(
        &self,
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<TupleQueryResult<'a>> {
        let root = Self::root(model)?;
        let rows = strategy.evaluate(model, root, bindings)?;
        let mut names = model.binding_names(root);
        names.extend(bindings.binding_names().into_iter().map(str::to_string));
        Ok(TupleQueryResult::new(names, rows))
    }

    /// Evaluate a boolean query: true if at least one row exists
    pub fn ask(
        &self,
        strategy: &dyn EvaluationStrategy,
        model: &QueryModel,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<bool> {
        let root = Self::root(model)?;
        let mut rows = strategy.evaluate(model, root, bindings)?;
        let found = rows.has_next()?;
        rows.close()?;
        Ok(found)
    }

    /// Evaluate a graph query
    pub fn construct<'a>(
        &self,
        strategy: &'a dyn EvaluationStrategy,
        model: &'a QueryModel,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<GraphQueryResult<'a>> {
        let root = Self::root(model)?;
        Ok(GraphQueryResult::new(strategy.evaluate(model, root, bindings)?))
    }

    fn root(model: &QueryModel) -> EvaluationResult<NodeId> {
        model
            .root()
            .ok_or_else(|| QueryEvaluationError::MalformedQuery("query model has no root".to_string()))
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algebra::{ProjectionElemList, StatementPattern, Var};
    use crate::rdf::{Literal, NamedNode, RdfStore, RdfTerm};
    use std::cmp::Ordering;

    fn node(name: &str) -> NamedNode {
        NamedNode::new(&format!("http://example.org/{}", name)).unwrap()
    }

    fn store() -> RdfStore {
        let mut store = RdfStore::new();
        store.insert(node("alice"), node("knows"), node("bob")).unwrap();
        store.insert(node("bob"), node("knows"), node("carol")).unwrap();
        store.insert(node("alice"), node("name"), Literal::new_simple_literal("Alice")).unwrap();
        store.insert(node("bob"), node("name"), Literal::new_simple_literal("Bob")).unwrap();
        store
    }

    fn pattern(model: &mut QueryModel, s: &str, p: &str, o: &str) -> NodeId {
        model
            .statement_pattern(StatementPattern::new(
                Var::new(s),
                Var::constant(format!("-const-{}", p), node(p)),
                Var::new(o),
            ))
            .unwrap()
    }

    /// ?a knows ?b . ?b knows ?c . ?a name ?n
    fn friends_of_friends() -> QueryModel {
        let mut model = QueryModel::new();
        let ab = pattern(&mut model, "a", "knows", "b");
        let bc = pattern(&mut model, "b", "knows", "c");
        let name = pattern(&mut model, "a", "name", "n");
        let j1 = model.join(ab, bc).unwrap();
        let j2 = model.join(j1, name).unwrap();
        let root = model
            .projection(j2, ProjectionElemList::of_names(&["n", "c"]))
            .unwrap();
        model.set_root(root).unwrap();
        model
    }

    #[test]
    fn test_optimize_then_evaluate() {
        let store = store();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let engine = QueryEngine::default();
        let mut model = friends_of_friends();

        engine.optimize(&mut model).unwrap();
        let mut result = engine.evaluate(&strategy, &model, &QueryBindingSet::new()).unwrap();
        assert_eq!(result.binding_names(), ["n".to_string(), "c".to_string()]);

        let rows = result.collect_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n"), Some(&RdfTerm::from(Literal::new_simple_literal("Alice"))));
        assert_eq!(rows[0].get("c"), Some(&RdfTerm::from(node("carol"))));
    }

    #[test]
    fn test_input_bindings_become_columns() {
        let store = store();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let engine = QueryEngine::default();
        let mut model = QueryModel::new();
        let root = pattern(&mut model, "a", "knows", "b");
        model.set_root(root).unwrap();

        let mut input = QueryBindingSet::new();
        input.add_binding("a", node("alice").into());
        input.add_binding("source", Literal::new_simple_literal("request").into());

        let mut result = engine.evaluate(&strategy, &model, &input).unwrap();
        assert_eq!(
            result.binding_names(),
            ["a".to_string(), "b".to_string(), "source".to_string()]
        );
        let rows = result.collect_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("b"), Some(&RdfTerm::from(node("bob"))));
        assert_eq!(
            rows[0].get("source"),
            Some(&RdfTerm::from(Literal::new_simple_literal("request")))
        );
    }

    #[test]
    fn test_optimizer_failure_is_best_effort() {
        let failing = |_: &QueryModel, _: NodeId, _: NodeId| -> OptimizerResult<Ordering> {
            Err(OptimizerError::Comparator("no statistics".to_string()))
        };
        let mut model = friends_of_friends();
        let before = model.to_string();

        let lenient = QueryEngine::with_comparator(EngineConfig::default(), failing);
        assert!(lenient.optimize(&mut model).is_ok());
        assert_eq!(model.to_string(), before);

        let strict = QueryEngine::with_comparator(
            EngineConfig {
                fail_on_optimizer_error: true,
                ..EngineConfig::default()
            },
            failing,
        );
        assert!(matches!(strict.optimize(&mut model), Err(OptimizerError::Comparator(_))));
    }

    #[test]
    fn test_disabled_optimizer_keeps_model() {
        let engine = QueryEngine::new(EngineConfig {
            optimize_joins: false,
            ..EngineConfig::default()
        });
        let mut model = friends_of_friends();
        let before = model.to_string();
        engine.optimize(&mut model).unwrap();
        assert_eq!(model.to_string(), before);
    }

    #[test]
    fn test_ask_and_construct() {
        let store = store();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let engine = QueryEngine::default();

        let mut model = QueryModel::new();
        let knows = pattern(&mut model, "subject", "knows", "object");
        let elements = vec![crate::query::algebra::ExtensionElem::new(
            "predicate",
            ValueExpr::constant(node("likes")),
        )];
        let root = model.extension(knows, elements).unwrap();
        model.set_root(root).unwrap();

        assert!(engine.ask(&strategy, &model, &QueryBindingSet::new()).unwrap());

        let quads = engine
            .construct(&strategy, &model, &QueryBindingSet::new())
            .unwrap()
            .collect_all()
            .unwrap();
        assert_eq!(quads.len(), 2);
        assert!(quads.iter().all(|q| q.predicate == node("likes")));

        let mut empty = QueryModel::new();
        let root = empty.empty_set().unwrap();
        empty.set_root(root).unwrap();
        assert!(!engine.ask(&strategy, &empty, &QueryBindingSet::new()).unwrap());
    }

    #[test]
    fn test_model_without_root() {
        let store = store();
        let strategy = DefaultEvaluationStrategy::new(&store);
        let engine = QueryEngine::default();
        let model = QueryModel::new();
        assert!(matches!(
            engine.ask(&strategy, &model, &QueryBindingSet::new()),
            Err(QueryEvaluationError::MalformedQuery(_))
        ));
    }
}
