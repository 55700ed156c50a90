//! Default evaluation strategy
//!
//! Dispatches every algebra operator to its iterator and evaluates value
//! expressions against a row. Statement patterns are answered by the
//! [`TripleSource`] the strategy was created with.

use super::iterator::{
    DistinctIterator, ExtensionIterator, JoinIterator, MembershipFilterIterator,
    MultiProjectionIterator, OptionalJoinIterator, ProjectionIterator, SelectionIterator,
    SliceIterator, StatementPatternIterator, UnionIterator,
};
use super::value::{compare_terms, effective_boolean_value, evaluate_math, like_matches};
use super::{
    BindingSetIteration, CloseableIteration, ConditionEvaluationError, ConditionResult,
    EmptyIteration, EvaluationResult, EvaluationStrategy, SingletonIteration, TripleSource,
};
use crate::query::algebra::{NodeId, QueryModel, Scope, StatementPattern, TupleExpr, ValueExpr, Var};
use crate::query::binding::{BindingSet, QueryBindingSet};
use crate::rdf::{NamedNode, RdfSubject, RdfTerm};
use tracing::{debug, trace};

/// Evaluation strategy backed by a [`TripleSource`]
pub struct DefaultEvaluationStrategy<'s> {
    /// Statement lookup and term factory
    source: &'s dyn TripleSource,
}

impl<'s> DefaultEvaluationStrategy<'s> {
    /// Create a new strategy over `source`
    pub fn new(source: &'s dyn TripleSource) -> Self {
        Self { source }
    }

    fn evaluate_statement_pattern<'a>(
        &'a self,
        pattern: &'a StatementPattern,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<BindingSetIteration<'a>> {
        let lookup = |var: &Var| var.value().or_else(|| bindings.get(var.name())).cloned();

        // A bound position of the wrong kind cannot match anything
        let subject: Option<RdfSubject> = match lookup(&pattern.subject) {
            Some(term) => match term.to_subject() {
                Some(subject) => Some(subject),
                None => return Ok(Box::new(EmptyIteration::new())),
            },
            None => None,
        };
        let predicate: Option<NamedNode> = match lookup(&pattern.predicate) {
            Some(term) => match term.as_named_node() {
                Some(predicate) => Some(predicate.clone()),
                None => return Ok(Box::new(EmptyIteration::new())),
            },
            None => None,
        };
        let object = lookup(&pattern.object);
        let context: Option<NamedNode> = match pattern.context.as_ref().and_then(lookup) {
            Some(term) => match term.as_named_node() {
                Some(context) => Some(context.clone()),
                None => return Ok(Box::new(EmptyIteration::new())),
            },
            None => None,
        };

        let (contexts, named_graphs_only) = match (pattern.scope, context) {
            (Scope::AllContexts, Some(context)) | (Scope::NamedContexts, Some(context)) => {
                (vec![Some(context)], false)
            }
            (Scope::AllContexts, None) => (Vec::new(), false),
            (Scope::NamedContexts, None) => (Vec::new(), true),
            (Scope::NullContext, None) => (vec![None], false),
            (Scope::NullContext, Some(_)) => return Ok(Box::new(EmptyIteration::new())),
        };

        let statements = self.source.get_statements(
            subject.as_ref(),
            predicate.as_ref(),
            object.as_ref(),
            &contexts,
        )?;
        Ok(Box::new(StatementPatternIterator::new(
            statements,
            pattern,
            bindings,
            named_graphs_only,
        )))
    }

    /// Value of a term-producing expression; `Ok(None)` for unbound variables
    fn term(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> ConditionResult<Option<RdfTerm>> {
        let factory = self.source.term_factory();
        let term: RdfTerm = match expr {
            ValueExpr::Var(var) => return Ok(var.value().or_else(|| bindings.get(var.name())).cloned()),
            ValueExpr::Constant(value) => value.clone(),
            ValueExpr::Math { left, right, op } => {
                let left = self.required(model, left, bindings)?;
                let right = self.required(model, right, bindings)?;
                evaluate_math(&left, &right, *op, factory)?
            }
            ValueExpr::Str(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::NamedNode(node) => factory.create_literal(node.as_str()).into(),
                RdfTerm::Literal(lit) if lit.is_simple() => lit.into(),
                RdfTerm::Literal(lit) => factory.create_literal(lit.value()).into(),
                other => return Err(type_error("str", &other)),
            },
            ValueExpr::Label(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::Literal(lit) => factory.create_literal(lit.value()).into(),
                other => return Err(type_error("label", &other)),
            },
            ValueExpr::Lang(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::Literal(lit) => match lit.language() {
                    Some(language) => factory.create_literal(language).into(),
                    None => return Ok(None),
                },
                other => return Err(type_error("lang", &other)),
            },
            ValueExpr::Datatype(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::Literal(lit) => lit.datatype().into(),
                other => return Err(type_error("datatype", &other)),
            },
            ValueExpr::LocalName(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::NamedNode(node) => factory.create_literal(node.local_name()).into(),
                other => return Err(type_error("localName", &other)),
            },
            ValueExpr::Namespace(arg) => match self.required(model, arg, bindings)? {
                RdfTerm::NamedNode(node) => factory.create_literal(node.namespace()).into(),
                other => return Err(type_error("namespace", &other)),
            },
            ValueExpr::BNodeGenerator => factory.create_bnode().into(),
            ValueExpr::And(..)
            | ValueExpr::Or(..)
            | ValueExpr::Not(_)
            | ValueExpr::Compare { .. }
            | ValueExpr::Regex { .. }
            | ValueExpr::Like { .. }
            | ValueExpr::Bound(_)
            | ValueExpr::IsUri(_)
            | ValueExpr::IsBNode(_)
            | ValueExpr::IsLiteral(_)
            | ValueExpr::IsResource(_)
            | ValueExpr::Exists(_)
            | ValueExpr::In { .. } => factory.create_boolean(self.is_true(model, expr, bindings)?).into(),
        };
        Ok(Some(term))
    }

    fn required(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> ConditionResult<RdfTerm> {
        self.term(model, expr, bindings)?
            .ok_or_else(|| ConditionEvaluationError::UnboundVariable(expr.to_string()))
    }

    /// String a regex or wildcard pattern is matched against
    fn text(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> ConditionResult<String> {
        match self.required(model, expr, bindings)? {
            RdfTerm::NamedNode(node) => Ok(node.as_str().to_string()),
            RdfTerm::Literal(lit) => Ok(lit.value().to_string()),
            other => Err(type_error("pattern match", &other)),
        }
    }

    fn test_term(
        &self,
        model: &QueryModel,
        arg: &ValueExpr,
        bindings: &QueryBindingSet,
        test: impl Fn(&RdfTerm) -> bool,
    ) -> ConditionResult<bool> {
        Ok(self.term(model, arg, bindings)?.as_ref().is_some_and(test))
    }

    fn exists(&self, model: &QueryModel, subquery: NodeId, bindings: &QueryBindingSet) -> ConditionResult<bool> {
        let mut rows = self.evaluate(model, subquery, bindings).map_err(subquery_error)?;
        let found = rows.has_next().map_err(subquery_error)?;
        rows.close().map_err(subquery_error)?;
        Ok(found)
    }

    fn is_in(
        &self,
        model: &QueryModel,
        arg: &ValueExpr,
        subquery: NodeId,
        bindings: &QueryBindingSet,
    ) -> ConditionResult<bool> {
        let value = self.term(model, arg, bindings)?;
        let names = model.binding_names(subquery);
        let Some(column) = names.first() else {
            return Ok(false);
        };

        let mut rows = self.evaluate(model, subquery, bindings).map_err(subquery_error)?;
        let mut found = false;
        while let Some(row) = rows.next().map_err(subquery_error)? {
            if row.get(column) == value.as_ref() {
                found = true;
                break;
            }
        }
        rows.close().map_err(subquery_error)?;
        Ok(found)
    }
}

fn type_error(function: &str, term: &RdfTerm) -> ConditionEvaluationError {
    ConditionEvaluationError::TypeError(format!("{} is not defined for {}", function, term))
}

fn subquery_error(e: super::QueryEvaluationError) -> ConditionEvaluationError {
    ConditionEvaluationError::Subquery(e.to_string())
}

impl<'s> EvaluationStrategy for DefaultEvaluationStrategy<'s> {
    fn evaluate<'a>(
        &'a self,
        model: &'a QueryModel,
        node: NodeId,
        bindings: &QueryBindingSet,
    ) -> EvaluationResult<BindingSetIteration<'a>> {
        let strategy: &'a dyn EvaluationStrategy = self;
        let expr = model.expr(node)?;
        trace!("Evaluating {} {}", expr.name(), node);

        let iteration: BindingSetIteration<'a> = match expr {
            TupleExpr::StatementPattern(pattern) => self.evaluate_statement_pattern(pattern, bindings)?,
            TupleExpr::Join { left, right } => {
                Box::new(JoinIterator::new(strategy, model, *left, *right, bindings)?)
            }
            TupleExpr::OptionalJoin { left, right, condition } => Box::new(OptionalJoinIterator::new(
                strategy,
                model,
                *left,
                *right,
                condition.as_ref(),
                bindings,
            )?),
            TupleExpr::Selection { arg, condition } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(SelectionIterator::new(strategy, model, arg, condition))
            }
            TupleExpr::Projection { arg, elements } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(ProjectionIterator::new(arg, elements))
            }
            TupleExpr::MultiProjection { arg, projections } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(MultiProjectionIterator::new(arg, projections)?)
            }
            TupleExpr::Extension { arg, elements } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(ExtensionIterator::new(strategy, model, arg, elements))
            }
            TupleExpr::Union { left, right } => {
                Box::new(UnionIterator::new(strategy, model, *left, *right, bindings))
            }
            TupleExpr::Difference { left, right } => {
                let left = self.evaluate(model, *left, bindings)?;
                Box::new(MembershipFilterIterator::minus(strategy, model, left, *right, bindings))
            }
            TupleExpr::Intersection { left, right } => {
                let left = self.evaluate(model, *left, bindings)?;
                Box::new(MembershipFilterIterator::intersect(strategy, model, left, *right, bindings))
            }
            TupleExpr::Distinct { arg } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(DistinctIterator::new(arg))
            }
            TupleExpr::Slice { arg, offset, limit } => {
                let arg = self.evaluate(model, *arg, bindings)?;
                Box::new(SliceIterator::new(arg, *offset, *limit))
            }
            TupleExpr::SingletonSet => Box::new(SingletonIteration::new(bindings.clone())),
            TupleExpr::EmptySet => Box::new(EmptyIteration::new()),
        };
        Ok(iteration)
    }

    fn value(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> Option<RdfTerm> {
        match self.term(model, expr, bindings) {
            Ok(value) => value,
            Err(e) => {
                debug!("Value of {} is undefined: {}", expr, e);
                None
            }
        }
    }

    fn is_true(&self, model: &QueryModel, expr: &ValueExpr, bindings: &QueryBindingSet) -> ConditionResult<bool> {
        match expr {
            ValueExpr::And(left, right) => match self.is_true(model, left, bindings) {
                Ok(false) => Ok(false),
                Ok(true) => self.is_true(model, right, bindings),
                // An undecided side is irrelevant if the other side is false
                Err(e) => match self.is_true(model, right, bindings) {
                    Ok(false) => Ok(false),
                    _ => Err(e),
                },
            },
            ValueExpr::Or(left, right) => match self.is_true(model, left, bindings) {
                Ok(true) => Ok(true),
                Ok(false) => self.is_true(model, right, bindings),
                Err(e) => match self.is_true(model, right, bindings) {
                    Ok(true) => Ok(true),
                    _ => Err(e),
                },
            },
            ValueExpr::Not(arg) => Ok(!self.is_true(model, arg, bindings)?),
            ValueExpr::Compare { left, right, op } => {
                let left = self.required(model, left, bindings)?;
                let right = self.required(model, right, bindings)?;
                compare_terms(&left, &right, *op)
            }
            ValueExpr::Regex { arg, pattern } => Ok(pattern.is_match(&self.text(model, arg, bindings)?)),
            ValueExpr::Like { arg, pattern, case_sensitive } => {
                Ok(like_matches(&self.text(model, arg, bindings)?, pattern, *case_sensitive))
            }
            ValueExpr::Bound(name) => Ok(bindings.contains(name)),
            ValueExpr::IsUri(arg) => self.test_term(model, arg, bindings, RdfTerm::is_named_node),
            ValueExpr::IsBNode(arg) => self.test_term(model, arg, bindings, RdfTerm::is_blank_node),
            ValueExpr::IsLiteral(arg) => self.test_term(model, arg, bindings, RdfTerm::is_literal),
            ValueExpr::IsResource(arg) => self.test_term(model, arg, bindings, RdfTerm::is_resource),
            ValueExpr::Exists(subquery) => self.exists(model, *subquery, bindings),
            ValueExpr::In { arg, subquery } => self.is_in(model, arg, *subquery, bindings),
            ValueExpr::Var(_)
            | ValueExpr::Constant(_)
            | ValueExpr::Math { .. }
            | ValueExpr::Str(_)
            | ValueExpr::Label(_)
            | ValueExpr::Lang(_)
            | ValueExpr::Datatype(_)
            | ValueExpr::LocalName(_)
            | ValueExpr::Namespace(_)
            | ValueExpr::BNodeGenerator => effective_boolean_value(&self.required(model, expr, bindings)?),
        }
    }
}
