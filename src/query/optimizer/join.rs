//! Cost-based join reordering

use super::{OptimizerError, OptimizerResult};
use crate::query::algebra::{NodeId, QueryModel, TupleExpr};
use std::cmp::Ordering;
use tracing::debug;

/// Orders join operands by estimated cost
///
/// `Ordering::Less` means `a` is cheaper and should be joined first. The
/// comparison must be a total preorder over the operands of one chain.
pub trait CostComparator {
    /// Compare the costs of two operands of `model`
    fn compare(&self, model: &QueryModel, a: NodeId, b: NodeId) -> OptimizerResult<Ordering>;
}

impl<F> CostComparator for F
where
    F: Fn(&QueryModel, NodeId, NodeId) -> OptimizerResult<Ordering>,
{
    fn compare(&self, model: &QueryModel, a: NodeId, b: NodeId) -> OptimizerResult<Ordering> {
        self(model, a, b)
    }
}

/// Cheapest-first by number of variables an operand leaves unbound
///
/// A statement pattern costs its non-constant variables; any other operand
/// costs the number of names it can bind.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarCountCostComparator;

impl VarCountCostComparator {
    fn cost(model: &QueryModel, node: NodeId) -> OptimizerResult<usize> {
        Ok(match model.expr(node)? {
            TupleExpr::StatementPattern(pattern) => pattern.vars().filter(|v| !v.has_value()).count(),
            _ => model.binding_names(node).len(),
        })
    }
}

impl CostComparator for VarCountCostComparator {
    fn compare(&self, model: &QueryModel, a: NodeId, b: NodeId) -> OptimizerResult<Ordering> {
        Ok(Self::cost(model, a)?.cmp(&Self::cost(model, b)?))
    }
}

/// Which child of each join continues the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    /// `((a ⋈ b) ⋈ c) ⋈ d`
    Left,
    /// `a ⋈ (b ⋈ (c ⋈ d))`
    Right,
}

/// Join reordering pass
pub struct QueryJoinOptimizer<'c> {
    comparator: &'c dyn CostComparator,
}

impl<'c> QueryJoinOptimizer<'c> {
    /// Create a new optimizer using `comparator`
    pub fn new(comparator: &'c dyn CostComparator) -> Self {
        Self { comparator }
    }

    /// Reorder every join chain in `model`, returning the (possibly new) root
    ///
    /// A comparator failure aborts the pass before the chain being sorted is
    /// touched; chains rewritten earlier stay rewritten and the model stays
    /// valid.
    pub fn optimize(&self, model: &mut QueryModel) -> OptimizerResult<NodeId> {
        let root = model.root().ok_or(OptimizerError::NoRoot)?;
        self.optimize_node(model, root)?;
        model.root().ok_or(OptimizerError::NoRoot)
    }

    /// Optimize the subtree at `node`, returning the node now in its place
    fn optimize_node(&self, model: &mut QueryModel, node: NodeId) -> OptimizerResult<NodeId> {
        let Some(orientation) = chain_orientation(model, node)? else {
            for child in model.children(node)? {
                self.optimize_node(model, child)?;
            }
            return Ok(node);
        };

        let operands = flatten(model, node, orientation)?;
        let sorted = self.sort(model, operands.clone())?;

        let chain_root = if sorted == operands {
            node
        } else {
            debug!(
                "Reordering {} join operands under {}: {:?} -> {:?}",
                operands.len(),
                node,
                operands,
                sorted
            );
            let rebuilt = rebuild(model, &sorted, orientation)?;
            model.replace(node, rebuilt)?;
            rebuilt
        };

        for operand in sorted {
            self.optimize_node(model, operand)?;
        }
        Ok(chain_root)
    }

    /// Stable bottom-up merge sort
    ///
    /// Runs of width 1, 2, 4... are merged pairwise; every run group counts
    /// as a merge, and sorting ends after a pass with at most one merge.
    fn sort(&self, model: &QueryModel, mut list: Vec<NodeId>) -> OptimizerResult<Vec<NodeId>> {
        let mut width = 1;
        loop {
            let mut merged = Vec::with_capacity(list.len());
            let mut merges = 0;
            let mut start = 0;

            while start < list.len() {
                merges += 1;
                let mid = (start + width).min(list.len());
                let end = (mid + width).min(list.len());
                let (mut i, mut j) = (start, mid);

                while i < mid && j < end {
                    if self.comparator.compare(model, list[i], list[j])? == Ordering::Greater {
                        merged.push(list[j]);
                        j += 1;
                    } else {
                        merged.push(list[i]);
                        i += 1;
                    }
                }
                merged.extend_from_slice(&list[i..mid]);
                merged.extend_from_slice(&list[j..end]);
                start = end;
            }

            list = merged;
            if merges <= 1 {
                return Ok(list);
            }
            width *= 2;
        }
    }
}

/// Orientation of the chain rooted at `node`, or `None` if `node` is not a
/// join with a nested join child
fn chain_orientation(model: &QueryModel, node: NodeId) -> OptimizerResult<Option<Orientation>> {
    let TupleExpr::Join { left, right } = model.expr(node)? else {
        return Ok(None);
    };
    Ok(if model.is_join(*left) {
        Some(Orientation::Left)
    } else if model.is_join(*right) {
        Some(Orientation::Right)
    } else {
        None
    })
}

/// Operands of the chain at `node`, left to right
///
/// A join on the side that does not continue the chain is an operand.
fn flatten(model: &QueryModel, node: NodeId, orientation: Orientation) -> OptimizerResult<Vec<NodeId>> {
    let mut operands = Vec::new();
    let mut current = node;
    loop {
        let TupleExpr::Join { left, right } = model.expr(current)? else {
            break;
        };
        let (next, operand) = match orientation {
            Orientation::Left => (*left, *right),
            Orientation::Right => (*right, *left),
        };
        operands.push(operand);
        if model.is_join(next) {
            current = next;
        } else {
            operands.push(next);
            break;
        }
    }

    // Collected from the root outward
    if orientation == Orientation::Left {
        operands.reverse();
    }
    Ok(operands)
}

/// Build a fresh join chain over `operands` and return its root
fn rebuild(model: &mut QueryModel, operands: &[NodeId], orientation: Orientation) -> OptimizerResult<NodeId> {
    // The old chain is discarded; its operands are re-attached below
    for operand in operands {
        model.detach(*operand)?;
    }

    match orientation {
        Orientation::Left => {
            let (&first, rest) = operands.split_first().ok_or(OptimizerError::NoRoot)?;
            let mut chain = first;
            for &operand in rest {
                chain = model.join(chain, operand)?;
            }
            Ok(chain)
        }
        Orientation::Right => {
            let (&last, rest) = operands.split_last().ok_or(OptimizerError::NoRoot)?;
            let mut chain = last;
            for &operand in rest.iter().rev() {
                chain = model.join(operand, chain)?;
            }
            Ok(chain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::algebra::{ProjectionElemList, StatementPattern, Var};
    use crate::rdf::NamedNode;

    /// Comparator over fixed per-node costs
    fn by_cost(costs: Vec<(NodeId, u32)>) -> impl Fn(&QueryModel, NodeId, NodeId) -> OptimizerResult<Ordering> {
        move |_: &QueryModel, a: NodeId, b: NodeId| {
            let cost = |n: NodeId| {
                costs
                    .iter()
                    .find(|(id, _)| *id == n)
                    .map(|(_, c)| *c)
                    .ok_or_else(|| OptimizerError::Comparator(format!("no cost for {}", n)))
            };
            Ok(cost(a)?.cmp(&cost(b)?))
        }
    }

    fn singletons(model: &mut QueryModel, n: usize) -> Vec<NodeId> {
        (0..n).map(|_| model.singleton().unwrap()).collect()
    }

    /// Leaf operands reachable through joins, left to right
    fn join_operands(model: &QueryModel, node: NodeId) -> Vec<NodeId> {
        match model.expr(node).unwrap() {
            TupleExpr::Join { left, right } => {
                let mut out = join_operands(model, *left);
                out.extend(join_operands(model, *right));
                out
            }
            _ => vec![node],
        }
    }

    fn left_deep(model: &mut QueryModel, operands: &[NodeId]) -> NodeId {
        let mut chain = operands[0];
        for &operand in &operands[1..] {
            chain = model.join(chain, operand).unwrap();
        }
        chain
    }

    #[test]
    fn test_reorders_left_deep_chain() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 4);
        let root = left_deep(&mut model, &ops);
        model.set_root(root).unwrap();

        let comparator = by_cost(vec![(ops[0], 4), (ops[1], 1), (ops[2], 3), (ops[3], 2)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();

        assert_ne!(new_root, root);
        assert_eq!(model.root(), Some(new_root));
        assert_eq!(join_operands(&model, new_root), vec![ops[1], ops[3], ops[2], ops[0]]);

        // Still left-deep
        let TupleExpr::Join { left, right } = model.expr(new_root).unwrap() else {
            panic!("expected a join at the root");
        };
        assert!(model.is_join(*left));
        assert_eq!(*right, ops[0]);
        assert_eq!(model.parent(ops[0]).unwrap(), Some(new_root));
    }

    #[test]
    fn test_right_deep_chain_keeps_orientation() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 3);
        let inner = model.join(ops[1], ops[2]).unwrap();
        let root = model.join(ops[0], inner).unwrap();
        model.set_root(root).unwrap();

        let comparator = by_cost(vec![(ops[0], 3), (ops[1], 2), (ops[2], 1)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();

        assert_eq!(join_operands(&model, new_root), vec![ops[2], ops[1], ops[0]]);
        let TupleExpr::Join { left, right } = model.expr(new_root).unwrap() else {
            panic!("expected a join at the root");
        };
        assert_eq!(*left, ops[2]);
        assert!(model.is_join(*right));
    }

    #[test]
    fn test_equal_costs_keep_tree() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 5);
        let root = left_deep(&mut model, &ops);
        model.set_root(root).unwrap();
        let before = model.to_string();
        let allocated = model.len();

        let equal = |_: &QueryModel, _: NodeId, _: NodeId| Ok::<_, OptimizerError>(Ordering::Equal);
        let new_root = QueryJoinOptimizer::new(&equal).optimize(&mut model).unwrap();

        assert_eq!(new_root, root);
        assert_eq!(model.len(), allocated);
        assert_eq!(model.to_string(), before);
        assert_eq!(join_operands(&model, root), ops);
    }

    #[test]
    fn test_ties_keep_left_to_right_order() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 5);
        let root = left_deep(&mut model, &ops);
        model.set_root(root).unwrap();

        let comparator = by_cost(vec![(ops[0], 2), (ops[1], 1), (ops[2], 2), (ops[3], 1), (ops[4], 2)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();

        assert_eq!(
            join_operands(&model, new_root),
            vec![ops[1], ops[3], ops[0], ops[2], ops[4]]
        );
    }

    #[test]
    fn test_mixed_orientation_keeps_every_operand() {
        // ((a ⋈ (b ⋈ c)) ⋈ d): the inner right-hand join is an operand of the outer chain
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 4);
        let bc = model.join(ops[1], ops[2]).unwrap();
        let abc = model.join(ops[0], bc).unwrap();
        let root = model.join(abc, ops[3]).unwrap();
        model.set_root(root).unwrap();

        let comparator = by_cost(vec![(ops[0], 9), (bc, 5), (ops[3], 1), (ops[1], 2), (ops[2], 1)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();

        let mut found = join_operands(&model, new_root);
        assert_eq!(found.len(), 4);
        found.sort();
        assert_eq!(found, ops);

        // Outer chain sorted as [d, (b ⋈ c), a]
        let TupleExpr::Join { left, right } = model.expr(new_root).unwrap() else {
            panic!("expected a join at the root");
        };
        assert_eq!(*right, ops[0]);
        let TupleExpr::Join { left: first, right: second } = model.expr(*left).unwrap() else {
            panic!("expected a nested join");
        };
        assert_eq!(*first, ops[3]);
        assert_eq!(*second, bc);
    }

    #[test]
    fn test_two_operand_join_untouched() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 2);
        let root = model.join(ops[0], ops[1]).unwrap();
        model.set_root(root).unwrap();

        let comparator = by_cost(vec![(ops[0], 9), (ops[1], 1)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();

        assert_eq!(new_root, root);
        assert_eq!(join_operands(&model, root), ops);
    }

    #[test]
    fn test_comparator_failure_leaves_tree_intact() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 4);
        let root = left_deep(&mut model, &ops);
        model.set_root(root).unwrap();
        let before = model.to_string();

        // ops[3] has no cost
        let comparator = by_cost(vec![(ops[0], 3), (ops[1], 2), (ops[2], 1)]);
        let result = QueryJoinOptimizer::new(&comparator).optimize(&mut model);

        assert!(matches!(result, Err(OptimizerError::Comparator(_))));
        assert_eq!(model.root(), Some(root));
        assert_eq!(model.to_string(), before);
        assert_eq!(join_operands(&model, root), ops);
    }

    #[test]
    fn test_chain_below_projection_is_spliced() {
        let mut model = QueryModel::new();
        let ops = singletons(&mut model, 3);
        let chain = left_deep(&mut model, &ops);
        let projection = model.projection(chain, ProjectionElemList::of_names(&["x"])).unwrap();
        model.set_root(projection).unwrap();

        let comparator = by_cost(vec![(ops[0], 3), (ops[1], 2), (ops[2], 1)]);
        let new_root = QueryJoinOptimizer::new(&comparator).optimize(&mut model).unwrap();
        assert_eq!(new_root, projection);

        let TupleExpr::Projection { arg, .. } = model.expr(projection).unwrap() else {
            panic!("expected a projection");
        };
        assert_ne!(*arg, chain);
        assert_eq!(model.parent(*arg).unwrap(), Some(projection));
        assert_eq!(model.parent(chain).unwrap(), None);
        assert_eq!(join_operands(&model, *arg), vec![ops[2], ops[1], ops[0]]);
    }

    #[test]
    fn test_var_count_comparator_prefers_bound_patterns() {
        let knows = NamedNode::new("http://example.org/knows").unwrap();
        let alice = NamedNode::new("http://example.org/alice").unwrap();

        let mut model = QueryModel::new();
        let open = model
            .statement_pattern(StatementPattern::new(Var::new("a"), Var::new("p"), Var::new("b")))
            .unwrap();
        let half = model
            .statement_pattern(StatementPattern::new(
                Var::new("a"),
                Var::constant("-const-knows", knows.clone()),
                Var::new("b"),
            ))
            .unwrap();
        let bound = model
            .statement_pattern(StatementPattern::new(
                Var::constant("-const-alice", alice),
                Var::constant("-const-knows", knows),
                Var::new("b"),
            ))
            .unwrap();
        let root = left_deep(&mut model, &[open, half, bound]);
        model.set_root(root).unwrap();

        let new_root = QueryJoinOptimizer::new(&VarCountCostComparator).optimize(&mut model).unwrap();
        assert_eq!(join_operands(&model, new_root), vec![bound, half, open]);
    }

    #[test]
    fn test_empty_model() {
        let mut model = QueryModel::new();
        let result = QueryJoinOptimizer::new(&VarCountCostComparator).optimize(&mut model);
        assert_eq!(result, Err(OptimizerError::NoRoot));
    }
}
