//! Query algebra
//!
//! A query is a tree of tuple expressions stored in an arena ([`QueryModel`])
//! and addressed by [`NodeId`]. Every node records its parent, so a subtree
//! can be swapped for another with a single slot rewrite
//! ([`QueryModel::replace`]). Scalar and boolean conditions are
//! [`ValueExpr`] trees owned by the tuple node that uses them; sub-queries
//! referenced from `Exists` and `In` are ordinary arena nodes whose parent is
//! that owning node.

use crate::rdf::RdfTerm;
use indexmap::IndexSet;
use regex::{Regex, RegexBuilder};
use std::fmt;
use thiserror::Error;

/// Query model errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgebraError {
    /// Node id not allocated by this model
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Node already has a parent and cannot be attached again
    #[error("Node {0} is already attached to a parent")]
    AlreadyAttached(NodeId),

    /// Multi-projection without projections
    #[error("Multi-projection requires at least one projection")]
    EmptyMultiProjection,

    /// Regular expression that does not compile
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(String),
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

/// Index of a node in a [`QueryModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Query variable, optionally fixed to a constant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    /// Variable name
    name: String,
    /// Constant value, for pattern positions written as terms
    value: Option<RdfTerm>,
}

impl Var {
    /// Create a free variable
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create a variable fixed to `value`
    pub fn constant(name: impl Into<String>, value: impl Into<RdfTerm>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constant value, if any
    pub fn value(&self) -> Option<&RdfTerm> {
        self.value.as_ref()
    }

    /// True for constants
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}", value),
            None => write!(f, "?{}", self.name),
        }
    }
}

/// Which graphs a statement pattern ranges over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Default graph and all named graphs
    #[default]
    AllContexts,
    /// Only the default graph
    NullContext,
    /// Only named graphs
    NamedContexts,
}

/// Triple pattern with an optional context variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementPattern {
    /// Subject position
    pub subject: Var,
    /// Predicate position
    pub predicate: Var,
    /// Object position
    pub object: Var,
    /// Context (named graph) position
    pub context: Option<Var>,
    /// Graph scope
    pub scope: Scope,
}

impl StatementPattern {
    /// Create a new pattern over all contexts
    pub fn new(subject: Var, predicate: Var, object: Var) -> Self {
        Self {
            subject,
            predicate,
            object,
            context: None,
            scope: Scope::AllContexts,
        }
    }

    /// Bind the matched graph to `context`
    pub fn with_context(mut self, context: Var) -> Self {
        self.context = Some(context);
        self
    }

    /// Restrict the pattern to `scope`
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Subject, predicate, object and context variables, in that order
    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .chain(self.context.as_ref())
    }
}

impl fmt::Display for StatementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(context) = &self.context {
            write!(f, " {}", context)?;
        }
        match self.scope {
            Scope::AllContexts => Ok(()),
            Scope::NullContext => write!(f, " [default graph]"),
            Scope::NamedContexts => write!(f, " [named graphs]"),
        }
    }
}

/// Copies the value of `source` into `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionElem {
    /// Name read from the input row
    pub source: String,
    /// Name written to the output row
    pub target: String,
}

impl ProjectionElem {
    /// Create a renaming element
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Create an element that keeps the name
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            target: name,
        }
    }
}

/// Ordered list of projection elements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectionElemList {
    elements: Vec<ProjectionElem>,
}

impl ProjectionElemList {
    /// Create a new element list
    pub fn new(elements: Vec<ProjectionElem>) -> Self {
        Self { elements }
    }

    /// Identity projection of `names`
    pub fn of_names(names: &[&str]) -> Self {
        Self::new(names.iter().map(|name| ProjectionElem::same(*name)).collect())
    }

    /// Iterate over the elements
    pub fn iter(&self) -> std::slice::Iter<'_, ProjectionElem> {
        self.elements.iter()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if there are no elements
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Output names
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.target.as_str())
    }
}

impl fmt::Display for ProjectionElemList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if elem.source == elem.target {
                write!(f, "{}", elem.source)?;
            } else {
                write!(f, "{} AS {}", elem.source, elem.target)?;
            }
        }
        Ok(())
    }
}

/// Computed binding added by an extension
#[derive(Debug, Clone)]
pub struct ExtensionElem {
    /// Name of the new binding
    pub name: String,
    /// Expression producing its value
    pub expr: ValueExpr,
}

impl ExtensionElem {
    /// Create a new extension element
    pub fn new(name: impl Into<String>, expr: ValueExpr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathOp {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl MathOp {
    /// Operator symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            MathOp::Plus => "+",
            MathOp::Minus => "-",
            MathOp::Multiply => "*",
            MathOp::Divide => "/",
        }
    }
}

/// Compiled regular expression together with its source text
#[derive(Debug, Clone)]
pub struct RegexPattern {
    /// Compiled matcher
    regex: Regex,
    /// Pattern as written
    source: String,
    /// Flags as written (`i`, `m`, `s`, `x`)
    flags: String,
}

impl RegexPattern {
    /// Compile `pattern` with XPath-style `flags`
    pub fn new(pattern: &str, flags: &str) -> AlgebraResult<Self> {
        let mut builder = RegexBuilder::new(pattern);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(AlgebraError::InvalidRegex(format!("unsupported flag '{}'", other)))
                }
            };
        }
        let regex = builder
            .build()
            .map_err(|e| AlgebraError::InvalidRegex(e.to_string()))?;
        Ok(Self {
            regex,
            source: pattern.to_string(),
            flags: flags.to_string(),
        })
    }

    /// True if the pattern matches anywhere in `text`
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Scalar and boolean expressions
#[derive(Debug, Clone)]
pub enum ValueExpr {
    /// Variable (or constant-valued variable)
    Var(Var),
    /// Constant term
    Constant(RdfTerm),
    /// Logical conjunction
    And(Box<ValueExpr>, Box<ValueExpr>),
    /// Logical disjunction
    Or(Box<ValueExpr>, Box<ValueExpr>),
    /// Logical negation
    Not(Box<ValueExpr>),
    /// Typed comparison
    Compare {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: CompareOp,
    },
    /// Numeric arithmetic
    Math {
        left: Box<ValueExpr>,
        right: Box<ValueExpr>,
        op: MathOp,
    },
    /// Regular expression match on an IRI string or literal label
    Regex {
        arg: Box<ValueExpr>,
        pattern: RegexPattern,
    },
    /// `*`-wildcard match on an IRI string or literal label
    Like {
        arg: Box<ValueExpr>,
        pattern: String,
        case_sensitive: bool,
    },
    /// Variable is bound
    Bound(String),
    /// Term is an IRI
    IsUri(Box<ValueExpr>),
    /// Term is a blank node
    IsBNode(Box<ValueExpr>),
    /// Term is a literal
    IsLiteral(Box<ValueExpr>),
    /// Term is an IRI or a blank node
    IsResource(Box<ValueExpr>),
    /// String form of an IRI or literal
    Str(Box<ValueExpr>),
    /// Label of a literal
    Label(Box<ValueExpr>),
    /// Language tag of a literal
    Lang(Box<ValueExpr>),
    /// Datatype IRI of a literal
    Datatype(Box<ValueExpr>),
    /// Local name of an IRI
    LocalName(Box<ValueExpr>),
    /// Namespace of an IRI
    Namespace(Box<ValueExpr>),
    /// Fresh blank node
    BNodeGenerator,
    /// Sub-query has at least one row
    Exists(NodeId),
    /// Value occurs in the first column of a sub-query
    In {
        arg: Box<ValueExpr>,
        subquery: NodeId,
    },
}

impl ValueExpr {
    /// Variable reference
    pub fn var(name: impl Into<String>) -> Self {
        ValueExpr::Var(Var::new(name))
    }

    /// Constant term
    pub fn constant(value: impl Into<RdfTerm>) -> Self {
        ValueExpr::Constant(value.into())
    }

    /// `left && right`
    pub fn and(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::And(Box::new(left), Box::new(right))
    }

    /// `left || right`
    pub fn or(left: ValueExpr, right: ValueExpr) -> Self {
        ValueExpr::Or(Box::new(left), Box::new(right))
    }

    /// `!arg`
    pub fn not(arg: ValueExpr) -> Self {
        ValueExpr::Not(Box::new(arg))
    }

    /// `left op right`
    pub fn compare(left: ValueExpr, op: CompareOp, right: ValueExpr) -> Self {
        ValueExpr::Compare {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// `left op right` (arithmetic)
    pub fn math(left: ValueExpr, op: MathOp, right: ValueExpr) -> Self {
        ValueExpr::Math {
            left: Box::new(left),
            right: Box::new(right),
            op,
        }
    }

    /// `regex(arg, pattern, flags)`; fails if the pattern does not compile
    pub fn regex(arg: ValueExpr, pattern: &str, flags: &str) -> AlgebraResult<Self> {
        Ok(ValueExpr::Regex {
            arg: Box::new(arg),
            pattern: RegexPattern::new(pattern, flags)?,
        })
    }

    /// `arg LIKE pattern`
    pub fn like(arg: ValueExpr, pattern: impl Into<String>, case_sensitive: bool) -> Self {
        ValueExpr::Like {
            arg: Box::new(arg),
            pattern: pattern.into(),
            case_sensitive,
        }
    }

    /// Collect sub-query roots referenced by this expression
    pub fn subqueries(&self, out: &mut Vec<NodeId>) {
        match self {
            ValueExpr::Exists(node) => out.push(*node),
            ValueExpr::In { arg, subquery } => {
                arg.subqueries(out);
                out.push(*subquery);
            }
            ValueExpr::And(l, r) | ValueExpr::Or(l, r) => {
                l.subqueries(out);
                r.subqueries(out);
            }
            ValueExpr::Compare { left, right, .. } | ValueExpr::Math { left, right, .. } => {
                left.subqueries(out);
                right.subqueries(out);
            }
            ValueExpr::Not(arg)
            | ValueExpr::IsUri(arg)
            | ValueExpr::IsBNode(arg)
            | ValueExpr::IsLiteral(arg)
            | ValueExpr::IsResource(arg)
            | ValueExpr::Str(arg)
            | ValueExpr::Label(arg)
            | ValueExpr::Lang(arg)
            | ValueExpr::Datatype(arg)
            | ValueExpr::LocalName(arg)
            | ValueExpr::Namespace(arg)
            | ValueExpr::Regex { arg, .. }
            | ValueExpr::Like { arg, .. } => arg.subqueries(out),
            ValueExpr::Var(_)
            | ValueExpr::Constant(_)
            | ValueExpr::Bound(_)
            | ValueExpr::BNodeGenerator => {}
        }
    }

    fn replace_subquery(&mut self, old: NodeId, new: NodeId) -> bool {
        match self {
            ValueExpr::Exists(node) if *node == old => {
                *node = new;
                true
            }
            ValueExpr::In { subquery, .. } if *subquery == old => {
                *subquery = new;
                true
            }
            ValueExpr::In { arg, .. } => arg.replace_subquery(old, new),
            ValueExpr::And(l, r) | ValueExpr::Or(l, r) => {
                l.replace_subquery(old, new) || r.replace_subquery(old, new)
            }
            ValueExpr::Compare { left, right, .. } | ValueExpr::Math { left, right, .. } => {
                left.replace_subquery(old, new) || right.replace_subquery(old, new)
            }
            ValueExpr::Not(arg)
            | ValueExpr::IsUri(arg)
            | ValueExpr::IsBNode(arg)
            | ValueExpr::IsLiteral(arg)
            | ValueExpr::IsResource(arg)
            | ValueExpr::Str(arg)
            | ValueExpr::Label(arg)
            | ValueExpr::Lang(arg)
            | ValueExpr::Datatype(arg)
            | ValueExpr::LocalName(arg)
            | ValueExpr::Namespace(arg)
            | ValueExpr::Regex { arg, .. }
            | ValueExpr::Like { arg, .. } => arg.replace_subquery(old, new),
            _ => false,
        }
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueExpr::Var(var) => write!(f, "{}", var),
            ValueExpr::Constant(value) => write!(f, "{}", value),
            ValueExpr::And(l, r) => write!(f, "({} && {})", l, r),
            ValueExpr::Or(l, r) => write!(f, "({} || {})", l, r),
            ValueExpr::Not(arg) => write!(f, "!{}", arg),
            ValueExpr::Compare { left, right, op } => write!(f, "({} {} {})", left, op.symbol(), right),
            ValueExpr::Math { left, right, op } => write!(f, "({} {} {})", left, op.symbol(), right),
            ValueExpr::Regex { arg, pattern } => {
                write!(f, "regex({}, \"{}\", \"{}\")", arg, pattern.source, pattern.flags)
            }
            ValueExpr::Like { arg, pattern, case_sensitive } => {
                write!(f, "{} LIKE \"{}\"", arg, pattern)?;
                if !case_sensitive {
                    write!(f, " IGNORE CASE")?;
                }
                Ok(())
            }
            ValueExpr::Bound(name) => write!(f, "bound(?{})", name),
            ValueExpr::IsUri(arg) => write!(f, "isURI({})", arg),
            ValueExpr::IsBNode(arg) => write!(f, "isBNode({})", arg),
            ValueExpr::IsLiteral(arg) => write!(f, "isLiteral({})", arg),
            ValueExpr::IsResource(arg) => write!(f, "isResource({})", arg),
            ValueExpr::Str(arg) => write!(f, "str({})", arg),
            ValueExpr::Label(arg) => write!(f, "label({})", arg),
            ValueExpr::Lang(arg) => write!(f, "lang({})", arg),
            ValueExpr::Datatype(arg) => write!(f, "datatype({})", arg),
            ValueExpr::LocalName(arg) => write!(f, "localName({})", arg),
            ValueExpr::Namespace(arg) => write!(f, "namespace({})", arg),
            ValueExpr::BNodeGenerator => write!(f, "bnode()"),
            ValueExpr::Exists(node) => write!(f, "exists({})", node),
            ValueExpr::In { arg, subquery } => write!(f, "{} IN {}", arg, subquery),
        }
    }
}

/// Tuple-producing algebra operators
#[derive(Debug, Clone)]
pub enum TupleExpr {
    /// Match a triple pattern against the triple source
    StatementPattern(StatementPattern),
    /// Inner join
    Join { left: NodeId, right: NodeId },
    /// Left outer join with an optional condition on the joined row
    OptionalJoin {
        left: NodeId,
        right: NodeId,
        condition: Option<ValueExpr>,
    },
    /// Filter
    Selection { arg: NodeId, condition: ValueExpr },
    /// Rename/restrict columns
    Projection {
        arg: NodeId,
        elements: ProjectionElemList,
    },
    /// One output row per projection for every input row
    MultiProjection {
        arg: NodeId,
        projections: Vec<ProjectionElemList>,
    },
    /// Add computed bindings
    Extension {
        arg: NodeId,
        elements: Vec<ExtensionElem>,
    },
    /// Rows of `left` followed by rows of `right`
    Union { left: NodeId, right: NodeId },
    /// Rows of `left` that do not occur in `right`
    Difference { left: NodeId, right: NodeId },
    /// Rows of `left` that also occur in `right`
    Intersection { left: NodeId, right: NodeId },
    /// Drop duplicate rows
    Distinct { arg: NodeId },
    /// Skip `offset` rows, then keep at most `limit`
    Slice {
        arg: NodeId,
        offset: usize,
        limit: Option<usize>,
    },
    /// The input bindings, once
    SingletonSet,
    /// No rows
    EmptySet,
}

impl TupleExpr {
    /// Operator name
    pub fn name(&self) -> &'static str {
        match self {
            TupleExpr::StatementPattern(_) => "StatementPattern",
            TupleExpr::Join { .. } => "Join",
            TupleExpr::OptionalJoin { .. } => "OptionalJoin",
            TupleExpr::Selection { .. } => "Selection",
            TupleExpr::Projection { .. } => "Projection",
            TupleExpr::MultiProjection { .. } => "MultiProjection",
            TupleExpr::Extension { .. } => "Extension",
            TupleExpr::Union { .. } => "Union",
            TupleExpr::Difference { .. } => "Difference",
            TupleExpr::Intersection { .. } => "Intersection",
            TupleExpr::Distinct { .. } => "Distinct",
            TupleExpr::Slice { .. } => "Slice",
            TupleExpr::SingletonSet => "SingletonSet",
            TupleExpr::EmptySet => "EmptySet",
        }
    }

    /// Tuple operands followed by sub-queries of contained expressions
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self {
            TupleExpr::Join { left, right }
            | TupleExpr::Union { left, right }
            | TupleExpr::Difference { left, right }
            | TupleExpr::Intersection { left, right } => {
                out.push(*left);
                out.push(*right);
            }
            TupleExpr::OptionalJoin { left, right, condition } => {
                out.push(*left);
                out.push(*right);
                if let Some(condition) = condition {
                    condition.subqueries(&mut out);
                }
            }
            TupleExpr::Selection { arg, condition } => {
                out.push(*arg);
                condition.subqueries(&mut out);
            }
            TupleExpr::Extension { arg, elements } => {
                out.push(*arg);
                for elem in elements {
                    elem.expr.subqueries(&mut out);
                }
            }
            TupleExpr::Projection { arg, .. }
            | TupleExpr::MultiProjection { arg, .. }
            | TupleExpr::Distinct { arg }
            | TupleExpr::Slice { arg, .. } => out.push(*arg),
            TupleExpr::StatementPattern(_) | TupleExpr::SingletonSet | TupleExpr::EmptySet => {}
        }
        out
    }

    fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let swap = |slot: &mut NodeId| {
            if *slot == old {
                *slot = new;
                true
            } else {
                false
            }
        };
        match self {
            TupleExpr::Join { left, right }
            | TupleExpr::Union { left, right }
            | TupleExpr::Difference { left, right }
            | TupleExpr::Intersection { left, right } => swap(left) || swap(right),
            TupleExpr::OptionalJoin { left, right, condition } => {
                swap(left)
                    || swap(right)
                    || condition
                        .as_mut()
                        .map_or(false, |c| c.replace_subquery(old, new))
            }
            TupleExpr::Selection { arg, condition } => {
                swap(arg) || condition.replace_subquery(old, new)
            }
            TupleExpr::Extension { arg, elements } => {
                swap(arg)
                    || elements
                        .iter_mut()
                        .any(|elem| elem.expr.replace_subquery(old, new))
            }
            TupleExpr::Projection { arg, .. }
            | TupleExpr::MultiProjection { arg, .. }
            | TupleExpr::Distinct { arg }
            | TupleExpr::Slice { arg, .. } => swap(arg),
            TupleExpr::StatementPattern(_) | TupleExpr::SingletonSet | TupleExpr::EmptySet => false,
        }
    }
}

/// Arena slot
#[derive(Debug, Clone)]
struct Node {
    /// Operator
    expr: TupleExpr,
    /// Owning node; `None` for the root and for detached nodes
    parent: Option<NodeId>,
}

/// Arena-backed query tree
///
/// Nodes are appended and never removed. Nodes replaced by
/// [`replace`](Self::replace) stay in the arena but are unreachable from the
/// root.
#[derive(Debug, Clone, Default)]
pub struct QueryModel {
    /// All nodes ever allocated
    nodes: Vec<Node>,
    /// Root of the tree
    root: Option<NodeId>,
}

impl QueryModel {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes, reachable or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no node was allocated
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root node
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `node` the root; it must not have a parent
    pub fn set_root(&mut self, node: NodeId) -> AlgebraResult<()> {
        if self.slot(node)?.parent.is_some() {
            return Err(AlgebraError::AlreadyAttached(node));
        }
        self.root = Some(node);
        Ok(())
    }

    /// Operator stored at `node`
    pub fn expr(&self, node: NodeId) -> AlgebraResult<&TupleExpr> {
        self.slot(node).map(|n| &n.expr)
    }

    /// Parent of `node`
    pub fn parent(&self, node: NodeId) -> AlgebraResult<Option<NodeId>> {
        self.slot(node).map(|n| n.parent)
    }

    /// Children of `node` (operands, then sub-queries)
    pub fn children(&self, node: NodeId) -> AlgebraResult<Vec<NodeId>> {
        self.expr(node).map(TupleExpr::children)
    }

    /// True if `node` is a [`TupleExpr::Join`]
    pub fn is_join(&self, node: NodeId) -> bool {
        matches!(self.expr(node), Ok(TupleExpr::Join { .. }))
    }

    fn slot(&self, node: NodeId) -> AlgebraResult<&Node> {
        self.nodes.get(node.0).ok_or(AlgebraError::UnknownNode(node))
    }

    fn slot_mut(&mut self, node: NodeId) -> AlgebraResult<&mut Node> {
        self.nodes.get_mut(node.0).ok_or(AlgebraError::UnknownNode(node))
    }

    /// Append `expr` and attach its children to it
    ///
    /// Every child must exist and be unattached, and may appear only once.
    pub fn add(&mut self, expr: TupleExpr) -> AlgebraResult<NodeId> {
        if let TupleExpr::MultiProjection { projections, .. } = &expr {
            if projections.is_empty() {
                return Err(AlgebraError::EmptyMultiProjection);
            }
        }

        let children = expr.children();
        for (i, child) in children.iter().enumerate() {
            if self.slot(*child)?.parent.is_some()
                || self.root == Some(*child)
                || children[..i].contains(child)
            {
                return Err(AlgebraError::AlreadyAttached(*child));
            }
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { expr, parent: None });
        for child in children {
            self.slot_mut(child)?.parent = Some(id);
        }
        Ok(id)
    }

    /// Add a statement pattern leaf
    pub fn statement_pattern(&mut self, pattern: StatementPattern) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::StatementPattern(pattern))
    }

    /// Add an inner join
    pub fn join(&mut self, left: NodeId, right: NodeId) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Join { left, right })
    }

    /// Add a left outer join
    pub fn optional_join(
        &mut self,
        left: NodeId,
        right: NodeId,
        condition: Option<ValueExpr>,
    ) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::OptionalJoin { left, right, condition })
    }

    /// Add a filter
    pub fn selection(&mut self, arg: NodeId, condition: ValueExpr) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Selection { arg, condition })
    }

    /// Add a projection
    pub fn projection(&mut self, arg: NodeId, elements: ProjectionElemList) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Projection { arg, elements })
    }

    /// Add a multi-projection; fails on an empty projection list
    pub fn multi_projection(
        &mut self,
        arg: NodeId,
        projections: Vec<ProjectionElemList>,
    ) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::MultiProjection { arg, projections })
    }

    /// Add an extension
    pub fn extension(&mut self, arg: NodeId, elements: Vec<ExtensionElem>) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Extension { arg, elements })
    }

    /// Add a union
    pub fn union(&mut self, left: NodeId, right: NodeId) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Union { left, right })
    }

    /// Add a difference (minus)
    pub fn difference(&mut self, left: NodeId, right: NodeId) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Difference { left, right })
    }

    /// Add an intersection
    pub fn intersection(&mut self, left: NodeId, right: NodeId) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Intersection { left, right })
    }

    /// Add duplicate elimination
    pub fn distinct(&mut self, arg: NodeId) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Distinct { arg })
    }

    /// Add offset/limit
    pub fn slice(&mut self, arg: NodeId, offset: usize, limit: Option<usize>) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::Slice { arg, offset, limit })
    }

    /// Add a singleton-set leaf
    pub fn singleton(&mut self) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::SingletonSet)
    }

    /// Add an empty-set leaf
    pub fn empty_set(&mut self) -> AlgebraResult<NodeId> {
        self.add(TupleExpr::EmptySet)
    }

    /// Clear the parent link of `node` without touching the parent's slot.
    /// Used when the parent itself is about to be discarded.
    pub(crate) fn detach(&mut self, node: NodeId) -> AlgebraResult<()> {
        self.slot_mut(node)?.parent = None;
        Ok(())
    }

    /// Put `new` where `old` is: in `old`'s parent slot, or as the root.
    /// `new` must be unattached; `old` ends up detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> AlgebraResult<()> {
        if old == new {
            return Ok(());
        }
        if self.slot(new)?.parent.is_some() {
            return Err(AlgebraError::AlreadyAttached(new));
        }
        match self.slot(old)?.parent {
            Some(parent) => {
                self.slot_mut(parent)?.expr.replace_child(old, new);
                self.slot_mut(new)?.parent = Some(parent);
                self.slot_mut(old)?.parent = None;
            }
            None => {
                if self.root == Some(old) {
                    self.root = Some(new);
                }
            }
        }
        Ok(())
    }

    /// Variable names `node` can bind, in first-seen order
    pub fn binding_names(&self, node: NodeId) -> Vec<String> {
        let mut names = IndexSet::new();
        self.collect_binding_names(node, &mut names);
        names.into_iter().collect()
    }

    fn collect_binding_names(&self, node: NodeId, names: &mut IndexSet<String>) {
        let Ok(expr) = self.expr(node) else {
            return;
        };
        match expr {
            TupleExpr::StatementPattern(pattern) => {
                for var in pattern.vars().filter(|v| !v.has_value()) {
                    names.insert(var.name().to_string());
                }
            }
            TupleExpr::Join { left, right }
            | TupleExpr::OptionalJoin { left, right, .. }
            | TupleExpr::Union { left, right }
            | TupleExpr::Intersection { left, right } => {
                self.collect_binding_names(*left, names);
                self.collect_binding_names(*right, names);
            }
            TupleExpr::Difference { left, .. } => self.collect_binding_names(*left, names),
            TupleExpr::Selection { arg, .. }
            | TupleExpr::Distinct { arg }
            | TupleExpr::Slice { arg, .. } => self.collect_binding_names(*arg, names),
            TupleExpr::Projection { elements, .. } => {
                names.extend(elements.target_names().map(str::to_string));
            }
            TupleExpr::MultiProjection { projections, .. } => {
                for elements in projections {
                    names.extend(elements.target_names().map(str::to_string));
                }
            }
            TupleExpr::Extension { arg, elements } => {
                self.collect_binding_names(*arg, names);
                names.extend(elements.iter().map(|e| e.name.clone()));
            }
            TupleExpr::SingletonSet | TupleExpr::EmptySet => {}
        }
    }

    fn render(&self, node: NodeId, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "   ".repeat(depth);
        let expr = match self.expr(node) {
            Ok(expr) => expr,
            Err(_) => return writeln!(f, "{}<missing {}>", indent, node),
        };
        write!(f, "{}{}", indent, expr.name())?;
        match expr {
            TupleExpr::StatementPattern(pattern) => write!(f, " ({})", pattern)?,
            TupleExpr::OptionalJoin { condition: Some(c), .. } => write!(f, " [{}]", c)?,
            TupleExpr::Selection { condition, .. } => write!(f, " [{}]", condition)?,
            TupleExpr::Projection { elements, .. } => write!(f, " ({})", elements)?,
            TupleExpr::MultiProjection { projections, .. } => {
                let rendered: Vec<String> = projections.iter().map(|p| format!("({})", p)).collect();
                write!(f, " {}", rendered.join(" "))?;
            }
            TupleExpr::Extension { elements, .. } => {
                let rendered: Vec<String> =
                    elements.iter().map(|e| format!("{} AS {}", e.expr, e.name)).collect();
                write!(f, " ({})", rendered.join(", "))?;
            }
            TupleExpr::Slice { offset, limit, .. } => {
                write!(f, " (offset={}", offset)?;
                if let Some(limit) = limit {
                    write!(f, ", limit={}", limit)?;
                }
                write!(f, ")")?;
            }
            _ => {}
        }
        writeln!(f)?;
        for child in expr.children() {
            self.render(child, depth + 1, f)?;
        }
        Ok(())
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => self.render(root, 0, f),
            None => writeln!(f, "<empty query model>"),
        }
    }
}
