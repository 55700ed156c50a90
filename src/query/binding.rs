//! Binding sets (result rows)
//!
//! Rows flow through the evaluation pipeline as [`QueryBindingSet`]s and are
//! handed to result consumers as [`ListBindingSet`]s. Both implement
//! [`BindingSet`] and agree on equality and hashing:
//!
//! - two rows are equal when they bind the same names to equal terms,
//!   regardless of insertion order or representation
//! - the hash of a row is the XOR of its bindings' hashes, so it does not
//!   depend on order either
//!
//! No two bindings of one row share a name.
//!
//! Unbound variables are simply absent; they are skipped by `size()` and
//! iteration.

use crate::rdf::RdfTerm;
use indexmap::IndexMap;
use rustc_hash::{FxHashSet, FxHasher};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;

/// Binding set construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingSetError {
    /// Positional row with a value list that does not match its name list
    #[error("Binding names ({names}) and values ({values}) differ in length")]
    LengthMismatch { names: usize, values: usize },

    /// Positional row whose name list repeats a name
    #[error("Duplicate binding name: {0}")]
    DuplicateName(String),
}

/// A single `name = value` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Variable name
    name: String,
    /// Bound term
    value: RdfTerm,
}

impl Binding {
    /// Create a new binding
    pub fn new(name: impl Into<String>, value: RdfTerm) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound term
    pub fn value(&self) -> &RdfTerm {
        &self.value
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Contribution of one binding to the order-independent row hash
pub fn binding_hash(name: &str, value: &RdfTerm) -> u64 {
    let mut hasher = FxHasher::default();
    (name, value).hash(&mut hasher);
    hasher.finish()
}

/// Read access shared by every row representation
pub trait BindingSet: fmt::Debug {
    /// Term bound to `name`, if any
    fn get(&self, name: &str) -> Option<&RdfTerm>;

    /// Bound `(name, term)` pairs in the row's natural order
    fn bindings(&self) -> Box<dyn Iterator<Item = (&str, &RdfTerm)> + '_>;

    /// Number of bound variables
    fn size(&self) -> usize;

    /// Names of the bound variables, in the row's natural order
    fn binding_names(&self) -> Vec<&str> {
        self.bindings().map(|(name, _)| name).collect()
    }

    /// Check if a variable is bound
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Owned binding for `name`, if bound
    fn get_binding(&self, name: &str) -> Option<Binding> {
        self.get(name).map(|value| Binding::new(name, value.clone()))
    }

    /// True if no variable is bound
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// XOR of [`binding_hash`] over every binding
    fn set_hash(&self) -> u64 {
        self.bindings()
            .fold(0, |acc, (name, value)| acc ^ binding_hash(name, value))
    }

    /// Set equality: same size and every binding of `other` is present here
    fn same_bindings(&self, other: &dyn BindingSet) -> bool {
        self.size() == other.size()
            && other
                .bindings()
                .all(|(name, value)| self.get(name) == Some(value))
    }
}

fn write_bindings(set: &dyn BindingSet, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, (name, value)) in set.bindings().enumerate() {
        if i > 0 {
            write!(f, ";")?;
        }
        write!(f, "{}={}", name, value)?;
    }
    write!(f, "]")
}

/// Mutable, associative row used during evaluation
///
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct QueryBindingSet {
    /// Variable bindings (name -> term)
    bindings: IndexMap<String, RdfTerm>,
}

impl QueryBindingSet {
    /// Create a new empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` bindings
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: IndexMap::with_capacity(capacity),
        }
    }

    /// Copy every binding of another row
    pub fn from_bindings(other: &dyn BindingSet) -> Self {
        let mut set = Self::with_capacity(other.size());
        set.add_all(other);
        set
    }

    /// Bind `name` to `value`, replacing an existing binding
    pub fn add_binding(&mut self, name: impl Into<String>, value: RdfTerm) {
        self.bindings.insert(name.into(), value);
    }

    /// Bind or unbind `name`; `None` removes the binding
    pub fn set_binding(&mut self, name: &str, value: Option<RdfTerm>) {
        match value {
            Some(value) => self.add_binding(name, value),
            None => self.remove_binding(name),
        }
    }

    /// Remove the binding for `name`, keeping the order of the others
    pub fn remove_binding(&mut self, name: &str) {
        self.bindings.shift_remove(name);
    }

    /// Copy every binding of `other` into this row
    pub fn add_all(&mut self, other: &dyn BindingSet) {
        for (name, value) in other.bindings() {
            self.add_binding(name, value.clone());
        }
    }
}

impl BindingSet for QueryBindingSet {
    fn get(&self, name: &str) -> Option<&RdfTerm> {
        self.bindings.get(name)
    }

    fn bindings(&self) -> Box<dyn Iterator<Item = (&str, &RdfTerm)> + '_> {
        Box::new(self.bindings.iter().map(|(name, value)| (name.as_str(), value)))
    }

    fn size(&self) -> usize {
        self.bindings.len()
    }
}

/// Immutable, positional row handed to result consumers
///
/// All rows of one result share the same name list, which holds each name
/// once.
#[derive(Debug, Clone)]
pub struct ListBindingSet {
    /// Shared variable names
    names: Arc<[String]>,
    /// Values parallel to `names`; `None` means unbound
    values: Vec<Option<RdfTerm>>,
}

impl ListBindingSet {
    /// Create a positional row; `values` must be parallel to `names`
    pub fn new(names: Arc<[String]>, values: Vec<Option<RdfTerm>>) -> Result<Self, BindingSetError> {
        if names.len() != values.len() {
            return Err(BindingSetError::LengthMismatch {
                names: names.len(),
                values: values.len(),
            });
        }
        let mut seen = FxHashSet::default();
        if let Some(name) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(BindingSetError::DuplicateName(name.clone()));
        }
        Ok(Self { names, values })
    }

    /// Positional copy of `row` over `names`; names missing from `row` stay unbound
    ///
    /// `names` must not repeat a name.
    pub fn from_binding_set(names: Arc<[String]>, row: &dyn BindingSet) -> Self {
        let values = names.iter().map(|name| row.get(name).cloned()).collect();
        Self { names, values }
    }

    /// Every name of the row, bound or not
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Value at position `index` of the name list
    pub fn value_at(&self, index: usize) -> Option<&RdfTerm> {
        self.values.get(index).and_then(Option::as_ref)
    }
}

impl BindingSet for ListBindingSet {
    fn get(&self, name: &str) -> Option<&RdfTerm> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.value_at(idx))
    }

    fn bindings(&self) -> Box<dyn Iterator<Item = (&str, &RdfTerm)> + '_> {
        Box::new(
            self.names
                .iter()
                .zip(self.values.iter())
                .filter_map(|(name, value)| value.as_ref().map(|v| (name.as_str(), v))),
        )
    }

    fn size(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl PartialEq for QueryBindingSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_bindings(other)
    }
}

impl PartialEq<ListBindingSet> for QueryBindingSet {
    fn eq(&self, other: &ListBindingSet) -> bool {
        self.same_bindings(other)
    }
}

impl Eq for QueryBindingSet {}

impl Hash for QueryBindingSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.set_hash());
    }
}

impl fmt::Display for QueryBindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bindings(self, f)
    }
}

impl PartialEq for ListBindingSet {
    fn eq(&self, other: &Self) -> bool {
        self.same_bindings(other)
    }
}

impl PartialEq<QueryBindingSet> for ListBindingSet {
    fn eq(&self, other: &QueryBindingSet) -> bool {
        self.same_bindings(other)
    }
}

impl Eq for ListBindingSet {}

impl Hash for ListBindingSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.set_hash());
    }
}

impl fmt::Display for ListBindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_bindings(self, f)
    }
}
