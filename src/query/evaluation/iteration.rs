//! Closeable, pull-based iteration
//!
//! Every operator in the evaluation pipeline is a [`CloseableIteration`]:
//! the consumer pulls rows one at a time and may release all resources early
//! with [`close`](CloseableIteration::close). Operators that have to skip
//! work between rows are written as a [`Producer`] and driven by
//! [`LookAhead`], which buffers one row for `has_next`.

use super::EvaluationResult;
use tracing::trace;

/// Lazy sequence with explicit resource release
pub trait CloseableIteration {
    /// Element type
    type Item;

    /// True if a subsequent [`next`](Self::next) will return an item
    fn has_next(&mut self) -> EvaluationResult<bool>;

    /// Next item, or `None` once the sequence is exhausted or closed
    fn next(&mut self) -> EvaluationResult<Option<Self::Item>>;

    /// Release every resource held by this iteration and by everything it
    /// opened. Calling it more than once is a no-op.
    fn close(&mut self) -> EvaluationResult<()>;

    /// Drain the remaining items and close the iteration
    fn collect_all(&mut self) -> EvaluationResult<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let mut items = Vec::new();
        while let Some(item) = self.next()? {
            items.push(item);
        }
        self.close()?;
        Ok(items)
    }
}

impl<I: CloseableIteration + ?Sized> CloseableIteration for Box<I> {
    type Item = I::Item;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> EvaluationResult<Option<Self::Item>> {
        (**self).next()
    }

    fn close(&mut self) -> EvaluationResult<()> {
        (**self).close()
    }
}

/// Outcome of one production step
#[derive(Debug, PartialEq, Eq)]
pub enum Advance<T> {
    /// Internal state advanced without producing an item; ask again
    NotReady,
    /// An item was produced
    Ready(T),
    /// The producer is exhausted
    Done,
}

/// Step-wise item source driven by [`LookAhead`]
pub trait Producer {
    /// Element type
    type Item;

    /// Advance the internal state machine by one step
    fn produce(&mut self) -> EvaluationResult<Advance<Self::Item>>;

    /// Release underlying iterations. Called at most once.
    fn release(&mut self) -> EvaluationResult<()>;
}

/// Adapts a [`Producer`] into a [`CloseableIteration`]
///
/// The producer is released as soon as it reports [`Advance::Done`], when the
/// consumer calls `close`, or when `produce` fails (the original error is
/// returned after cleanup).
pub struct LookAhead<P: Producer> {
    /// Wrapped producer
    producer: P,
    /// Item buffered by `has_next`
    peeked: Option<P::Item>,
    /// Producer reported `Done` or the iteration was closed
    finished: bool,
    /// `release` already ran
    closed: bool,
}

impl<P: Producer> LookAhead<P> {
    /// Create a new look-ahead driver
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            peeked: None,
            finished: false,
            closed: false,
        }
    }

    fn fill(&mut self) -> EvaluationResult<()> {
        while self.peeked.is_none() && !self.finished {
            match self.producer.produce() {
                Ok(Advance::NotReady) => continue,
                Ok(Advance::Ready(item)) => self.peeked = Some(item),
                Ok(Advance::Done) => {
                    self.finished = true;
                    self.close()?;
                }
                Err(e) => {
                    if let Err(close_err) = self.close() {
                        trace!("Close after evaluation error failed: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

impl<P: Producer> CloseableIteration for LookAhead<P> {
    type Item = P::Item;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        self.fill()?;
        Ok(self.peeked.is_some())
    }

    fn next(&mut self) -> EvaluationResult<Option<Self::Item>> {
        self.fill()?;
        Ok(self.peeked.take())
    }

    fn close(&mut self) -> EvaluationResult<()> {
        self.finished = true;
        self.peeked = None;
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.producer.release()
    }
}

/// Iteration over nothing
pub struct EmptyIteration<T> {
    _marker: std::marker::PhantomData<T>,
}

impl<T> EmptyIteration<T> {
    /// Create a new empty iteration
    pub fn new() -> Self {
        Self { _marker: std::marker::PhantomData }
    }
}

impl<T> Default for EmptyIteration<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CloseableIteration for EmptyIteration<T> {
    type Item = T;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        Ok(false)
    }

    fn next(&mut self) -> EvaluationResult<Option<T>> {
        Ok(None)
    }

    fn close(&mut self) -> EvaluationResult<()> {
        Ok(())
    }
}

/// Iteration over exactly one item
pub struct SingletonIteration<T> {
    item: Option<T>,
}

impl<T> SingletonIteration<T> {
    /// Create a new single-item iteration
    pub fn new(item: T) -> Self {
        Self { item: Some(item) }
    }
}

impl<T> CloseableIteration for SingletonIteration<T> {
    type Item = T;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        Ok(self.item.is_some())
    }

    fn next(&mut self) -> EvaluationResult<Option<T>> {
        Ok(self.item.take())
    }

    fn close(&mut self) -> EvaluationResult<()> {
        self.item = None;
        Ok(())
    }
}

/// Iteration over an owned, already materialized list
pub struct VecIteration<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecIteration<T> {
    /// Create a new iteration over `items`, in order
    pub fn new(items: Vec<T>) -> Self {
        Self { items: items.into_iter() }
    }
}

impl<T> CloseableIteration for VecIteration<T> {
    type Item = T;

    fn has_next(&mut self) -> EvaluationResult<bool> {
        Ok(!self.items.as_slice().is_empty())
    }

    fn next(&mut self) -> EvaluationResult<Option<T>> {
        Ok(self.items.next())
    }

    fn close(&mut self) -> EvaluationResult<()> {
        self.items = Vec::new().into_iter();
        Ok(())
    }
}
