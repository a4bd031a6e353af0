use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub type StepFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// A deferred asynchronous step; nothing runs until the queue reaches it.
pub type Step<'a, T> = Box<dyn FnOnce() -> StepFuture<'a, T> + Send + 'a>;

/// Ordered steps drained strictly one after another.
///
/// A step is only started once the previous one has completed; the first
/// failure stops the queue and the remaining steps never run.
pub struct TaskQueue<'a, T> {
    steps: VecDeque<Step<'a, T>>,
}

impl<'a, T: 'a> TaskQueue<'a, T> {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    pub fn push<F, Fut>(&mut self, step: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        self.steps
            .push_back(Box::new(move || -> StepFuture<'a, T> { Box::pin(step()) }));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every step in order, collecting their outputs.
    pub async fn drain(mut self) -> Result<Vec<T>> {
        let mut outputs = Vec::with_capacity(self.steps.len());
        while let Some(step) = self.steps.pop_front() {
            outputs.push(step().await?);
        }
        Ok(outputs)
    }
}

impl<'a, T: 'a> Default for TaskQueue<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}
