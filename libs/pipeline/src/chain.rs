//! The pipeline: an ordered, immutable behavior chain and its runner.

use crate::behavior::{Behavior, Next, Terminal};
use crate::context::PipelineContext;
use crate::PipelineError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Observable states of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Completed,
    ShortCircuited,
    Faulted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::ShortCircuited => "short-circuited",
            RunState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of a pipeline run.
///
/// `ShortCircuited` is a deliberate control-flow outcome ("already handled
/// this id, skip"), not a failure; the dispatcher acknowledges it like a
/// completion.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The terminal step returned normally and every behavior's
    /// post-continuation code has unwound.
    Completed,
    /// Some behavior declined to continue the chain.
    ShortCircuited,
    /// Some behavior or the terminal step raised an error.
    Faulted(PipelineError),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            PipelineOutcome::Completed | PipelineOutcome::ShortCircuited
        )
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self, PipelineOutcome::Faulted(_))
    }

    pub fn state(&self) -> RunState {
        match self {
            PipelineOutcome::Completed => RunState::Completed,
            PipelineOutcome::ShortCircuited => RunState::ShortCircuited,
            PipelineOutcome::Faulted(_) => RunState::Faulted,
        }
    }
}

/// Ordered chain of behaviors for one direction.
///
/// Built once at startup via [`PipelineBuilder`] and immutable thereafter;
/// clones share the same chain, so concurrent runs need no synchronization.
/// Each run gets its own context instance and executes the behaviors
/// strictly one after another in registration order.
pub struct Pipeline<C: PipelineContext> {
    behaviors: Arc<[Arc<dyn Behavior<C>>]>,
}

impl<C: PipelineContext> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            behaviors: Arc::clone(&self.behaviors),
        }
    }
}

impl<C: PipelineContext> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}

impl<C: PipelineContext> Pipeline<C> {
    pub fn builder() -> PipelineBuilder<C> {
        PipelineBuilder::new()
    }

    /// Run the chain over `ctx` to completion, short-circuit, or fault.
    pub async fn run(&self, ctx: &mut C, terminal: &dyn Terminal<C>) -> PipelineOutcome {
        let mut state = RunState::Pending;
        trace!(%state, behaviors = self.behaviors.len(), "pipeline run created");

        state = RunState::Running;
        trace!(%state, "pipeline run started");

        let terminal_reached = AtomicBool::new(false);
        let next = Next::new(&self.behaviors, terminal, &terminal_reached);
        let result = next.run(ctx).await;

        let outcome = match result {
            Ok(()) if terminal_reached.load(Ordering::Acquire) => PipelineOutcome::Completed,
            Ok(()) => PipelineOutcome::ShortCircuited,
            Err(error) => PipelineOutcome::Faulted(error),
        };
        debug!(state = %outcome.state(), "pipeline run finished");
        outcome
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

/// Collects behaviors in registration order, then publishes the immutable
/// chain.
pub struct PipelineBuilder<C: PipelineContext> {
    behaviors: Vec<Arc<dyn Behavior<C>>>,
}

impl<C: PipelineContext> PipelineBuilder<C> {
    pub fn new() -> Self {
        Self {
            behaviors: Vec::new(),
        }
    }

    /// Append a behavior to the end of the chain.
    pub fn register(mut self, behavior: impl Behavior<C> + 'static) -> Self {
        self.behaviors.push(Arc::new(behavior));
        self
    }

    pub fn register_arc(mut self, behavior: Arc<dyn Behavior<C>>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Insert a behavior ahead of everything registered so far.
    pub fn register_first(mut self, behavior: impl Behavior<C> + 'static) -> Self {
        self.behaviors.insert(0, Arc::new(behavior));
        self
    }

    pub fn build(self) -> Pipeline<C> {
        Pipeline {
            behaviors: self.behaviors.into(),
        }
    }
}

impl<C: PipelineContext> Default for PipelineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
