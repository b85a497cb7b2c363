//! The behavior contract and its continuation.

use crate::context::{IncomingContext, OutgoingContext, PipelineContext};
use crate::{PipelineError, PipelineResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One step in a processing pipeline.
///
/// A behavior may read and mutate the context, do work before and after the
/// rest of the chain, and decides how the chain proceeds through `next`:
/// consuming it runs the remainder of the chain (the move makes
/// invoke-at-most-once a compile-time guarantee), dropping it without
/// running short-circuits the remainder deliberately, and returning an error
/// faults the run.
#[async_trait]
pub trait Behavior<C: PipelineContext>: Send + Sync {
    async fn invoke(&self, ctx: &mut C, next: Next<'_, C>) -> PipelineResult;

    /// Name used in logs and behavior-failure errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Behavior on the incoming (transport to application) pipeline.
pub type IncomingBehavior = dyn Behavior<IncomingContext>;

/// Behavior on the outgoing (application to transport) pipeline.
pub type OutgoingBehavior = dyn Behavior<OutgoingContext>;

/// Terminal step of a chain: the application handler on the incoming side,
/// the transport-send collaborator on the outgoing side.
#[async_trait]
pub trait Terminal<C: PipelineContext>: Send + Sync {
    async fn call(&self, ctx: &mut C) -> PipelineResult;
}

/// Capability to continue the chain, handed to each behavior.
///
/// Holds the remaining behaviors and the terminal step; running it invokes
/// the next behavior (or the terminal, when the slice is exhausted) within
/// the same logical call, preserving strict ordering. The run's cancellation
/// signal is checked before every advance.
pub struct Next<'a, C: PipelineContext> {
    behaviors: &'a [Arc<dyn Behavior<C>>],
    terminal: &'a dyn Terminal<C>,
    terminal_reached: &'a AtomicBool,
}

impl<'a, C: PipelineContext> Next<'a, C> {
    pub(crate) fn new(
        behaviors: &'a [Arc<dyn Behavior<C>>],
        terminal: &'a dyn Terminal<C>,
        terminal_reached: &'a AtomicBool,
    ) -> Self {
        Self {
            behaviors,
            terminal,
            terminal_reached,
        }
    }

    /// Proceed to the next behavior, or the terminal step if this was the
    /// last one.
    pub fn run<'b>(self, ctx: &'b mut C) -> BoxFuture<'b, PipelineResult>
    where
        'a: 'b,
    {
        Box::pin(async move {
            if ctx.cancellation().is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match self.behaviors.split_first() {
                Some((head, rest)) => {
                    let next = Next::new(rest, self.terminal, self.terminal_reached);
                    tracing::trace!(behavior = head.name(), "invoking behavior");
                    head.invoke(ctx, next).await
                }
                None => {
                    self.terminal_reached.store(true, Ordering::Release);
                    self.terminal.call(ctx).await
                }
            }
        })
    }
}
