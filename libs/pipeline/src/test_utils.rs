//! Shared test doubles for pipeline and dispatcher tests.

use crate::behavior::{Behavior, Next, Terminal};
use crate::context::PipelineContext;
use crate::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Observable, thread-safe call log shared between test behaviors.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

enum Action {
    /// Record and continue the chain.
    Continue,
    /// Record, then drop the continuation.
    ShortCircuit,
    /// Record, then fail the run.
    Fail,
    /// Record before and after the continuation.
    Wrap,
}

/// Behavior that records its invocation and then acts out one scripted
/// choice, for asserting execution order and outcomes.
pub struct RecordingBehavior {
    name: &'static str,
    log: CallLog,
    action: Action,
}

impl RecordingBehavior {
    pub fn continuing(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            action: Action::Continue,
        }
    }

    pub fn short_circuiting(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            action: Action::ShortCircuit,
        }
    }

    pub fn failing(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            action: Action::Fail,
        }
    }

    pub fn wrapping(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            action: Action::Wrap,
        }
    }
}

#[async_trait]
impl<C: PipelineContext> Behavior<C> for RecordingBehavior {
    async fn invoke(&self, ctx: &mut C, next: Next<'_, C>) -> PipelineResult {
        match self.action {
            Action::Continue => {
                self.log.record(self.name);
                next.run(ctx).await
            }
            Action::ShortCircuit => {
                self.log.record(self.name);
                Ok(())
            }
            Action::Fail => {
                self.log.record(self.name);
                Err(PipelineError::Behavior {
                    behavior: self.name,
                    reason: "induced failure".to_string(),
                })
            }
            Action::Wrap => {
                self.log.record(format!("{}:pre", self.name));
                let result = next.run(ctx).await;
                self.log.record(format!("{}:post", self.name));
                result
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Terminal that records being reached, optionally failing like an
/// application handler would.
pub struct RecordingTerminal {
    log: CallLog,
    fail: bool,
}

impl RecordingTerminal {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { log, fail: true }
    }
}

#[async_trait]
impl<C: PipelineContext> Terminal<C> for RecordingTerminal {
    async fn call(&self, _ctx: &mut C) -> PipelineResult {
        self.log.record("terminal");
        if self.fail {
            Err(PipelineError::handler("induced handler failure"))
        } else {
            Ok(())
        }
    }
}

/// Terminal that does nothing, for tests that only care about the chain.
pub struct NoopTerminal;

#[async_trait]
impl<C: PipelineContext> Terminal<C> for NoopTerminal {
    async fn call(&self, _ctx: &mut C) -> PipelineResult {
        Ok(())
    }
}
