//! Error launch and the handler chain
//!
//! Native code raises an [`ErrorObject`] with [`Context::launch`]. The
//! innermost installed handler decides what happens:
//!
//! - `Retry`: the raiser should run the failed operation again
//! - `Default`: carry on with the operation's default result
//! - `Substitute(item)`: use `item` as the operation's result
//! - `Propagate`: pass the error to the next outer handler
//!
//! Every consultation counts as one try. A retry is honoured only when the
//! error carries `CAN_RETRY` and its tries stay below its retry budget;
//! otherwise the decision falls back to the default (when the error allows
//! one) or to termination.
//! With no handler left, warnings are ignored and severe errors terminate:
//! `launch` returns `RuntimeError::Unhandled`, which unwinds the raising call
//! chain through `Result`.

use crate::error::RuntimeError;
use crate::invoke::Context;
use itembridge_core::{ErrorObject, Item};
use tracing::{info, warn};

/// Handler decision for one consultation
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerDecision {
    Retry,
    Default,
    Substitute(Item),
    Propagate,
}

/// What the raiser should do after `launch`
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchOutcome {
    Retry,
    Defaulted,
    Substituted(Item),
    /// No handler took it and the severity does not demand termination
    Ignored,
}

pub type ErrorHandler = Box<dyn FnMut(&ErrorObject) -> HandlerDecision>;

/// Result of [`Context::retrying`]
#[derive(Debug, Clone, PartialEq)]
pub enum Retried<T> {
    Succeeded(T),
    /// The attempt kept failing and the handler settled the error
    Settled(LaunchOutcome),
}

impl Context {
    /// Raise `err` through the handler chain
    ///
    /// `err` is borrowed for the call, so its tries counter survives
    /// repeated launches of the same error.
    pub fn launch(&mut self, err: &mut ErrorObject) -> Result<LaunchOutcome, RuntimeError> {
        for i in (0..self.handlers.len()).rev() {
            err.record_try();
            let decision = (self.handlers[i])(&*err);
            info!(error = %err, tries = err.tries(), decision = ?decision, "error handler consulted");

            match decision {
                HandlerDecision::Propagate => continue,
                HandlerDecision::Retry if err.can_retry() => return Ok(LaunchOutcome::Retry),
                HandlerDecision::Retry | HandlerDecision::Default => return settle_default(err),
                HandlerDecision::Substitute(item) if err.can_substitute() => {
                    return Ok(LaunchOutcome::Substituted(item));
                }
                HandlerDecision::Substitute(_) => return settle_default(err),
            }
        }

        if err.severity().is_severe() {
            warn!(error = %err, severity = %err.severity(), "unhandled error");
            Err(RuntimeError::Unhandled(Box::new(err.clone())))
        } else {
            info!(error = %err, severity = %err.severity(), "error ignored");
            Ok(LaunchOutcome::Ignored)
        }
    }

    /// Run `body` with `handler` installed as the innermost handler
    pub fn with_handler<R, H, F>(&mut self, handler: H, body: F) -> R
    where
        H: FnMut(&ErrorObject) -> HandlerDecision + 'static,
        F: FnOnce(&mut Context) -> R,
    {
        let depth = self.handlers.len();
        self.handlers.push(Box::new(handler));
        let result = body(self);
        self.handlers.truncate(depth);
        result
    }

    /// Run `attempt` until it succeeds or the handler chain stops asking
    /// for a retry
    ///
    /// `attempt` returns `None` on failure; each failure launches `err`.
    pub fn retrying<T, F>(
        &mut self,
        err: &mut ErrorObject,
        mut attempt: F,
    ) -> Result<Retried<T>, RuntimeError>
    where
        F: FnMut(&mut Context) -> Option<T>,
    {
        loop {
            if let Some(value) = attempt(self) {
                return Ok(Retried::Succeeded(value));
            }
            match self.launch(err)? {
                LaunchOutcome::Retry => continue,
                outcome => return Ok(Retried::Settled(outcome)),
            }
        }
    }

    pub fn handler_depth(&self) -> usize {
        self.handlers.len()
    }
}

fn settle_default(err: &ErrorObject) -> Result<LaunchOutcome, RuntimeError> {
    if err.can_default() {
        Ok(LaunchOutcome::Defaulted)
    } else {
        warn!(error = %err, "handler gave up on an error that cannot default");
        Err(RuntimeError::Unhandled(Box::new(err.clone())))
    }
}
