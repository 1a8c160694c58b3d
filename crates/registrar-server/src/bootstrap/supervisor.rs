//! Connection retry supervisor.
//!
//! `Idle -> Connecting -> {Connected | Retrying -> Connecting ...} -> Exhausted`
//!
//! The first attempt runs immediately. Each failure with budget left
//! consumes one retry and sleeps a fixed delay. A failure with no budget left
//! is terminal: the escalation runs exactly once (in production it exits the
//! process). Success is terminal too: the startup continuation runs exactly
//! once with the connection and any remaining budget is discarded.
//!
//! Failures are not classified; bad credentials burn the same budget as a
//! database that is still booting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use registrar_core::error::{RegistrarError, Result};
use registrar_core::metrics::Counter;

use crate::config::DatabaseSection;

/// Something the service needs before it can serve.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    /// Log-safe description of the target (no credentials).
    fn target(&self) -> String;

    async fn connect(&self) -> Result<Self::Connection>;
}

/// What to do once the retry budget is gone.
pub trait Escalation: Send + Sync {
    fn escalate(&self, err: &RegistrarError);
}

/// Production escalation: exit with a non-zero code.
///
/// The supervisor has already logged the exhaustion at `error`.
#[derive(Debug, Clone, Copy)]
pub struct ExitProcess {
    pub code: i32,
}

impl Default for ExitProcess {
    fn default() -> Self {
        Self { code: 1 }
    }
}

impl Escalation for ExitProcess {
    fn escalate(&self, _err: &RegistrarError) {
        std::process::exit(self.code);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    Retrying,
    Connected,
    Exhausted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Connected | Phase::Exhausted)
    }
}

/// Bounded retry with a fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(db: &DatabaseSection) -> Self {
        Self {
            retries: db.retries,
            delay: Duration::from_millis(db.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorState {
    pub attempts_remaining: u32,
    pub delay: Duration,
    pub phase: Phase,
    pub attempts_made: u32,
}

pub struct ConnectionRetrySupervisor<E = ExitProcess> {
    state: SupervisorState,
    history: Vec<Phase>,
    escalation: E,
    attempts: Option<Arc<Counter>>,
}

impl ConnectionRetrySupervisor<ExitProcess> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_escalation(policy, ExitProcess::default())
    }
}

impl<E: Escalation> ConnectionRetrySupervisor<E> {
    pub fn with_escalation(policy: RetryPolicy, escalation: E) -> Self {
        Self {
            state: SupervisorState {
                attempts_remaining: policy.retries,
                delay: policy.delay,
                phase: Phase::Idle,
                attempts_made: 0,
            },
            history: vec![Phase::Idle],
            escalation,
            attempts: None,
        }
    }

    /// Count each attempt by `outcome` (`success` / `failure`).
    pub fn with_attempt_counter(mut self, counter: Arc<Counter>) -> Self {
        self.attempts = Some(counter);
        self
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Every phase entered so far, starting with `Idle`.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn escalation(&self) -> &E {
        &self.escalation
    }

    /// Drive attempts until `Connected` or `Exhausted`.
    ///
    /// On success returns whatever `on_connected` produced. On exhaustion the
    /// escalation has already run; the error is returned for escalations that
    /// do not end the process.
    pub async fn run<C, F, Fut>(&mut self, connector: &C, on_connected: F) -> Result<Fut::Output>
    where
        C: Connector,
        F: FnOnce(C::Connection) -> Fut,
        Fut: Future,
    {
        if self.state.phase != Phase::Idle {
            return Err(RegistrarError::Internal(format!(
                "supervisor already ran (phase {:?})",
                self.state.phase
            )));
        }

        let target = connector.target();
        self.transition(Phase::Connecting);
        loop {
            self.state.attempts_made += 1;
            match connector.connect().await {
                Ok(conn) => {
                    self.count("success");
                    self.transition(Phase::Connected);
                    tracing::info!(%target, attempt = self.state.attempts_made, "dependency connected");
                    return Ok(on_connected(conn).await);
                }
                Err(e) => {
                    self.count("failure");
                    if self.state.attempts_remaining == 0 {
                        self.transition(Phase::Exhausted);
                        let err = RegistrarError::DependencyExhausted {
                            attempts: self.state.attempts_made,
                            last_error: e.to_string(),
                        };
                        tracing::error!(%target, attempts = self.state.attempts_made, error = %e, "dependency retries exhausted");
                        self.escalation.escalate(&err);
                        return Err(err);
                    }
                    tracing::warn!(
                        %target,
                        error = %e,
                        retries_left = self.state.attempts_remaining,
                        delay_ms = self.state.delay.as_millis() as u64,
                        "waiting for dependency"
                    );
                    self.state.attempts_remaining -= 1;
                    self.transition(Phase::Retrying);
                    tokio::time::sleep(self.state.delay).await;
                    self.transition(Phase::Connecting);
                }
            }
        }
    }

    fn transition(&mut self, to: Phase) {
        tracing::debug!(from = ?self.state.phase, to = ?to, "supervisor transition");
        self.state.phase = to;
        self.history.push(to);
    }

    fn count(&self, outcome: &str) {
        if let Some(c) = &self.attempts {
            if let Err(e) = c.inc(&[("outcome", outcome)]) {
                tracing::warn!(error = %e, "connect attempt counter update failed");
            }
        }
    }
}
