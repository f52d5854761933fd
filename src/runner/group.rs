//! Parallel runner group with one-exits-all-exit semantics.
//!
//! # States
//! ```text
//! member: Unstarted → Running → Stopping → Stopped
//!                             ↘──────────→ Stopped
//! group:  Forming → Running → Draining → Terminated
//! ```
//!
//! # State Transitions
//! - Running → Draining: shutdown triggered, or any member stopped
//! - Draining: every member still running gets exactly one stop request
//! - Draining → Terminated: every member stopped
//!
//! The result is the first member error in termination order, or `Ok(())`
//! when every member stopped cleanly.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::runner::{stop_channel, Runner, RunnerError, StopHandle};

/// Per-member lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberState {
    Unstarted,
    Running,
    Stopping,
    Stopped,
}

/// Group lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Forming,
    Running,
    Draining,
    Terminated,
}

/// A member of the group terminated with an error.
#[derive(Debug, Error)]
#[error("{member} exited with error: {source}")]
pub struct GroupError {
    pub member: String,
    #[source]
    pub source: RunnerError,
}

struct Member {
    name: String,
    runner: Box<dyn Runner>,
}

struct Slot {
    name: String,
    state: MemberState,
    stop: StopHandle,
}

/// Ordered set of named runners supervised together.
#[derive(Default)]
pub struct Group {
    members: Vec<Member>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named member. Members run concurrently; order only affects logs.
    pub fn member(mut self, name: impl Into<String>, runner: Box<dyn Runner>) -> Self {
        self.members.push(Member {
            name: name.into(),
            runner,
        });
        self
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// Run every member until all have stopped.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), GroupError> {
        let mut group_state = GroupState::Forming;
        tracing::debug!(members = self.len(), state = ?group_state, "Forming runner group");

        // Every member gets its stop channel before any of them is spawned.
        let mut slots = Vec::with_capacity(self.len());
        let mut pending = Vec::with_capacity(self.len());
        for member in self.members {
            let (stop, request) = stop_channel();
            slots.push(Slot {
                name: member.name,
                state: MemberState::Unstarted,
                stop,
            });
            pending.push((member.runner, request));
        }

        let mut tasks = JoinSet::new();
        for (index, (runner, request)) in pending.into_iter().enumerate() {
            let run = runner.run(request);
            tasks.spawn(async move {
                let result = match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => Err(RunnerError::Panicked(panic_message(panic.as_ref()))),
                };
                (index, result)
            });
            slots[index].state = MemberState::Running;
            tracing::info!(member = %slots[index].name, "Member started");
        }
        group_state = transition(group_state, GroupState::Running);

        let mut first_error: Option<GroupError> = None;

        loop {
            let draining = group_state == GroupState::Draining;
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    let (index, result) = match joined {
                        Ok(outcome) => outcome,
                        // Tasks are never aborted and panics are caught above.
                        Err(e) => {
                            tracing::error!(error = %e, "Member task failed to join");
                            continue;
                        }
                    };

                    let slot = &mut slots[index];
                    slot.state = MemberState::Stopped;
                    match &result {
                        Ok(()) => {
                            tracing::info!(member = %slot.name, "Member exited");
                            metrics::record_member_exit(&slot.name, "ok");
                        }
                        Err(e) => {
                            tracing::error!(member = %slot.name, error = %e, "Member exited with error");
                            metrics::record_member_exit(&slot.name, "error");
                        }
                    }

                    if let Err(source) = result {
                        if first_error.is_none() {
                            first_error = Some(GroupError {
                                member: slot.name.clone(),
                                source,
                            });
                        }
                    }

                    if !draining {
                        group_state = transition(group_state, GroupState::Draining);
                        stop_running(&mut slots);
                    }
                }
                _ = shutdown.triggered(), if !draining => {
                    tracing::info!("Shutdown requested, stopping members");
                    group_state = transition(group_state, GroupState::Draining);
                    stop_running(&mut slots);
                }
            }
        }

        transition(group_state, GroupState::Terminated);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn transition(from: GroupState, to: GroupState) -> GroupState {
    tracing::debug!(from = ?from, to = ?to, "Runner group state change");
    to
}

/// Deliver one stop request to every member that is still running.
fn stop_running(slots: &mut [Slot]) {
    for slot in slots.iter_mut() {
        if slot.state != MemberState::Running {
            continue;
        }
        if slot.stop.stop() {
            tracing::info!(member = %slot.name, "Stopping member");
        }
        slot.state = MemberState::Stopping;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
