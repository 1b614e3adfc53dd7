//! Conversation session state machine.
//!
//! `Idle` discards everything except utterances carrying the wake phrase.
//! `Active` admits every utterance and closes itself after a period of
//! inactivity, but never while output is in flight.

use crate::config::ConversationConfig;
use crate::pipeline::messages::Turn;
use crate::pipeline::phrases;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Margin added to wake-ups so the loop lands strictly past the deadline.
const DEADLINE_SLACK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the wake phrase. Other utterances are discarded.
    Idle,
    /// Conversation open; every utterance is handled.
    Active,
}

/// What the main loop should do with an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Not addressed to the assistant.
    Discard,
    /// The wake phrase opened a new session. Greet, then handle `command`.
    Opened { command: Option<String> },
    /// The session was already open.
    Continue { command: Option<String> },
}

/// Owned session value held by the main loop.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    history: VecDeque<Turn>,
    last_interaction: Instant,
    wake_phrase: String,
    idle_timeout: Duration,
    max_turns: usize,
}

impl Session {
    pub fn new(config: &ConversationConfig, now: Instant) -> Self {
        Self {
            state: SessionState::Idle,
            history: VecDeque::with_capacity(config.max_history_turns),
            last_interaction: now,
            wake_phrase: config.wake_phrase.clone(),
            idle_timeout: config.idle_timeout(),
            max_turns: config.max_history_turns,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn history(&self) -> &VecDeque<Turn> {
        &self.history
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    /// The most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Run an utterance through the gate.
    pub fn admit(&mut self, text: &str, now: Instant) -> GateDecision {
        match self.state {
            SessionState::Idle => {
                let Some(rest) = phrases::strip_phrase(text, &self.wake_phrase) else {
                    debug!("idle, discarding: \"{text}\"");
                    return GateDecision::Discard;
                };
                self.state = SessionState::Active;
                self.history.clear();
                self.last_interaction = now;
                info!("wake phrase heard, session active");
                GateDecision::Opened {
                    command: non_empty(rest),
                }
            }
            SessionState::Active => {
                self.last_interaction = now;
                let command = phrases::strip_phrase(text, &self.wake_phrase)
                    .unwrap_or_else(|| text.trim().to_owned());
                GateDecision::Continue {
                    command: non_empty(command),
                }
            }
        }
    }

    /// Append a turn, dropping the oldest beyond the cap.
    ///
    /// Ignored while idle: an idle session always has an empty history.
    pub fn record(&mut self, turn: Turn) {
        if self.state == SessionState::Idle {
            return;
        }
        self.history.push_back(turn);
        while self.history.len() > self.max_turns {
            self.history.pop_front();
        }
    }

    /// Refresh the inactivity clock without recording anything.
    pub fn touch(&mut self, now: Instant) {
        if self.state == SessionState::Active {
            self.last_interaction = now;
        }
    }

    /// Close the session if it has been inactive for longer than the idle
    /// timeout. Never fires while output is in flight or when the timeout is
    /// zero (disabled).
    ///
    /// Returns `true` when this call closed the session.
    pub fn check_timeout(&mut self, now: Instant, output_in_flight: bool) -> bool {
        if self.state != SessionState::Active
            || output_in_flight
            || self.idle_timeout.is_zero()
        {
            return false;
        }
        if now.saturating_duration_since(self.last_interaction) > self.idle_timeout {
            self.close();
            info!("session idle timeout, returning to idle");
            return true;
        }
        false
    }

    /// How long until [`Session::check_timeout`] could next fire.
    ///
    /// `None` when the session is idle or the timeout is disabled.
    pub fn time_until_timeout(&self, now: Instant) -> Option<Duration> {
        if self.state != SessionState::Active || self.idle_timeout.is_zero() {
            return None;
        }
        let deadline = self.last_interaction + self.idle_timeout + DEADLINE_SLACK;
        Some(deadline.saturating_duration_since(now).max(DEADLINE_SLACK))
    }

    /// Return to idle and forget the conversation.
    pub fn close(&mut self) {
        self.state = SessionState::Idle;
        self.history.clear();
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
