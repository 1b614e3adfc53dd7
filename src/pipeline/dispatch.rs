//! Command dispatcher: routes a clean command to device control or to the
//! conversational backend, and turns every failure into a spoken sentence.

use crate::config::{DeviceCommandConfig, DeviceConfig, LlmConfig};
use crate::device::{DeviceCommand, DeviceController, DeviceError};
use crate::llm::Completion;
use crate::pipeline::messages::Turn;
use crate::pipeline::phrases;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const NOT_UNDERSTOOD: &str = "I didn't understand the command.";
pub const ASSISTANT_UNAVAILABLE: &str = "Sorry, I can't reach my assistant service right now.";
pub const EMPTY_REPLY: &str = "Sorry, I don't have an answer for that.";

/// Verbs that route a command to device control. Matched as plain
/// substrings of the normalized command, so "return on investment" routes
/// here too and gets [`NOT_UNDERSTOOD`].
const DEVICE_VERBS: [&str; 2] = ["turn on", "turn off"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Device,
    Conversation,
}

/// Text to speak plus which route produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub text: String,
    pub kind: CommandKind,
}

impl Dispatch {
    pub fn is_device_command(&self) -> bool {
        self.kind == CommandKind::Device
    }
}

pub struct CommandDispatcher {
    completion: Arc<dyn Completion>,
    device: Arc<dyn DeviceController>,
    device_id: String,
    commands: Vec<DeviceCommandConfig>,
    max_tokens: u32,
    completion_timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(
        completion: Arc<dyn Completion>,
        device: Arc<dyn DeviceController>,
        llm: &LlmConfig,
        device_config: &DeviceConfig,
    ) -> Self {
        Self {
            completion,
            device,
            device_id: device_config.device_id.clone(),
            commands: device_config
                .commands
                .iter()
                .map(|c| DeviceCommandConfig {
                    phrase: phrases::normalize(&c.phrase),
                    ..c.clone()
                })
                .collect(),
            max_tokens: llm.max_tokens,
            completion_timeout: Duration::from_secs(llm.request_timeout_s.max(1)),
        }
    }

    /// Handle one clean command. `context` is the recent conversation, oldest
    /// first; it is sent as-is ahead of the command on the conversational route.
    pub async fn dispatch(&self, command: &str, context: &[Turn]) -> Dispatch {
        let normalized = phrases::normalize(command);
        if DEVICE_VERBS.iter().any(|verb| normalized.contains(verb)) {
            Dispatch {
                text: self.control_device(&normalized).await,
                kind: CommandKind::Device,
            }
        } else {
            Dispatch {
                text: self.converse(command, context).await,
                kind: CommandKind::Conversation,
            }
        }
    }

    async fn control_device(&self, normalized: &str) -> String {
        let Some(entry) = self.commands.iter().find(|c| c.phrase == normalized) else {
            info!("unknown device command: \"{normalized}\"");
            return NOT_UNDERSTOOD.to_owned();
        };

        match self
            .device
            .execute(&self.device_id, &DeviceCommand::from(entry))
            .await
        {
            Ok(()) => format!("Device {normalized} successfully"),
            Err(DeviceError::Rejected(reason)) => {
                warn!("device rejected \"{normalized}\": {reason}");
                format!("Failed to {normalized} the device")
            }
            Err(e @ DeviceError::Transport(_)) => {
                warn!("device call failed for \"{normalized}\": {e}");
                format!("Error controlling device: {e}")
            }
        }
    }

    async fn converse(&self, command: &str, context: &[Turn]) -> String {
        let mut messages = context.to_vec();
        messages.push(Turn::user(command));

        let call = self.completion.complete(&messages, self.max_tokens);
        match tokio::time::timeout(self.completion_timeout, call).await {
            Ok(Ok(reply)) if reply.trim().is_empty() => EMPTY_REPLY.to_owned(),
            Ok(Ok(reply)) => reply.trim().to_owned(),
            Ok(Err(e)) => {
                warn!("completion failed: {e}");
                ASSISTANT_UNAVAILABLE.to_owned()
            }
            Err(_) => {
                warn!(
                    "completion timed out after {}s",
                    self.completion_timeout.as_secs()
                );
                ASSISTANT_UNAVAILABLE.to_owned()
            }
        }
    }
}
