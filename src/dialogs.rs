//! Blocking user dialogs (`confirm`, `alert`) as an injectable capability.

use std::collections::VecDeque;

use tracing::debug;

pub trait Dialogs {
    /// Asks a yes/no question. `true` means the user accepted.
    fn confirm(&mut self, message: &str) -> bool;

    fn alert(&mut self, message: &str);
}

/// Dialogs answered from a script of queued responses, recording every prompt.
///
/// Queued confirm responses are consumed first; once the queue is empty the
/// default response is used. The default accepts.
#[derive(Debug, Clone)]
pub struct ScriptedDialogs {
    confirm_responses: VecDeque<bool>,
    default_confirm_response: bool,
    confirm_messages: Vec<String>,
    alert_messages: Vec<String>,
}

impl Default for ScriptedDialogs {
    fn default() -> Self {
        Self {
            confirm_responses: VecDeque::new(),
            default_confirm_response: true,
            confirm_messages: Vec::new(),
            alert_messages: Vec::new(),
        }
    }
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue_confirm_response(&mut self, accepted: bool) {
        self.confirm_responses.push_back(accepted);
    }

    pub fn set_default_confirm_response(&mut self, accepted: bool) {
        self.default_confirm_response = accepted;
    }

    pub fn confirm_messages(&self) -> &[String] {
        &self.confirm_messages
    }

    pub fn alert_messages(&self) -> &[String] {
        &self.alert_messages
    }

    pub fn take_alert_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alert_messages)
    }

    pub fn take_confirm_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.confirm_messages)
    }
}

impl Dialogs for ScriptedDialogs {
    fn confirm(&mut self, message: &str) -> bool {
        self.confirm_messages.push(message.to_string());
        let accepted = self
            .confirm_responses
            .pop_front()
            .unwrap_or(self.default_confirm_response);
        debug!(message, accepted, "confirm");
        accepted
    }

    fn alert(&mut self, message: &str) {
        debug!(message, "alert");
        self.alert_messages.push(message.to_string());
    }
}
