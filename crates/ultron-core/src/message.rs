//! Ordered chat history with stable message identity.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    /// Local notices (e.g. an upload announcement); never sent to the backend
    System,
}

/// A single chat turn as the user sees it.
///
/// Messages are immutable once appended. `text` is always the original text:
/// attached document content is never folded into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
}

/// Append-only log of messages.
///
/// Ids come from a monotonic counter owned by the store. The counter survives
/// `reset`, so an id is never reused within one store.
#[derive(Debug)]
pub struct MessageStore {
    messages: Vec<Message>,
    next_id: u64,
    notify: watch::Sender<Vec<Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(Vec::new());
        Self {
            messages: Vec::new(),
            next_id: 1,
            notify,
        }
    }

    /// Append a message and return a copy of it.
    pub fn append(&mut self, sender: Sender, text: impl Into<String>) -> Message {
        let message = Message {
            id: self.next_id,
            sender,
            text: text.into(),
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        self.publish();
        message
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop every message. Ids keep counting from where they were.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.publish();
    }

    /// Observe the ordered list. The receiver sees the full list after every
    /// append and reset.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.notify.subscribe()
    }

    fn publish(&self) {
        // send_replace keeps the latest value even with no live receivers
        self.notify.send_replace(self.messages.clone());
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
