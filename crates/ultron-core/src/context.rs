//! Builds the request payload for one outgoing turn.
//!
//! Assembly is a pure function of (history, pending document, new text). The
//! document text is merged into the outgoing copy of the last user turn only;
//! stored messages are never touched.

use serde::Serialize;
use tracing::debug;

use crate::document::DocumentContext;
use crate::message::{Message, Sender};

/// Placed between the user's text and the attached document text
pub const ATTACHMENT_SEPARATOR: &str = "\n\n---\n(Attached content)\n\n";

/// Role of a turn as the generation endpoint names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Text of the first part
    pub fn text(&self) -> &str {
        self.parts.first().map(|p| p.text.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// Request body for one send. Built fresh each time, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    pub contents: Vec<Turn>,
    pub generation_config: GenerationConfig,
}

impl OutgoingRequest {
    pub fn last_turn(&self) -> Option<&Turn> {
        self.contents.last()
    }
}

pub struct ContextAssembler;

impl ContextAssembler {
    /// Assemble the request for `new_user_text` on top of `history`.
    ///
    /// `history` must not already contain the new user message.
    pub fn assemble(
        history: &[Message],
        pending_document: Option<&DocumentContext>,
        new_user_text: &str,
    ) -> OutgoingRequest {
        let mut contents: Vec<Turn> = history
            .iter()
            .filter_map(|msg| match msg.sender {
                Sender::User => Some(Turn::new(Role::User, msg.text.as_str())),
                Sender::Ai => Some(Turn::new(Role::Model, msg.text.as_str())),
                Sender::System => None,
            })
            .collect();

        let last_text = match pending_document {
            Some(doc) => augment(new_user_text, &doc.raw_text),
            None => new_user_text.to_string(),
        };
        contents.push(Turn::new(Role::User, last_text));

        debug!(
            turns = contents.len(),
            augmented = pending_document.is_some(),
            "assembled request"
        );

        OutgoingRequest {
            contents,
            generation_config: GenerationConfig::default(),
        }
    }
}

/// `text` followed by the separator and the document text
pub fn augment(text: &str, raw_text: &str) -> String {
    let mut out = String::with_capacity(text.len() + ATTACHMENT_SEPARATOR.len() + raw_text.len());
    out.push_str(text);
    out.push_str(ATTACHMENT_SEPARATOR);
    out.push_str(raw_text);
    out
}
