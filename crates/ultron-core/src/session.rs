//! Session orchestration: the only place session state changes.
//!
//! The controller runs on a single control loop. Slow work (a completion or an
//! extraction) is split into `begin_*`, which validates and records the
//! transition, and `finish_*`, which applies the result. The work itself runs
//! through the returned pending value, so a host can await it inline or on a
//! spawned task. At most one operation is in flight at a time.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::ai::{contact_failure_message, Completer};
use crate::context::{ContextAssembler, OutgoingRequest};
use crate::document::{DocumentContext, DocumentTextExtractor, DocumentUpload};
use crate::error::{CompletionError, ExtractionError};
use crate::message::{Message, MessageStore, Sender};

/// Text of the notice recorded when a document is attached
pub fn upload_notice(file_name: &str) -> String {
    format!("1 PDF uploaded: \"{}\"", file_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingReply,
    Extracting,
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub messages: MessageStore,
    pub pending_document: Option<DocumentContext>,
    pub phase: Phase,
}

impl SessionState {
    /// True while a reply is outstanding
    pub fn busy(&self) -> bool {
        self.phase == Phase::AwaitingReply
    }
}

/// Identifies the one in-flight operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// An accepted send whose reply has not been fetched yet
#[derive(Debug)]
pub struct PendingSend {
    ticket: Ticket,
    request: OutgoingRequest,
}

impl PendingSend {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn request(&self) -> &OutgoingRequest {
        &self.request
    }

    pub async fn run<C: Completer + ?Sized>(self, completer: &C) -> SendResult {
        let outcome = completer.complete(&self.request).await;
        SendResult {
            ticket: self.ticket,
            backend_name: completer.backend_name().to_string(),
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct SendResult {
    pub ticket: Ticket,
    pub backend_name: String,
    pub outcome: Result<String, CompletionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty input or a send while busy; nothing changed
    Ignored,
    Replied(Message),
    /// The backend failed; `message` carries the fallback text
    FellBack {
        message: Message,
        error: CompletionError,
    },
    /// A new chat was requested while in flight; the reply was dropped
    Discarded,
}

/// An accepted PDF upload whose text has not been extracted yet
#[derive(Debug)]
pub struct PendingUpload {
    ticket: Ticket,
    upload: DocumentUpload,
}

impl PendingUpload {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn file_name(&self) -> &str {
        &self.upload.file_name
    }

    pub async fn run(self) -> UploadResult {
        let result = DocumentTextExtractor::extract_upload(self.upload).await;
        UploadResult {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug)]
pub struct UploadResult {
    pub ticket: Ticket,
    pub result: Result<DocumentContext, ExtractionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Not a PDF, or another operation is in flight
    Ignored,
    /// Document attached; the system notice that was appended
    Attached(Message),
    /// Extraction failed; session state is unchanged
    Failed(ExtractionError),
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewChat {
    Reset,
    /// Applied once the in-flight operation settles
    Deferred,
}

#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
    in_flight: Option<Ticket>,
    next_ticket: u64,
    reset_deferred: bool,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages.all()
    }

    pub fn pending_document(&self) -> Option<&DocumentContext> {
        self.state.pending_document.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn busy(&self) -> bool {
        self.state.busy()
    }

    pub fn reset_deferred(&self) -> bool {
        self.reset_deferred
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.state.messages.subscribe()
    }

    /// Record the user's message and build its request.
    ///
    /// Returns `None` for blank input or when another operation is in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank input");
            return None;
        }
        if self.state.phase != Phase::Idle {
            warn!(phase = ?self.state.phase, "send ignored while an operation is in flight");
            return None;
        }

        // The pending document stays attached until a new chat
        let request = ContextAssembler::assemble(
            self.state.messages.all(),
            self.state.pending_document.as_ref(),
            text,
        );
        self.state.messages.append(Sender::User, text);
        self.state.phase = Phase::AwaitingReply;
        let ticket = self.issue_ticket();

        info!(
            turns = request.contents.len(),
            with_document = self.state.pending_document.is_some(),
            "send accepted"
        );
        Some(PendingSend { ticket, request })
    }

    pub fn finish_send(&mut self, result: SendResult) -> SendOutcome {
        if !self.settle(result.ticket, Phase::AwaitingReply) {
            return SendOutcome::Discarded;
        }
        if self.reset_deferred {
            self.apply_reset();
            return SendOutcome::Discarded;
        }

        match result.outcome {
            Ok(reply) => SendOutcome::Replied(self.state.messages.append(Sender::Ai, reply)),
            Err(error) => {
                warn!(%error, backend = %result.backend_name, "completion failed");
                let message = self
                    .state
                    .messages
                    .append(Sender::Ai, contact_failure_message(&result.backend_name));
                SendOutcome::FellBack { message, error }
            }
        }
    }

    /// Full send cycle, awaited inline.
    pub async fn send<C: Completer + ?Sized>(&mut self, text: &str, completer: &C) -> SendOutcome {
        match self.begin_send(text) {
            Some(pending) => {
                let result = pending.run(completer).await;
                self.finish_send(result)
            }
            None => SendOutcome::Ignored,
        }
    }

    /// Accept a PDF for extraction. Other types are silently ignored.
    pub fn begin_upload(&mut self, upload: DocumentUpload) -> Option<PendingUpload> {
        if !upload.is_pdf() {
            debug!(mime = %upload.mime_type, file = %upload.file_name, "ignoring non-PDF upload");
            return None;
        }
        if self.state.phase != Phase::Idle {
            warn!(phase = ?self.state.phase, "upload ignored while an operation is in flight");
            return None;
        }

        self.state.phase = Phase::Extracting;
        let ticket = self.issue_ticket();
        info!(file = %upload.file_name, bytes = upload.bytes.len(), "extracting document");
        Some(PendingUpload { ticket, upload })
    }

    pub fn finish_upload(&mut self, result: UploadResult) -> UploadOutcome {
        if !self.settle(result.ticket, Phase::Extracting) {
            return UploadOutcome::Discarded;
        }
        if self.reset_deferred {
            self.apply_reset();
            return UploadOutcome::Discarded;
        }

        match result.result {
            Ok(document) => {
                let notice = upload_notice(&document.file_name);
                info!(file = %document.file_name, chars = document.raw_text.len(), "document attached");
                self.state.pending_document = Some(document);
                UploadOutcome::Attached(self.state.messages.append(Sender::System, notice))
            }
            Err(error) => {
                warn!(%error, "document extraction failed");
                UploadOutcome::Failed(error)
            }
        }
    }

    /// Full upload cycle, awaited inline.
    pub async fn upload_document(&mut self, upload: DocumentUpload) -> UploadOutcome {
        match self.begin_upload(upload) {
            Some(pending) => {
                let result = pending.run().await;
                self.finish_upload(result)
            }
            None => UploadOutcome::Ignored,
        }
    }

    /// Clear history and the attached document.
    ///
    /// With an operation in flight the reset waits for it to settle and its
    /// result is dropped.
    pub fn new_chat(&mut self) -> NewChat {
        if self.in_flight.is_some() {
            info!("new chat deferred until the in-flight operation settles");
            self.reset_deferred = true;
            return NewChat::Deferred;
        }
        self.apply_reset();
        NewChat::Reset
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.in_flight = Some(ticket);
        ticket
    }

    /// Close out the in-flight operation. False if `ticket` is not it.
    fn settle(&mut self, ticket: Ticket, expected: Phase) -> bool {
        if self.in_flight != Some(ticket) || self.state.phase != expected {
            warn!(?ticket, phase = ?self.state.phase, "dropping result for an operation that is not in flight");
            return false;
        }
        self.in_flight = None;
        self.state.phase = Phase::Idle;
        true
    }

    fn apply_reset(&mut self) {
        self.state.messages.reset();
        self.state.pending_document = None;
        self.state.phase = Phase::Idle;
        self.reset_deferred = false;
        info!("new chat started");
    }
}
