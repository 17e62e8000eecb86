pub mod ai;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod message;
pub mod session;

// Re-export main types for convenience
pub use ai::{Completer, GeminiClient, ParsedReply};
pub use config::Config;
pub use context::{ContextAssembler, OutgoingRequest, Role, Turn};
pub use document::{DocumentContext, DocumentTextExtractor, DocumentUpload};
pub use error::{CompletionError, ExtractionError};
pub use message::{Message, MessageStore, Sender};
pub use session::{
    NewChat, PendingSend, PendingUpload, Phase, SendOutcome, SendResult, SessionController,
    SessionState, UploadOutcome, UploadResult,
};
