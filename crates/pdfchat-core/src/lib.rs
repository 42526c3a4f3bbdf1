pub mod client;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod session;
pub mod state;
pub mod theme;

// Re-export main types for convenience
pub use client::{HttpQaClient, QaService, DEFAULT_BASE_URL};
pub use config::Config;
pub use conversation::{AskRequest, Conversation, QueryOutcome};
pub use document::{is_pdf, DocumentManager, UploadOutcome, UploadRequest};
pub use error::{ClientError, ConfigError};
pub use session::{Notice, NoticeKind, Phase, ResetPolicy, ResetRequest, Session};
pub use state::{Message, Role, APOLOGY};
pub use theme::Theme;
