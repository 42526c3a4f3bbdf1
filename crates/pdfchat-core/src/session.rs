//! Document and conversation lifecycle
//!
//! `Session` is a synchronous state machine. Each `begin_*`/`send_query` call
//! checks its preconditions, applies the optimistic transition and returns a
//! request ticket; the caller performs the network call and reports back
//! through the matching `finish_*`. Tickets let late results be recognised
//! and dropped after a reset or a document change.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::conversation::{AskRequest, Conversation, QueryOutcome};
use crate::document::{DocumentManager, UploadOutcome, UploadRequest};
use crate::error::ClientError;
use crate::state::Message;

/// What happens to local state when the user asks for a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolicy {
    /// Clear only after the service acknowledges; keep state if it fails
    #[default]
    Confirm,
    /// Clear immediately and ignore the service's answer
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoDocument,
    DocumentReady,
    AwaitingAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRequest {
    pub ticket: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// One-line status shown to the user until replaced or dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    documents: DocumentManager,
    conversation: Conversation,
    policy: ResetPolicy,
    resetting: Option<u64>,
    next_reset: u64,
    notice: Option<Notice>,
}

impl Session {
    pub fn new(policy: ResetPolicy, banner_window: Duration) -> Self {
        Self {
            documents: DocumentManager::new(banner_window),
            conversation: Conversation::new(),
            policy,
            resetting: None,
            next_reset: 0,
            notice: None,
        }
    }

    // Read access

    pub fn phase(&self) -> Phase {
        if self.documents.document_id().is_none() {
            Phase::NoDocument
        } else if self.conversation.is_loading() {
            Phase::AwaitingAnswer
        } else {
            Phase::DocumentReady
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        self.documents.document_id()
    }

    pub fn selected_file(&self) -> Option<&Path> {
        self.documents.selected_file()
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_uploading(&self) -> bool {
        self.documents.is_uploading()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting.is_some()
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.policy
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Whether a question could be sent right now, ignoring the text itself
    pub fn can_query(&self) -> bool {
        self.phase() == Phase::DocumentReady && !self.is_resetting()
    }

    // Document side

    pub fn select_file(&mut self, path: PathBuf) {
        self.documents.select_file(path);
    }

    pub fn begin_upload(&mut self) -> Option<UploadRequest> {
        if self.is_resetting() {
            return None;
        }
        let request = self.documents.begin_upload()?;
        self.notice = None;
        Some(request)
    }

    pub fn finish_upload(
        &mut self,
        request: &UploadRequest,
        result: Result<String, ClientError>,
        now: Instant,
    ) -> UploadOutcome {
        let outcome = self.documents.finish_upload(request, result, now);
        if let UploadOutcome::Failed(reason) = &outcome {
            self.notice = Some(Notice::error(format!("Upload failed: {}", reason)));
        }
        outcome
    }

    pub fn upload_banner_visible(&self, now: Instant) -> bool {
        self.documents.banner_visible(now)
    }

    pub fn tick(&mut self, now: Instant) {
        self.documents.tick(now);
    }

    // Conversation side

    pub fn send_query(&mut self, text: &str) -> Option<AskRequest> {
        if self.is_resetting() {
            return None;
        }
        self.conversation
            .send_query(self.documents.document_id(), text)
    }

    pub fn finish_query(
        &mut self,
        request: &AskRequest,
        result: Result<String, ClientError>,
    ) -> QueryOutcome {
        self.conversation
            .finish_query(request, self.documents.document_id(), result)
    }

    // Reset

    /// Request a reset of the service.
    ///
    /// Under [`ResetPolicy::Optimistic`] local state is cleared here; under
    /// [`ResetPolicy::Confirm`] it is cleared by a successful `finish_reset`
    /// and a second reset is refused while one is in flight.
    pub fn begin_reset(&mut self) -> Option<ResetRequest> {
        if self.policy == ResetPolicy::Confirm && self.resetting.is_some() {
            return None;
        }

        self.next_reset += 1;
        let request = ResetRequest {
            ticket: self.next_reset,
        };

        match self.policy {
            ResetPolicy::Confirm => {
                self.resetting = Some(request.ticket);
                self.notice = Some(Notice::info("Clearing memory..."));
            }
            ResetPolicy::Optimistic => {
                self.clear_local();
                self.notice = None;
            }
        }
        debug!(ticket = request.ticket, policy = ?self.policy, "reset requested");

        Some(request)
    }

    pub fn finish_reset(&mut self, request: &ResetRequest, result: Result<(), ClientError>) {
        match self.policy {
            ResetPolicy::Optimistic => match result {
                Ok(()) => info!(ticket = request.ticket, "service reset"),
                Err(e) => warn!(error = %e, "reset failed; local state already cleared"),
            },
            ResetPolicy::Confirm => {
                if self.resetting != Some(request.ticket) {
                    return;
                }
                self.resetting = None;

                match result {
                    Ok(()) => {
                        info!(ticket = request.ticket, "service reset");
                        self.clear_local();
                        self.notice = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "reset failed; keeping local state");
                        self.notice = Some(Notice::error(format!("Clear failed: {}", e)));
                    }
                }
            }
        }
    }

    fn clear_local(&mut self) {
        self.documents.clear();
        self.conversation.clear();
    }
}
