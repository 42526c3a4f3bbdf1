use tracing::{debug, warn};

use crate::error::ClientError;
use crate::state::{Message, APOLOGY};

/// Ticket for one ask in flight, tagged with the document it was issued against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub ticket: u64,
    pub document_id: String,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered,
    /// The request failed and the apology was appended instead
    Apologized,
    /// The transcript or document moved on; nothing was appended
    Stale,
}

/// Owns the transcript and the pending-ask flag
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: Option<u64>,
    next_ticket: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Append the user's question and hand back the request to send.
    ///
    /// Returns `None`, with no side effects, when there is no document, the
    /// trimmed text is empty, or an answer is still pending.
    pub fn send_query(&mut self, document_id: Option<&str>, text: &str) -> Option<AskRequest> {
        let document_id = document_id?;
        let query = text.trim();
        if query.is_empty() || self.pending.is_some() {
            return None;
        }

        self.messages.push(Message::user(query));
        self.next_ticket += 1;
        self.pending = Some(self.next_ticket);
        debug!(ticket = self.next_ticket, document_id, "query dispatched");

        Some(AskRequest {
            ticket: self.next_ticket,
            document_id: document_id.to_string(),
            query: query.to_string(),
        })
    }

    pub fn finish_query(
        &mut self,
        request: &AskRequest,
        current_document: Option<&str>,
        result: Result<String, ClientError>,
    ) -> QueryOutcome {
        if self.pending != Some(request.ticket) {
            debug!(ticket = request.ticket, "discarding answer for a cleared transcript");
            return QueryOutcome::Stale;
        }
        self.pending = None;

        if current_document != Some(request.document_id.as_str()) {
            debug!(
                ticket = request.ticket,
                issued_for = %request.document_id,
                "discarding answer for a replaced document"
            );
            return QueryOutcome::Stale;
        }

        match result {
            Ok(answer) => {
                self.messages.push(Message::bot(answer));
                QueryOutcome::Answered
            }
            Err(e) => {
                warn!(error = %e, ticket = request.ticket, "query failed");
                self.messages.push(Message::bot(APOLOGY));
                QueryOutcome::Apologized
            }
        }
    }

    /// Empty the transcript and forget any answer still in flight
    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = None;
    }
}
