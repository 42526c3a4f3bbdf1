use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::ClientError;

/// Ticket for one upload in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub ticket: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Stored(String),
    Failed(String),
    /// The upload was superseded by a reset before it resolved
    Stale,
}

/// Owns the selected local file and the identifier the service issued for it
#[derive(Debug)]
pub struct DocumentManager {
    selected_file: Option<PathBuf>,
    document_id: Option<String>,
    uploading: Option<u64>,
    uploaded_at: Option<Instant>,
    banner_window: Duration,
    next_ticket: u64,
}

impl DocumentManager {
    pub fn new(banner_window: Duration) -> Self {
        Self {
            selected_file: None,
            document_id: None,
            uploading: None,
            uploaded_at: None,
            banner_window,
            next_ticket: 0,
        }
    }

    pub fn select_file(&mut self, path: PathBuf) {
        debug!(path = %path.display(), "file selected");
        self.selected_file = Some(path);
    }

    pub fn selected_file(&self) -> Option<&Path> {
        self.selected_file.as_deref()
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.is_some()
    }

    /// Start an upload of the selected file, if there is one and none is running
    pub fn begin_upload(&mut self) -> Option<UploadRequest> {
        if self.uploading.is_some() {
            return None;
        }
        let path = self.selected_file.clone()?;

        self.next_ticket += 1;
        self.uploading = Some(self.next_ticket);
        Some(UploadRequest {
            ticket: self.next_ticket,
            path,
        })
    }

    pub fn finish_upload(
        &mut self,
        request: &UploadRequest,
        result: Result<String, ClientError>,
        now: Instant,
    ) -> UploadOutcome {
        if self.uploading != Some(request.ticket) {
            debug!(ticket = request.ticket, "discarding stale upload result");
            return UploadOutcome::Stale;
        }
        self.uploading = None;

        match result {
            Ok(document_id) => {
                info!(document_id = %document_id, path = %request.path.display(), "upload accepted");
                self.document_id = Some(document_id.clone());
                // A file picked while the upload ran stays selected
                if self.selected_file.as_deref() == Some(request.path.as_path()) {
                    self.selected_file = None;
                }
                self.uploaded_at = Some(now);
                UploadOutcome::Stored(document_id)
            }
            Err(e) => {
                warn!(error = %e, path = %request.path.display(), "upload failed");
                UploadOutcome::Failed(e.to_string())
            }
        }
    }

    /// Whether the "uploaded" banner is still inside its display window
    pub fn banner_visible(&self, now: Instant) -> bool {
        self.uploaded_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.banner_window)
    }

    /// Expire the banner once its window has passed
    pub fn tick(&mut self, now: Instant) {
        if self.uploaded_at.is_some() && !self.banner_visible(now) {
            self.uploaded_at = None;
        }
    }

    /// Forget the document, the selection, the banner and any upload in flight
    pub fn clear(&mut self) {
        self.selected_file = None;
        self.document_id = None;
        self.uploading = None;
        self.uploaded_at = None;
    }
}

/// Accept only PDF files, going by extension
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> DocumentManager {
        DocumentManager::new(Duration::from_secs(3))
    }

    #[test]
    fn test_upload_requires_selected_file() {
        let mut docs = manager();
        assert!(docs.begin_upload().is_none());
        assert!(!docs.is_uploading());
    }

    #[test]
    fn test_select_file_replaces_previous() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("a.pdf"));
        docs.select_file(PathBuf::from("b.pdf"));
        assert_eq!(docs.selected_file(), Some(Path::new("b.pdf")));
    }

    #[test]
    fn test_only_one_upload_in_flight() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("a.pdf"));

        let first = docs.begin_upload().unwrap();
        assert!(docs.is_uploading());
        assert!(docs.begin_upload().is_none());

        docs.finish_upload(&first, Ok("abc123".to_string()), Instant::now());
        assert!(!docs.is_uploading());
    }

    #[test]
    fn test_selection_made_during_upload_survives_success() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("a.pdf"));
        let request = docs.begin_upload().unwrap();

        docs.select_file(PathBuf::from("b.pdf"));
        docs.finish_upload(&request, Ok("id-a".to_string()), Instant::now());

        assert_eq!(docs.document_id(), Some("id-a"));
        assert_eq!(docs.selected_file(), Some(Path::new("b.pdf")));
        assert!(docs.begin_upload().is_some());
    }

    #[test]
    fn test_success_stores_id_and_shows_banner_for_window() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("report.pdf"));
        let request = docs.begin_upload().unwrap();

        let t0 = Instant::now();
        let outcome = docs.finish_upload(&request, Ok("abc123".to_string()), t0);

        assert_eq!(outcome, UploadOutcome::Stored("abc123".to_string()));
        assert_eq!(docs.document_id(), Some("abc123"));
        assert_eq!(docs.selected_file(), None);
        assert!(docs.banner_visible(t0));
        assert!(docs.banner_visible(t0 + Duration::from_millis(2999)));
        assert!(!docs.banner_visible(t0 + Duration::from_secs(3)));

        docs.tick(t0 + Duration::from_secs(1));
        assert!(docs.banner_visible(t0 + Duration::from_secs(1)));
        docs.tick(t0 + Duration::from_secs(4));
        assert!(!docs.banner_visible(t0));
    }

    #[test]
    fn test_failure_keeps_previous_document() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("first.pdf"));
        let first = docs.begin_upload().unwrap();
        docs.finish_upload(&first, Ok("first-id".to_string()), Instant::now());

        docs.select_file(PathBuf::from("second.pdf"));
        let second = docs.begin_upload().unwrap();
        let err = ClientError::Io {
            path: PathBuf::from("second.pdf"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let outcome = docs.finish_upload(&second, Err(err), Instant::now());

        assert!(matches!(outcome, UploadOutcome::Failed(_)));
        assert_eq!(docs.document_id(), Some("first-id"));
        assert_eq!(docs.selected_file(), Some(Path::new("second.pdf")));
        assert!(!docs.is_uploading());
    }

    #[test]
    fn test_result_after_clear_is_stale() {
        let mut docs = manager();
        docs.select_file(PathBuf::from("a.pdf"));
        let request = docs.begin_upload().unwrap();

        docs.clear();
        let outcome = docs.finish_upload(&request, Ok("late".to_string()), Instant::now());

        assert_eq!(outcome, UploadOutcome::Stale);
        assert_eq!(docs.document_id(), None);
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("paper.pdf")));
        assert!(is_pdf(Path::new("/tmp/SCAN.PDF")));
        assert!(!is_pdf(Path::new("notes.txt")));
        assert!(!is_pdf(Path::new("pdf")));
    }
}
