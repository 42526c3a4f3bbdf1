//! Drives `Session` against an in-memory service whose answers are released
//! by the test, so completion order can be controlled exactly.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pdfchat_core::{
    ClientError, Message, NoticeKind, Phase, QaService, QueryOutcome, ResetPolicy, Role, Session,
    UploadOutcome, APOLOGY,
};
use tokio::sync::oneshot;

fn refused() -> ClientError {
    ClientError::Io {
        path: PathBuf::from("service"),
        source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
    }
}

#[derive(Default)]
struct ScriptedService {
    uploads: Mutex<VecDeque<Option<String>>>,
    answers: Mutex<VecDeque<oneshot::Receiver<String>>>,
    resets: Mutex<VecDeque<bool>>,
    ask_calls: AtomicUsize,
    reset_calls: AtomicUsize,
}

impl ScriptedService {
    fn upload_returns(&self, id: Option<&str>) {
        self.uploads.lock().unwrap().push_back(id.map(str::to_string));
    }

    /// Queue an answer; dropping the sender makes the ask fail
    fn next_answer(&self) -> oneshot::Sender<String> {
        let (tx, rx) = oneshot::channel();
        self.answers.lock().unwrap().push_back(rx);
        tx
    }

    fn reset_returns(&self, ok: bool) {
        self.resets.lock().unwrap().push_back(ok);
    }

    fn ask_calls(&self) -> usize {
        self.ask_calls.load(Ordering::SeqCst)
    }
}

impl QaService for ScriptedService {
    async fn upload_pdf(&self, _path: &Path) -> Result<String, ClientError> {
        let scripted = self.uploads.lock().unwrap().pop_front().flatten();
        scripted.ok_or_else(refused)
    }

    async fn ask(&self, _document_id: &str, _query: &str) -> Result<String, ClientError> {
        self.ask_calls.fetch_add(1, Ordering::SeqCst);
        let rx = self.answers.lock().unwrap().pop_front();
        match rx {
            Some(rx) => rx.await.map_err(|_| refused()),
            None => Err(refused()),
        }
    }

    async fn reset_all(&self) -> Result<(), ClientError> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        let ok = self.resets.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(refused())
        }
    }
}

async fn upload(session: &mut Session, service: &ScriptedService, now: Instant) -> UploadOutcome {
    session.select_file(PathBuf::from("report.pdf"));
    let request = session.begin_upload().expect("upload should start");
    let result = service.upload_pdf(&request.path).await;
    session.finish_upload(&request, result, now)
}

async fn reset(session: &mut Session, service: &ScriptedService) {
    let request = session.begin_reset().expect("reset should start");
    let result = service.reset_all().await;
    session.finish_reset(&request, result);
}

fn new_session(policy: ResetPolicy) -> Session {
    Session::new(policy, Duration::from_secs(3))
}

#[tokio::test]
async fn upload_then_ask_appends_answer() {
    let service = ScriptedService::default();
    let mut session = new_session(ResetPolicy::Confirm);

    service.upload_returns(Some("abc123"));
    let t0 = Instant::now();
    let outcome = upload(&mut session, &service, t0).await;
    assert_eq!(outcome, UploadOutcome::Stored("abc123".to_string()));
    assert_eq!(session.document_id(), Some("abc123"));
    assert!(session.upload_banner_visible(t0 + Duration::from_secs(2)));
    assert!(!session.upload_banner_visible(t0 + Duration::from_secs(3)));

    let answer = service.next_answer();
    let ask = session.send_query("What is the summary?").unwrap();
    assert_eq!(session.messages(), &[Message::user("What is the summary?")]);

    answer.send("This document is about...".to_string()).unwrap();
    let result = service.ask(&ask.document_id, &ask.query).await;
    assert_eq!(session.finish_query(&ask, result), QueryOutcome::Answered);

    assert_eq!(
        session.messages(),
        &[
            Message::user("What is the summary?"),
            Message::bot("This document is about..."),
        ]
    );
    assert_eq!(session.phase(), Phase::DocumentReady);
}

#[tokio::test]
async fn failed_ask_appends_apology() {
    let service = ScriptedService::default();
    let mut session = new_session(ResetPolicy::Confirm);
    service.upload_returns(Some("abc123"));
    upload(&mut session, &service, Instant::now()).await;

    drop(service.next_answer());
    let ask = session.send_query("What is the summary?").unwrap();
    let result = service.ask(&ask.document_id, &ask.query).await;
    assert_eq!(session.finish_query(&ask, result), QueryOutcome::Apologized);

    let last = session.messages().last().unwrap();
    assert_eq!(last.role, Role::Bot);
    assert_eq!(last.text, APOLOGY);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn failed_upload_surfaces_notice() {
    let service = ScriptedService::default();
    let mut session = new_session(ResetPolicy::Confirm);

    service.upload_returns(None);
    let outcome = upload(&mut session, &service, Instant::now()).await;

    assert!(matches!(outcome, UploadOutcome::Failed(_)));
    assert_eq!(session.phase(), Phase::NoDocument);
    assert_eq!(session.notice().unwrap().kind, NoticeKind::Error);
}

#[tokio::test]
async fn pending_ask_blocks_further_dispatch() {
    let service = Arc::new(ScriptedService::default());
    let mut session = new_session(ResetPolicy::Confirm);
    service.upload_returns(Some("abc123"));
    upload(&mut session, &service, Instant::now()).await;

    let answer = service.next_answer();
    let ask = session.send_query("first").unwrap();
    let in_flight = {
        let service = Arc::clone(&service);
        let ask = ask.clone();
        tokio::spawn(async move { service.ask(&ask.document_id, &ask.query).await })
    };

    for text in ["second", "third", "fourth"] {
        if let Some(extra) = session.send_query(text) {
            service.ask(&extra.document_id, &extra.query).await.ok();
        }
    }
    assert_eq!(session.phase(), Phase::AwaitingAnswer);
    assert_eq!(session.messages().len(), 1);

    answer.send("done".to_string()).unwrap();
    let result = in_flight.await.unwrap();
    session.finish_query(&ask, result);

    assert_eq!(service.ask_calls(), 1);
    assert!(session.send_query("second").is_some());
}

#[tokio::test]
async fn blank_or_documentless_queries_never_reach_service() {
    let service = ScriptedService::default();
    let mut session = new_session(ResetPolicy::Confirm);

    assert!(session.send_query("What is the summary?").is_none());

    service.upload_returns(Some("abc123"));
    upload(&mut session, &service, Instant::now()).await;
    assert!(session.send_query("").is_none());
    assert!(session.send_query("   ").is_none());

    assert_eq!(service.ask_calls(), 0);
    assert!(session.messages().is_empty());
}

#[tokio::test]
async fn reset_mid_answer_discards_late_response() {
    for policy in [ResetPolicy::Confirm, ResetPolicy::Optimistic] {
        let service = Arc::new(ScriptedService::default());
        let mut session = new_session(policy);
        service.upload_returns(Some("abc123"));
        upload(&mut session, &service, Instant::now()).await;

        let answer = service.next_answer();
        let ask = session.send_query("What is the summary?").unwrap();
        let in_flight = {
            let service = Arc::clone(&service);
            let ask = ask.clone();
            tokio::spawn(async move { service.ask(&ask.document_id, &ask.query).await })
        };

        reset(&mut session, &service).await;
        assert_eq!(session.document_id(), None);
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());

        answer.send("This document is about...".to_string()).unwrap();
        let result = in_flight.await.unwrap();
        assert_eq!(session.finish_query(&ask, result), QueryOutcome::Stale);

        assert!(session.messages().is_empty());
        assert_eq!(session.phase(), Phase::NoDocument);
    }
}

#[tokio::test]
async fn failed_reset_policy_decides_local_state() {
    let service = ScriptedService::default();

    let mut confirm = new_session(ResetPolicy::Confirm);
    service.upload_returns(Some("kept"));
    upload(&mut confirm, &service, Instant::now()).await;
    service.reset_returns(false);
    reset(&mut confirm, &service).await;
    assert_eq!(confirm.document_id(), Some("kept"));
    assert_eq!(confirm.notice().unwrap().kind, NoticeKind::Error);

    let mut optimistic = new_session(ResetPolicy::Optimistic);
    service.upload_returns(Some("dropped"));
    upload(&mut optimistic, &service, Instant::now()).await;
    service.reset_returns(false);
    reset(&mut optimistic, &service).await;
    assert_eq!(optimistic.document_id(), None);

    assert_eq!(service.reset_calls.load(Ordering::SeqCst), 2);
}
