use kbase_client::Error;
use kbase_client::MockClient;
use kbase_session::Notice;
use kbase_session::NoticeLevel;
use kbase_session::staging::Candidate;
use kbase_session::staging::RejectReason;
use kbase_session::upload::CommitOutcome;
use kbase_session::upload::EMPTY_SELECTION_HINT;
use pretty_assertions::assert_eq;

use super::file_names;
use super::mock_session;
use super::staged_names;

fn candidate(name: &str) -> Candidate {
    Candidate::from_bytes(name, format!("contents of {name}").into_bytes())
}

#[tokio::test]
async fn failed_upload_keeps_staged_files_and_reports_detail() {
    let (mock, mut session) = mock_session(MockClient::new());
    session.start();
    session.settle().await;

    let rejected = session.add_candidates([candidate("a.pdf"), candidate("b.exe")]);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].name, "b.exe");
    assert!(matches!(
        rejected[0].reason,
        RejectReason::UnsupportedExtension { .. }
    ));
    assert_eq!(staged_names(&session), vec!["a.pdf"]);

    mock.fail_next_upload(Error::server(500, Some("disk full".to_string())))
        .await;
    assert!(matches!(
        session.commit_upload(),
        CommitOutcome::Started { file_count: 1, .. }
    ));
    session.settle().await;

    assert_eq!(staged_names(&session), vec!["a.pdf"]);
    let notices = session.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("disk full"), "{notices:?}");
    // No refresh after a failed upload.
    assert_eq!(mock.calls().await.list, 1);
}

#[tokio::test]
async fn successful_upload_clears_staging_and_refreshes_once() {
    let (mock, mut session) = mock_session(MockClient::new());
    session.start();
    session.settle().await;
    assert_eq!(mock.calls().await.list, 1);

    session.add_candidates([candidate("a.pdf"), candidate("notes.txt")]);
    session.commit_upload();
    assert!(session.uploader().is_uploading());
    session.settle().await;

    assert!(session.staging().is_empty());
    assert_eq!(mock.calls().await.upload, 1);
    assert_eq!(mock.calls().await.list, 2);
    assert_eq!(file_names(&session), vec!["a.pdf", "notes.txt"]);
    assert_eq!(
        session.drain_notices(),
        vec![Notice::success("Uploaded 2 file(s)")]
    );
}

#[tokio::test]
async fn files_staged_during_upload_stay_staged() {
    let (_mock, mut session) = mock_session(MockClient::new());
    session.add_candidates([candidate("first.pdf")]);
    session.commit_upload();
    session.add_candidates([candidate("second.docx")]);
    assert_eq!(session.commit_upload(), CommitOutcome::Busy);
    session.settle().await;

    assert_eq!(staged_names(&session), vec!["second.docx"]);
    assert!(!session.uploader().is_uploading());
}

#[tokio::test]
async fn empty_commit_only_sets_hint() {
    let (mock, mut session) = mock_session(MockClient::new());
    assert_eq!(session.commit_upload(), CommitOutcome::NothingStaged);
    assert_eq!(session.uploader().hint(), Some(EMPTY_SELECTION_HINT));
    assert!(session.is_idle());
    assert_eq!(mock.calls().await.upload, 0);
}

#[tokio::test]
async fn remove_and_clear_before_commit() {
    let (mock, mut session) = mock_session(MockClient::new());
    session.add_candidates([candidate("a.pdf"), candidate("b.pdf"), candidate("c.pdf")]);
    let removed = session.remove_candidate(1).expect("index 1 is staged");
    assert_eq!(removed.name, "b.pdf");
    assert_eq!(session.remove_candidate(9), None);
    session.commit_upload();
    session.settle().await;
    assert_eq!(mock.files().await, vec!["a.pdf", "c.pdf"]);

    session.add_candidates([candidate("d.pdf")]);
    session.clear_staged();
    assert_eq!(session.commit_upload(), CommitOutcome::NothingStaged);
}
