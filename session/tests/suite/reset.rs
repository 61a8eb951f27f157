use std::time::Duration;

use kbase_client::MockClient;
use kbase_session::staging::Candidate;
use pretty_assertions::assert_eq;

use super::mock_session;

#[tokio::test]
async fn answer_arriving_after_reset_is_dropped() {
    let (mock, mut session) = mock_session(MockClient::new());
    mock.set_ask_delay(Duration::from_millis(30)).await;

    session.submit("slow question");
    session.reset();
    assert!(session.conversation().messages().is_empty());
    assert!(session.is_idle());

    let late = session.next_event().await.expect("late completion");
    session.handle_event(late);
    assert!(session.conversation().messages().is_empty());
    assert!(!session.conversation().is_pending());
}

#[tokio::test]
async fn upload_finishing_after_reset_does_not_refresh() {
    let (mock, mut session) = mock_session(MockClient::new());
    session.add_candidates([Candidate::from_bytes("a.pdf", b"pdf".to_vec())]);
    session.commit_upload();
    session.reset();
    session.add_candidates([Candidate::from_bytes("fresh.txt", b"txt".to_vec())]);

    let late = session.next_event().await.expect("late completion");
    session.handle_event(late);

    let staged: Vec<&str> = session
        .staging()
        .staged()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(staged, vec!["fresh.txt"]);
    assert!(session.drain_notices().is_empty());
    assert!(session.is_idle());
    assert_eq!(mock.calls().await.list, 0);
}

#[tokio::test]
async fn file_list_arriving_after_reset_is_dropped() {
    let (_mock, mut session) = mock_session(MockClient::with_files(["a.pdf"]));
    session.start();
    session.reset();
    // The aborted request may or may not have reported back.
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_millis(20), session.next_event()).await
    {
        session.handle_event(event);
    }
    assert!(session.registry().files().is_empty());
    assert!(!session.registry().is_loading());
}
