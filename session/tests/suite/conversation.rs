use std::time::Duration;

use kbase_client::Answer;
use kbase_client::Error;
use kbase_client::MockClient;
use kbase_session::SessionConfig;
use kbase_session::conversation::Sender;
use kbase_session::conversation::SubmitOutcome;
use pretty_assertions::assert_eq;

use super::mock_session;
use super::mock_session_with;

fn log(session: &kbase_session::Session) -> Vec<(Sender, String)> {
    session
        .conversation()
        .messages()
        .iter()
        .map(|m| (m.sender(), m.text().to_string()))
        .collect()
}

#[tokio::test]
async fn refund_policy_question_gets_answer() {
    let (mock, mut session) = mock_session(MockClient::new());
    mock.push_answer(Ok(Answer::new("30 days"))).await;

    let outcome = session.submit("What is the refund policy?");
    assert_eq!(outcome, SubmitOutcome::Submitted { turn: 1 });
    session.settle().await;

    assert_eq!(
        log(&session),
        vec![
            (Sender::User, "What is the refund policy?".to_string()),
            (Sender::Assistant, "30 days".to_string()),
        ]
    );
    assert_eq!(session.conversation().last_error(), None);
}

#[tokio::test]
async fn sequential_questions_alternate_in_call_order() {
    let (mock, mut session) = mock_session(MockClient::new());
    for (question, answer) in [("one?", "1"), ("two?", "2"), ("three?", "3")] {
        mock.push_answer(Ok(Answer::new(answer))).await;
        session.submit(question);
        session.settle().await;
    }

    assert_eq!(
        log(&session),
        vec![
            (Sender::User, "one?".to_string()),
            (Sender::Assistant, "1".to_string()),
            (Sender::User, "two?".to_string()),
            (Sender::Assistant, "2".to_string()),
            (Sender::User, "three?".to_string()),
            (Sender::Assistant, "3".to_string()),
        ]
    );
    assert_eq!(mock.calls().await.ask, 3);
}

#[tokio::test]
async fn submit_while_pending_sends_nothing() {
    let (mock, mut session) = mock_session(MockClient::new());
    mock.set_ask_delay(Duration::from_millis(50)).await;

    session.submit("first");
    assert!(session.conversation().is_pending());
    assert_eq!(session.submit("second"), SubmitOutcome::Busy);
    assert_eq!(session.conversation().messages().len(), 1);

    session.settle().await;
    assert_eq!(session.conversation().messages().len(), 2);
    assert_eq!(mock.calls().await.ask, 1);
}

#[tokio::test]
async fn blank_question_is_ignored() {
    let (mock, mut session) = mock_session(MockClient::new());
    assert_eq!(session.submit("   "), SubmitOutcome::Blank);
    assert_eq!(session.submit(""), SubmitOutcome::Blank);
    assert!(session.conversation().messages().is_empty());
    assert!(session.is_idle());
    assert_eq!(mock.calls().await.ask, 0);
}

#[tokio::test]
async fn server_error_detail_becomes_error_message() {
    let (mock, mut session) = mock_session(MockClient::new());
    mock.push_answer(Err(Error::server(
        500,
        Some("vector store offline".to_string()),
    )))
    .await;

    session.submit("anything?");
    session.settle().await;

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), "Error: vector store offline");
    assert!(messages[1].is_failed());
    assert_eq!(
        session.conversation().last_error(),
        Some("vector store offline")
    );

    // The session is usable again.
    mock.push_answer(Ok(Answer::new("back"))).await;
    assert!(matches!(
        session.submit("again?"),
        SubmitOutcome::Submitted { .. }
    ));
    session.settle().await;
    assert_eq!(session.conversation().messages()[3].text(), "back");
    assert_eq!(session.conversation().last_error(), None);
}

#[tokio::test]
async fn slow_answer_times_out_with_error_message() {
    let config = SessionConfig {
        query_timeout: Duration::from_millis(50),
        ..SessionConfig::default()
    };
    let (mock, mut session) = mock_session_with(MockClient::new(), config);
    mock.set_ask_delay(Duration::from_secs(10)).await;

    session.submit("will this hang?");
    session.settle().await;

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text(), "Error: request timed out after 50ms");
    assert!(messages[1].is_failed());
    assert!(!session.conversation().is_pending());
}

#[tokio::test]
async fn answer_sources_are_kept() {
    let (_mock, mut session) = mock_session(MockClient::with_files(["handbook.pdf"]));
    session.submit("vacation days?");
    session.settle().await;

    let answer = &session.conversation().messages()[1];
    assert_eq!(answer.sources(), ["handbook.pdf".to_string()]);
    assert!(
        session
            .conversation()
            .transcript()
            .ends_with("Source: handbook.pdf")
    );
}
