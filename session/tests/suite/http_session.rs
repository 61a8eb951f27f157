use std::sync::Arc;

use kbase_client::HttpClient;
use kbase_session::NoticeLevel;
use kbase_session::Session;
use kbase_session::SessionConfig;
use kbase_session::conversation::Sender;
use kbase_session::rich_text::Block;
use kbase_session::staging::Candidate;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_json;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::file_names;
use super::staged_names;

#[allow(clippy::expect_used)]
fn http_session(server: &MockServer) -> Session {
    let config = SessionConfig::default()
        .with_base_url(&server.uri())
        .expect("mock server uri");
    let client = HttpClient::new(config.base_url.clone())
        .expect("client")
        .with_path_style(config.path_style);
    Session::new(Arc::new(client), &config)
}

#[tokio::test]
async fn question_round_trip_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": ["policy.pdf"]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .and(body_json(json!({"query": "What is the refund policy?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Refunds within **30 days**.",
            "source_documents": [{"source": "policy.pdf", "page": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = http_session(&server);
    session.start();
    session.submit("What is the refund policy?");
    session.settle().await;

    assert_eq!(file_names(&session), vec!["policy.pdf"]);
    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender(), Sender::User);
    assert_eq!(messages[1].text(), "Refunds within **30 days**.");
    assert_eq!(
        messages[1].blocks().last(),
        Some(&Block::Citation("policy.pdf".to_string()))
    );
}

#[tokio::test]
async fn upload_failure_detail_reaches_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "disk full"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = http_session(&server);
    session.add_candidates([
        Candidate::from_bytes("a.pdf", b"%PDF-1.4".to_vec()),
        Candidate::from_bytes("b.exe", b"MZ".to_vec()),
    ]);
    session.commit_upload();
    session.settle().await;

    assert_eq!(staged_names(&session), vec!["a.pdf"]);
    let notices = session.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert_eq!(notices[0].message, "disk full");
}

#[tokio::test]
async fn upload_success_triggers_refresh_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Successfully uploaded 1 files",
            "uploaded_files": ["a.pdf"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": ["a.pdf"]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = http_session(&server);
    session.add_candidates([Candidate::from_bytes("a.pdf", b"%PDF-1.4".to_vec())]);
    session.commit_upload();
    session.settle().await;

    assert!(session.staging().is_empty());
    assert_eq!(file_names(&session), vec!["a.pdf"]);
}

#[tokio::test]
async fn delete_goes_to_encoded_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"files": ["q3 report.pdf"]})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/files/q3%20report.pdf"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = http_session(&server);
    session.start();
    session.settle().await;
    assert_eq!(file_names(&session), vec!["q3 report.pdf"]);

    session.request_delete("q3 report.pdf");
    session.confirm_delete();
    session.settle().await;
    assert!(file_names(&session).is_empty());
}
