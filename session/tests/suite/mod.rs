use std::sync::Arc;

use kbase_client::MockClient;
use kbase_session::Session;
use kbase_session::SessionConfig;

mod conversation;
mod http_session;
mod reset;
mod uploads;

pub(crate) fn mock_session(mock: MockClient) -> (Arc<MockClient>, Session) {
    mock_session_with(mock, SessionConfig::default())
}

pub(crate) fn mock_session_with(
    mock: MockClient,
    config: SessionConfig,
) -> (Arc<MockClient>, Session) {
    let mock = Arc::new(mock);
    let session = Session::new(mock.clone(), &config);
    (mock, session)
}

pub(crate) fn file_names(session: &Session) -> Vec<String> {
    session
        .registry()
        .files()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

pub(crate) fn staged_names(session: &Session) -> Vec<String> {
    session
        .staging()
        .staged()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}
