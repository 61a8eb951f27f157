#![deny(clippy::unwrap_used, clippy::expect_used)]

mod api;

pub use api::Answer;
pub use api::DocumentBackend;
pub use api::Error;
pub use api::FileContent;
pub use api::Result;
pub use api::ServerError;
pub use api::UploadFile;
pub use api::UploadReceipt;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "online")]
mod http;

#[cfg(feature = "mock")]
pub use mock::MockCalls;
#[cfg(feature = "mock")]
pub use mock::MockClient;

#[cfg(feature = "online")]
pub use http::HttpClient;
#[cfg(feature = "online")]
pub use kbase_backend_client::PathStyle;
