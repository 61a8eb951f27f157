mod client;
pub mod types;

pub use client::BackendError;
pub use client::Client;
pub use client::PathStyle;
pub use client::Result;
pub use types::FilesResponse;
pub use types::MessageResponse;
pub use types::QueryRequest;
pub use types::QueryResponse;
pub use types::SourceDocument;
pub use types::UploadPart;
pub use types::UploadResponse;
