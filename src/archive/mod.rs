pub mod error;
pub mod fake;
pub mod s3;
pub mod storage;

pub use error::ArchiveError;
pub use fake::FakeArchive;
pub use s3::S3Archive;
pub use storage::Archive;
