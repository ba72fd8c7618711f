pub mod error;
pub mod ingestor;
pub mod request;
#[cfg(test)]
mod tests;

pub use error::IngestError;
pub use ingestor::{IngestReceipt, StatusIngestor};
pub use request::StatusRequest;
