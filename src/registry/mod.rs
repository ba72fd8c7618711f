pub mod error;
pub mod fake;
pub mod lambda;
pub mod registrar;
pub mod service;
#[cfg(test)]
mod tests;

pub use error::RegistrarError;
pub use fake::FakeRegistrar;
pub use lambda::LambdaRegistrar;
pub use registrar::{RegistrationRequest, RegistrationResponse, Registrar};
pub use service::DeviceRegistry;
