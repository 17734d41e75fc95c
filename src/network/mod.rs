pub mod client;
pub mod envelope;
pub mod middleware;
pub mod policies;
pub mod service;

pub use client::ApiClient;
pub use envelope::ResponseEnvelope;
