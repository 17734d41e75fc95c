pub mod config;
pub mod error;
pub mod event;
pub mod model;

pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
