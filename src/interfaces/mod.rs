pub mod policy;
pub mod scenario;

pub use policy::{PolicyVerdict, ResponsePolicy};
pub use scenario::Scenario;
