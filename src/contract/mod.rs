pub mod assertions;
pub mod openapi;
pub mod schemas;
pub mod validator;

pub use schemas::Contract;
pub use validator::{FieldKind, Schema, ValidatedInstance};
