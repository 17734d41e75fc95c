pub mod auth;
pub mod cloudflare;

pub use auth::AuthRequiredPolicy;
pub use cloudflare::{CloudflarePolicy, is_cloudflare_challenge};
