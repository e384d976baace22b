pub mod client;
pub mod interpreter;
pub mod models;

pub use client::{ApiClient, ApiError};
pub use models::ApiConfig;
