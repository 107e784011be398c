pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod store;

pub use client::{ClientConfig, WhoopClient};
pub use error::{Result, WhoopError};
pub use store::{EnvFileStore, MemoryStore, StoredCredentials, TokenStore};
