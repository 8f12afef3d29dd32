//! Core library for the captive-portal WiFi setup service.
//! This crate defines the network list normalizer, credential validation and
//! persistence, the backend traits (Wi-Fi control) with their implementations,
//! the embedded UI asset provider and the axum web server that glues them.

pub mod backends;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod frontend;
pub mod networks;
pub mod store;
pub mod traits;
pub mod web_server;

use thiserror::Error;

pub use credentials::{CredentialError, Credentials};
pub use networks::{DedupPolicy, Encryption, NetworkRecord, RankedNetwork, SignalTier};

// Define a shared Error and Result type for the entire crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
