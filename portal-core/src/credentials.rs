use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 802.11 SSID 最长 32 字节
pub const MAX_SSID_LEN: usize = 32;
/// WPA passphrase upper bound (64 hex digits for a raw PSK).
pub const MAX_PASSWORD_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Please enter a network name")]
    EmptySsid,
    #[error("Network name is too long (max 32 characters)")]
    SsidTooLong,
    #[error("Password is too long (max 64 characters)")]
    PasswordTooLong,
}

/// Network name and passphrase submitted from the setup page.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Check length limits and return a copy with the SSID trimmed.
    ///
    /// An empty password is accepted (open networks).
    pub fn validate(&self) -> Result<Credentials, CredentialError> {
        let ssid = self.ssid.trim();
        if ssid.is_empty() {
            return Err(CredentialError::EmptySsid);
        }
        if ssid.len() > MAX_SSID_LEN {
            return Err(CredentialError::SsidTooLong);
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooLong);
        }
        Ok(Credentials {
            ssid: ssid.to_string(),
            password: self.password.clone(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// 密码不能出现在日志里
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &if self.is_open() { "(empty)" } else { "********" })
            .finish()
    }
}
