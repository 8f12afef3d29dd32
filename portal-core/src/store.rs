//! Persistence of the credentials chosen on the setup page (`wifi.json`).

use crate::config::StoreConfig;
use crate::credentials::Credentials;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    fallback: Option<Credentials>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: None,
        }
    }

    /// Credentials returned by [`load`](Self::load) when the file is unusable.
    pub fn with_fallback(mut self, fallback: Option<Credentials>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn from_config(cfg: &StoreConfig) -> Self {
        let fallback = cfg
            .default_ssid
            .as_ref()
            .map(|ssid| Credentials::new(ssid.clone(), cfg.default_password.clone().unwrap_or_default()));
        Self::new(&cfg.path).with_fallback(fallback)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored credentials, falling back to the configured defaults when
    /// the file is missing, unreadable or malformed.
    pub async fn load(&self) -> Option<Credentials> {
        let bytes = match fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "Credential file missing, using defaults");
                return self.fallback.clone();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read credential file, using defaults: {}", e);
                return self.fallback.clone();
            }
        };

        match serde_json::from_slice::<Credentials>(&bytes) {
            Ok(c) if !c.ssid.is_empty() => Some(c),
            Ok(_) => {
                tracing::warn!("Credential file has an empty SSID, using defaults");
                self.fallback.clone()
            }
            Err(e) => {
                tracing::error!("Credential file parse failed, using defaults: {}", e);
                self.fallback.clone()
            }
        }
    }

    /// 先写临时文件再 rename，避免掉电留下半个文件
    pub async fn save(&self, creds: &Credentials) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        // 每次保存使用独立的临时文件，并发写入不会互相截断
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self.path.with_extension(format!("json.{}.{seq}.tmp", std::process::id()));
        let body = serde_json::to_vec(creds)?;
        fs::write(&tmp, body).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::info!(ssid = %creds.ssid, path = %self.path.display(), "WiFi config saved");
        Ok(())
    }
}
