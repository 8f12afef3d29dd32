use crate::config::ApConfig;
use crate::credentials::Credentials;
use crate::networks::{Encryption, NetworkRecord};
use crate::traits::WifiBackend;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// SSID the mock refuses to join, to exercise the failure path.
pub const MOCK_FAILING_SSID: &str = "xfinitywifi";

/// A mock backend for development and tests.
/// It simulates scanning and connecting without any real hardware interaction.
#[derive(Debug)]
pub struct MockBackend {
    delay: Duration,
    networks: Vec<NetworkRecord>,
    connected: Mutex<Option<String>>,
    ap_running: AtomicBool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_secs(2),
            networks: default_networks(),
            connected: Mutex::new(None),
            ap_running: AtomicBool::new(false),
        }
    }

    /// Replace the simulated scan and connect latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_networks(mut self, networks: Vec<NetworkRecord>) -> Self {
        self.networks = networks;
        self
    }

    /// SSID of the last successful `connect`, if any.
    pub fn connected_ssid(&self) -> Option<String> {
        self.connected.lock().ok().and_then(|g| g.clone())
    }

    pub fn ap_running(&self) -> bool {
        self.ap_running.load(Ordering::SeqCst)
    }
}

// 包含重复 SSID，模拟多个 AP 广播同一名称
fn default_networks() -> Vec<NetworkRecord> {
    vec![
        NetworkRecord::new("MyHomeWiFi", -48, Encryption::Secured),
        NetworkRecord::new("CafeGuest", -67, Encryption::Open),
        NetworkRecord::new("Neighbor's Network", -78, Encryption::Secured),
        NetworkRecord::new(MOCK_FAILING_SSID, -58, Encryption::Secured),
        NetworkRecord::new("MyHomeWiFi", -62, Encryption::Secured),
        NetworkRecord::new("HiddenNetwork", -85, Encryption::Secured),
    ]
}

#[async_trait]
impl WifiBackend for MockBackend {
    async fn start_ap(&self, ap: &ApConfig) -> Result<()> {
        tracing::info!(ssid = %ap.ssid, gateway = %ap.gateway_cidr, "🤖 [MockBackend] AP started");
        self.ap_running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_ap(&self) -> Result<()> {
        if self.ap_running.swap(false, Ordering::SeqCst) {
            tracing::info!("🤖 [MockBackend] AP stopped");
        }
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<NetworkRecord>> {
        tracing::info!("🤖 [MockBackend] Scanning for networks...");
        sleep(self.delay).await;

        tracing::info!("🤖 [MockBackend] Found {} networks.", self.networks.len());
        Ok(self.networks.clone())
    }

    async fn connect(&self, creds: &Credentials) -> Result<()> {
        tracing::info!(?creds, "🤖 [MockBackend] Attempting to connect");
        // 单射频：连接前先关闭热点
        self.stop_ap().await?;
        sleep(self.delay).await;

        if creds.ssid == MOCK_FAILING_SSID {
            tracing::warn!(ssid = %creds.ssid, "🤖 [MockBackend] Connection failed");
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "Simulated connection failure",
            )));
        }

        if let Ok(mut guard) = self.connected.lock() {
            *guard = Some(creds.ssid.clone());
        }
        tracing::info!(ssid = %creds.ssid, "🤖 [MockBackend] Connection successful");
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.connected_ssid().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scan_reports_duplicates() {
        let backend = MockBackend::new().with_delay(Duration::ZERO);
        let raw = backend.scan().await.unwrap();
        let homes = raw.iter().filter(|n| n.ssid == "MyHomeWiFi").count();
        assert_eq!(homes, 2);
    }

    #[tokio::test]
    async fn connect_records_state() {
        let backend = MockBackend::new().with_delay(Duration::ZERO);
        assert!(!backend.is_connected().await.unwrap());

        backend.connect(&Credentials::new("CafeGuest", "")).await.unwrap();
        assert!(backend.is_connected().await.unwrap());
        assert_eq!(backend.connected_ssid().as_deref(), Some("CafeGuest"));
    }

    #[tokio::test]
    async fn connect_takes_the_ap_down() {
        let backend = MockBackend::new().with_delay(Duration::ZERO);
        let ap = crate::config::default_config().unwrap().ap;
        backend.start_ap(&ap).await.unwrap();
        assert!(backend.ap_running());

        backend.connect(&Credentials::new("CafeGuest", "")).await.unwrap();
        assert!(!backend.ap_running());
        // stopping twice is harmless
        backend.stop_ap().await.unwrap();
    }

    #[tokio::test]
    async fn designated_ssid_fails() {
        let backend = MockBackend::new().with_delay(Duration::ZERO);
        let err = backend
            .connect(&Credentials::new(MOCK_FAILING_SSID, "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!backend.is_connected().await.unwrap());
    }
}
