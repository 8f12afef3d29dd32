// 后端：通过 wpa_cli 控制 wpa_supplicant，hostapd + dnsmasq 提供配网热点

use super::parsing::{parse_scan_results, status_field};
use crate::config::{ApConfig, BackendConfig};
use crate::credentials::Credentials;
use crate::networks::NetworkRecord;
use crate::traits::WifiBackend;
use crate::{Error, Result};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// Processes and address owned by a running access point.
#[derive(Debug)]
struct RunningAp {
    gateway_cidr: String,
    hostapd: Child,
    dnsmasq: Child,
}

#[derive(Debug)]
pub struct WpaCliBackend {
    cfg: BackendConfig,
    program: PathBuf,
    ap: Mutex<Option<RunningAp>>,
}

impl WpaCliBackend {
    pub fn new(cfg: BackendConfig) -> Self {
        Self {
            cfg,
            program: PathBuf::from("wpa_cli"),
            ap: Mutex::new(None),
        }
    }

    /// Use another `wpa_cli` executable than the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Run `wpa_cli -i <iface> <args..>` and return stdout.
    async fn wpa_cli(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-i")
            .arg(&self.cfg.interface_name)
            .args(args)
            .output()
            .await?;

        let stdout = String::from_utf8(output.stdout)?;
        // wpa_cli 出错时也可能返回 0，但会输出 FAIL
        if !output.status.success() || stdout.trim() == "FAIL" {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!(
                "wpa_cli {} failed: {}{}",
                args.first().copied().unwrap_or_default(),
                stdout.trim(),
                stderr.trim()
            )));
        }
        Ok(stdout)
    }

    async fn remove_network(&self, id: &str) {
        if let Err(e) = self.wpa_cli(&["remove_network", id]).await {
            tracing::warn!("Failed to remove network {}: {}", id, e);
        }
    }

    /// `ip addr <op> <cidr> dev <iface>`; stderr containing `tolerated` is not an error.
    async fn ip_addr(&self, op: &str, cidr: &str, tolerated: &str) -> Result<()> {
        let output = Command::new("ip")
            .args(["addr", op, cidr, "dev", self.cfg.interface_name.as_str()])
            .output()
            .await?;
        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            if !error_msg.contains(tolerated) {
                return Err(Error::CommandFailed(format!(
                    "ip addr {} {} failed: {}",
                    op,
                    cidr,
                    error_msg.trim()
                )));
            }
        }
        Ok(())
    }

    /// Configure the network once it has been added; `id` is removed by the caller on error.
    async fn join(&self, id: &str, creds: &Credentials) -> Result<()> {
        let ssid_arg = format!("\"{}\"", creds.ssid);
        self.wpa_cli(&["set_network", id, "ssid", &ssid_arg]).await?;

        if creds.is_open() {
            self.wpa_cli(&["set_network", id, "key_mgmt", "NONE"]).await?;
        } else {
            let psk_arg = format!("\"{}\"", creds.password);
            self.wpa_cli(&["set_network", id, "psk", &psk_arg]).await?;
        }
        self.wpa_cli(&["enable_network", id]).await?;

        tracing::info!("📡 Waiting for connection result...");
        for _ in 0..self.cfg.connect_attempts {
            let status = self.wpa_cli(&["status"]).await?;
            if status_field(&status, "wpa_state") == Some("COMPLETED") {
                self.wpa_cli(&["save_config"]).await?;
                return Ok(());
            }
            if status.contains("reason=WRONG_KEY") {
                return Err(Error::CommandFailed("Invalid password".into()));
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        tracing::warn!(ssid = %creds.ssid, "Connection timed out");
        Err(Error::CommandFailed("Connection timed out".into()))
    }
}

/// hostapd config for a WPA2-PSK access point on `iface`.
pub fn hostapd_conf(iface: &str, ap: &ApConfig) -> String {
    format!(
        "interface={iface}\n\
         driver=nl80211\n\
         ssid={ssid}\n\
         hw_mode=g\n\
         channel=6\n\
         auth_algs=1\n\
         wpa=2\n\
         wpa_passphrase={psk}\n\
         wpa_key_mgmt=WPA-PSK\n\
         rsn_pairwise=CCMP\n",
        ssid = ap.ssid,
        psk = ap.psk,
    )
}

/// dnsmasq `--dhcp-range` handing out .100 to .200 of the gateway's /24.
pub fn dhcp_range(gateway: Ipv4Addr) -> String {
    let [a, b, c, _] = gateway.octets();
    format!("{a}.{b}.{c}.100,{a}.{b}.{c}.200,12h")
}

#[async_trait]
impl WifiBackend for WpaCliBackend {
    async fn start_ap(&self, ap: &ApConfig) -> Result<()> {
        let mut running = self.ap.lock().await;
        if running.is_some() {
            tracing::debug!("AP already running");
            return Ok(());
        }

        let gateway = ap.gateway_ip()?;
        let iface = &self.cfg.interface_name;

        tokio::fs::write(&self.cfg.hostapd_conf_path, hostapd_conf(iface, ap)).await?;
        self.ip_addr("add", &ap.gateway_cidr, "File exists").await?;

        let hostapd = Command::new("hostapd")
            .arg(&self.cfg.hostapd_conf_path)
            .kill_on_drop(true)
            .spawn()?;

        // 所有域名都解析到网关，触发手机的门户检测
        let dnsmasq = match Command::new("dnsmasq")
            .arg(format!("--interface={}", iface))
            .arg(format!("--dhcp-range={}", dhcp_range(gateway)))
            .arg(format!("--address=/#/{}", gateway))
            .arg("--no-resolv")
            .arg("--no-hosts")
            .arg("--no-daemon")
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let mut hostapd = hostapd;
                let _ = hostapd.kill().await;
                return Err(e.into());
            }
        };

        tracing::info!(ssid = %ap.ssid, %gateway, "📶 Access point started");
        *running = Some(RunningAp {
            gateway_cidr: ap.gateway_cidr.clone(),
            hostapd,
            dnsmasq,
        });
        Ok(())
    }

    async fn stop_ap(&self) -> Result<()> {
        let Some(mut running) = self.ap.lock().await.take() else {
            return Ok(());
        };

        let _ = running.dnsmasq.kill().await;
        let _ = running.hostapd.kill().await;
        self.ip_addr("del", &running.gateway_cidr, "Cannot assign requested address")
            .await?;

        tracing::info!("📶 Access point stopped");
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<NetworkRecord>> {
        self.wpa_cli(&["scan"]).await?;

        // 等待一会儿以获取结果
        tokio::time::sleep(self.cfg.scan_wait).await;

        let stdout = self.wpa_cli(&["scan_results"]).await?;
        tracing::debug!("scan_results:\n{}", stdout);

        let networks = parse_scan_results(&stdout);
        tracing::info!("📡 Scan complete: {} networks found", networks.len());
        Ok(networks)
    }

    async fn connect(&self, creds: &Credentials) -> Result<()> {
        tracing::info!(ssid = %creds.ssid, "📡 Applying credentials via wpa_cli");

        // 接口从 AP 模式切回 STA 模式
        self.stop_ap().await?;

        let id_out = self.wpa_cli(&["add_network"]).await?;
        let id = id_out.trim().to_string();
        if id.parse::<u32>().is_err() {
            return Err(Error::CommandFailed(format!(
                "Failed to parse network ID from wpa_cli: {}",
                id
            )));
        }

        // 任何一步失败都要删掉刚添加的网络，不留半配置的条目
        match self.join(&id, creds).await {
            Ok(()) => {
                tracing::info!(ssid = %creds.ssid, "✅ Connection successful, config saved");
                Ok(())
            }
            Err(e) => {
                self.remove_network(&id).await;
                Err(e)
            }
        }
    }

    async fn is_connected(&self) -> Result<bool> {
        let status = self.wpa_cli(&["status"]).await?;
        let connected = status_field(&status, "wpa_state") == Some("COMPLETED")
            && status_field(&status, "ip_address").is_some();
        tracing::info!(
            state = status_field(&status, "wpa_state").unwrap_or("UNKNOWN"),
            connected,
            "🛡️ Checked network status"
        );
        Ok(connected)
    }
}
