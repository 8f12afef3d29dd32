use crate::networks::DedupPolicy;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use rand::Rng;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 编译进二进制的默认配置
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../configs.toml");

/// Value of `ap_psk` that asks for a fresh 8-digit password on every start.
pub const RANDOM_PSK: &str = "random";

static DEFAULT_CONFIG: Lazy<std::result::Result<AppConfig, String>> =
    Lazy::new(|| load_config_from_toml_str(DEFAULT_CONFIG_TOML).map_err(|e| e.to_string()));

/// 顶层应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ap: ApConfig,
    pub portal: PortalOptions,
    pub backend: BackendConfig,
    pub store: StoreConfig,
}

/// Access point the portal is served on.
#[derive(Debug, Clone)]
pub struct ApConfig {
    pub ssid: String,
    pub psk: String,
    /// `true` when `psk` was generated at load time.
    pub psk_generated: bool,
    pub bind_addr: SocketAddr,
    /// Address assigned to the AP interface, e.g. `192.168.4.1/24`.
    pub gateway_cidr: String,
}

impl ApConfig {
    /// Gateway address without the prefix length.
    pub fn gateway_ip(&self) -> Result<Ipv4Addr> {
        parse_gateway(&self.gateway_cidr)
    }
}

fn parse_gateway(cidr: &str) -> Result<Ipv4Addr> {
    let (ip, prefix) = cidr.split_once('/').unwrap_or((cidr, "24"));
    let prefix_ok = prefix.parse::<u8>().is_ok_and(|p| p <= 32);
    match Ipv4Addr::from_str(ip) {
        Ok(addr) if prefix_ok => Ok(addr),
        _ => Err(Error::Config(format!("invalid ap_gateway_cidr {:?}", cidr))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// 启动时始终进入配网模式
    OnStart,
    /// 仅当系统未连接 Wi-Fi 时才进入配网模式
    IfDisconnected,
}

#[derive(Debug, Clone)]
pub struct PortalOptions {
    pub restart_delay: Duration,
    pub ap_timeout: Option<Duration>,
    pub dedup: DedupPolicy,
    pub policy: StartPolicy,
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_secs(2),
            ap_timeout: Some(Duration::from_secs(15 * 60)),
            dedup: DedupPolicy::LastSeen,
            policy: StartPolicy::OnStart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Mock,
    WpaCli,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub interface_name: String,
    pub scan_wait: Duration,
    pub connect_attempts: u32,
    /// Where the generated hostapd config is written when the AP starts.
    pub hostapd_conf_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub default_ssid: Option<String>,
    pub default_password: Option<String>,
}

// ============= TOML 文件结构 =============

#[derive(Deserialize)]
struct AppConfigFile {
    ap: ApConfigToml,
    #[serde(default)]
    portal: PortalToml,
    backend: BackendToml,
    store: StoreToml,
}

#[derive(Deserialize)]
struct ApConfigToml {
    ap_ssid: String,
    ap_psk: String,
    ap_gateway_cidr: String,
    ap_bind_addr: String,
}

#[derive(Deserialize)]
#[serde(default)]
struct PortalToml {
    restart_delay_ms: u64,
    /// 0 disables the timeout
    ap_timeout_secs: u64,
    dedup: DedupPolicy,
    policy: StartPolicy,
}

impl Default for PortalToml {
    fn default() -> Self {
        let d = PortalOptions::default();
        Self {
            restart_delay_ms: d.restart_delay.as_millis() as u64,
            ap_timeout_secs: d.ap_timeout.map(|t| t.as_secs()).unwrap_or(0),
            dedup: d.dedup,
            policy: d.policy,
        }
    }
}

#[derive(Deserialize)]
struct BackendToml {
    kind: BackendKind,
    interface_name: String,
    #[serde(default = "default_scan_wait_secs")]
    scan_wait_secs: u64,
    #[serde(default = "default_connect_attempts")]
    connect_attempts: u32,
    #[serde(default = "default_hostapd_conf_path")]
    hostapd_conf_path: PathBuf,
}

fn default_scan_wait_secs() -> u64 {
    5
}

fn default_connect_attempts() -> u32 {
    30
}

fn default_hostapd_conf_path() -> PathBuf {
    PathBuf::from("/tmp/portal-hostapd.conf")
}

#[derive(Deserialize)]
struct StoreToml {
    path: PathBuf,
    default_ssid: Option<String>,
    default_password: Option<String>,
}

impl TryFrom<ApConfigToml> for ApConfig {
    type Error = Error;

    fn try_from(t: ApConfigToml) -> Result<Self> {
        let bind_addr = SocketAddr::from_str(&t.ap_bind_addr)
            .map_err(|e| Error::Config(format!("invalid ap_bind_addr {:?}: {}", t.ap_bind_addr, e)))?;

        let (psk, psk_generated) = if t.ap_psk == RANDOM_PSK {
            (generate_ap_psk(), true)
        } else if (8..=63).contains(&t.ap_psk.len()) {
            (t.ap_psk, false)
        } else {
            return Err(Error::Config(
                "ap_psk must be 8..=63 characters or \"random\"".to_string(),
            ));
        };
        parse_gateway(&t.ap_gateway_cidr)?;

        Ok(ApConfig {
            ssid: t.ap_ssid,
            psk,
            psk_generated,
            bind_addr,
            gateway_cidr: t.ap_gateway_cidr,
        })
    }
}

impl From<PortalToml> for PortalOptions {
    fn from(t: PortalToml) -> Self {
        PortalOptions {
            restart_delay: Duration::from_millis(t.restart_delay_ms),
            ap_timeout: (t.ap_timeout_secs > 0).then(|| Duration::from_secs(t.ap_timeout_secs)),
            dedup: t.dedup,
            policy: t.policy,
        }
    }
}

impl From<BackendToml> for BackendConfig {
    fn from(t: BackendToml) -> Self {
        BackendConfig {
            kind: t.kind,
            interface_name: t.interface_name,
            scan_wait: Duration::from_secs(t.scan_wait_secs),
            connect_attempts: t.connect_attempts,
            hostapd_conf_path: t.hostapd_conf_path,
        }
    }
}

/// Eight random decimal digits, like the firmware's setup AP.
pub fn generate_ap_psk() -> String {
    let mut rng = rand::rng();
    (0..8)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

// ============= 配置加载函数 =============

/// 从 TOML 字符串加载应用配置
pub fn load_config_from_toml_str(s: &str) -> Result<AppConfig> {
    let parsed: AppConfigFile = toml::from_str(s)?;

    Ok(AppConfig {
        ap: ApConfig::try_from(parsed.ap)?,
        portal: parsed.portal.into(),
        backend: parsed.backend.into(),
        store: StoreConfig {
            path: parsed.store.path,
            default_ssid: parsed.store.default_ssid,
            default_password: parsed.store.default_password,
        },
    })
}

/// Read and parse a config file from disk.
pub async fn load_config_from_path(path: &std::path::Path) -> Result<AppConfig> {
    let s = tokio::fs::read_to_string(path).await?;
    tracing::info!(path = %path.display(), "Loaded config file");
    load_config_from_toml_str(&s)
}

/// The configuration compiled into the binary.
pub fn default_config() -> Result<AppConfig> {
    DEFAULT_CONFIG.clone().map_err(Error::Config)
}
