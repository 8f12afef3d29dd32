use crate::config::ApConfig;
use crate::credentials::Credentials;
use crate::networks::NetworkRecord;
use async_trait::async_trait;
use std::borrow::Cow;

/// 前端资源提供者接口。
#[async_trait]
pub trait UiAssetProvider: Send + Sync {
    /// Retrieves a single UI asset.
    ///
    /// # Arguments
    /// * `path` - The path to the asset (e.g., "index.html", "app.js").
    ///
    /// # Returns
    /// The asset's content and its MIME type, or `Error::AssetNotFound`.
    async fn get_asset(&self, path: &str) -> crate::Result<(Cow<'static, [u8]>, String)>;
}

/// Wi-Fi 控制后端：热点、扫描、连接、查询连接状态
#[async_trait]
pub trait WifiBackend: Send + Sync {
    /// 启动配网热点（设置网关地址、hostapd、DHCP/DNS）
    async fn start_ap(&self, ap: &ApConfig) -> crate::Result<()>;

    /// Tear the access point down. A no-op when it is not running.
    async fn stop_ap(&self) -> crate::Result<()>;

    /// 执行一次实时的 Wi-Fi 扫描，返回未经去重的原始列表
    async fn scan(&self) -> crate::Result<Vec<NetworkRecord>>;

    /// Apply already-validated credentials.
    async fn connect(&self, creds: &Credentials) -> crate::Result<()>;

    /// 检查设备当前是否已连接到网络
    async fn is_connected(&self) -> crate::Result<bool>;
}
