use portal_core::config::{load_config_from_toml_str, AppConfig};
use std::path::Path;

/// Mock-backend config serving on an ephemeral local port.
pub fn config(store: &Path) -> AppConfig {
    let toml = format!(
        r#"
[ap]
ap_ssid = "Setup"
ap_psk = "random"
ap_gateway_cidr = "127.0.0.1/8"
ap_bind_addr = "127.0.0.1:0"

[backend]
kind = "mock"
interface_name = "wlan0"

[store]
path = "{}"
"#,
        store.display()
    );
    load_config_from_toml_str(&toml).unwrap()
}
