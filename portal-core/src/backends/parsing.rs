use crate::networks::{Encryption, NetworkRecord, SIGNAL_FLOOR_DBM};

/// 将 wpa_supplicant 输出中的 `\xHH` 转义序列反转义回原始字节。
/// 主要用于处理扫描结果中 SSID 字段中的汉字等非 ASCII 字符。
pub fn unescape_wpa_ssid(s: &str) -> Vec<u8> {
    fn hex_val(b: u8) -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(10 + b - b'a'),
            b'A'..=b'F' => Some(10 + b - b'A'),
            _ => None,
        }
    }

    let bs = s.as_bytes();
    let mut out = Vec::with_capacity(bs.len());
    let mut i = 0;
    while i < bs.len() {
        if bs[i] != b'\\' || i + 1 >= bs.len() {
            out.push(bs[i]);
            i += 1;
            continue;
        }
        match bs[i + 1] {
            b'x' | b'X' if i + 3 < bs.len() => {
                if let (Some(hi), Some(lo)) = (hex_val(bs[i + 2]), hex_val(bs[i + 3])) {
                    out.push((hi << 4) | lo);
                    i += 4;
                } else {
                    // 格式不正确，按字面量保留反斜杠
                    out.push(b'\\');
                    i += 1;
                }
            }
            b'\\' => {
                out.push(b'\\');
                i += 2;
            }
            b'"' => {
                out.push(b'"');
                i += 2;
            }
            _ => {
                out.push(b'\\');
                i += 1;
            }
        }
    }
    out
}

/// Parse `wpa_cli scan_results` output.
/// 格式: bssid / frequency / signal level / flags / ssid
///
/// Readings are kept in dBm; an unparseable level becomes the floor reading.
/// Hidden networks (empty or NUL SSID) are skipped.
pub fn parse_scan_results(output: &str) -> Vec<NetworkRecord> {
    let mut networks = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.splitn(5, '\t').collect();
        if parts.len() < 5 {
            continue;
        }

        let rssi: i32 = parts[2].trim().parse().unwrap_or(SIGNAL_FLOOR_DBM);
        let flags = parts[3];

        let ssid_bytes = unescape_wpa_ssid(parts[4]);
        if ssid_bytes.is_empty() || ssid_bytes.iter().all(|&b| b == 0) {
            continue;
        }
        let ssid = String::from_utf8_lossy(&ssid_bytes).into_owned();

        let encryption = if flags.contains("WPA") || flags.contains("WEP") || flags.contains("SAE") {
            Encryption::Secured
        } else {
            Encryption::Open
        };

        networks.push(NetworkRecord { ssid, rssi, encryption });
    }
    networks
}

/// Extract `key=value` from `wpa_cli status` output.
pub fn status_field<'a>(status: &'a str, key: &str) -> Option<&'a str> {
    status
        .lines()
        .find_map(|line| line.strip_prefix(key)?.strip_prefix('='))
}
