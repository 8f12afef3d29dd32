//! Network list normalization and signal-strength classification.
//!
//! A raw scan may report the same SSID several times (one entry per access
//! point broadcasting it). [`normalize`] collapses those into one record per
//! name and orders the result strongest first; [`signal_tier`] maps a dBm
//! reading onto the 4-bar scale the setup page draws.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Reading assigned to a record whose signal value is missing or malformed.
pub const SIGNAL_FLOOR_DBM: i32 = -100;

/// Whether the network asks for a passphrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    Open,
    #[default]
    Secured,
}

/// Wi-Fi 扫描时单个网络的具体信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub ssid: String,
    /// Received signal strength in dBm, typically negative.
    #[serde(default = "signal_floor", deserialize_with = "lenient_rssi")]
    pub rssi: i32,
    #[serde(default)]
    pub encryption: Encryption,
}

impl NetworkRecord {
    pub fn new(ssid: impl Into<String>, rssi: i32, encryption: Encryption) -> Self {
        Self {
            ssid: ssid.into(),
            rssi,
            encryption,
        }
    }

    pub fn tier(&self) -> SignalTier {
        signal_tier(self.rssi)
    }
}

/// Coarse 1..=4 classification of a signal reading, as drawn by the bar glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct SignalTier(u8);

impl SignalTier {
    pub const MIN: SignalTier = SignalTier(1);
    pub const MAX: SignalTier = SignalTier(4);

    /// Number of lit bars, in `1..=4`.
    pub fn bars(self) -> u8 {
        self.0
    }
}

impl From<SignalTier> for u8 {
    fn from(t: SignalTier) -> u8 {
        t.0
    }
}

impl TryFrom<u8> for SignalTier {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        if (1..=4).contains(&v) {
            Ok(SignalTier(v))
        } else {
            Err(format!("signal tier out of range: {v}"))
        }
    }
}

/// Classify a dBm reading. Total over `i32`; anything below -70 is tier 1.
pub fn signal_tier(rssi: i32) -> SignalTier {
    match rssi {
        r if r >= -50 => SignalTier(4),
        r if r >= -60 => SignalTier(3),
        r if r >= -70 => SignalTier(2),
        _ => SignalTier(1),
    }
}

/// How records sharing a name are collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// The entry listed last in the scan wins.
    #[default]
    LastSeen,
    /// The entry with the highest reading wins; equal readings keep the later one.
    Strongest,
}

/// A record ready for display: normalized and classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedNetwork {
    pub ssid: String,
    pub rssi: i32,
    pub encryption: Encryption,
    pub tier: SignalTier,
}

impl From<NetworkRecord> for RankedNetwork {
    fn from(n: NetworkRecord) -> Self {
        let tier = n.tier();
        Self {
            ssid: n.ssid,
            rssi: n.rssi,
            encryption: n.encryption,
            tier,
        }
    }
}

/// Deduplicate by name (last occurrence wins) and sort strongest first.
pub fn normalize<I>(records: I) -> Vec<NetworkRecord>
where
    I: IntoIterator<Item = NetworkRecord>,
{
    normalize_with(records, DedupPolicy::LastSeen)
}

/// Like [`normalize`] with an explicit duplicate-resolution policy.
///
/// Each name keeps the slot of its first occurrence, so the stable sort
/// breaks rssi ties by first-seen order.
pub fn normalize_with<I>(records: I, policy: DedupPolicy) -> Vec<NetworkRecord>
where
    I: IntoIterator<Item = NetworkRecord>,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<NetworkRecord> = Vec::new();

    for record in records {
        match slots.get(&record.ssid) {
            Some(&idx) => {
                let replace = match policy {
                    DedupPolicy::LastSeen => true,
                    DedupPolicy::Strongest => record.rssi >= unique[idx].rssi,
                };
                if replace {
                    unique[idx] = record;
                }
            }
            None => {
                slots.insert(record.ssid.clone(), unique.len());
                unique.push(record);
            }
        }
    }

    // Vec::sort_by is stable
    unique.sort_by(|a, b| b.rssi.cmp(&a.rssi));
    unique
}

/// Normalize and attach the signal tier of every record.
pub fn rank<I>(records: I, policy: DedupPolicy) -> Vec<RankedNetwork>
where
    I: IntoIterator<Item = NetworkRecord>,
{
    normalize_with(records, policy)
        .into_iter()
        .map(RankedNetwork::from)
        .collect()
}

fn signal_floor() -> i32 {
    SIGNAL_FLOOR_DBM
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReading {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

// 信号值缺失或格式错误时降级为最低档，而不是拒绝整个扫描结果
fn lenient_rssi<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawReading::deserialize(deserializer)?;
    let rssi = match raw {
        RawReading::Int(v) => i32::try_from(v).unwrap_or(SIGNAL_FLOOR_DBM),
        RawReading::Float(v) => {
            let r = v.round();
            if r.is_finite() && r >= f64::from(i32::MIN) && r <= f64::from(i32::MAX) {
                r as i32
            } else {
                SIGNAL_FLOOR_DBM
            }
        }
        RawReading::Text(s) => s.trim().parse().unwrap_or(SIGNAL_FLOOR_DBM),
        _ => SIGNAL_FLOOR_DBM,
    };
    Ok(rssi)
}
