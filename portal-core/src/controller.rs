//! State of the setup page, driven by explicit intents.
//!
//! The page never keeps a free-floating "selected network"; everything it
//! shows lives in [`PageState`], and every user action or request result is an
//! [`Intent`] fed to [`PageState::apply`]. The returned [`Effect`] tells the
//! caller which request (if any) to issue next.

use crate::credentials::Credentials;
use crate::networks::RankedNetwork;
use std::time::Duration;

/// How long a success banner stays up.
pub const STATUS_AUTO_CLEAR: Duration = Duration::from_secs(5);

/// Delay between the reboot banner and the "you can close this page" notice.
pub const RESTART_NOTICE_DELAY: Duration = Duration::from_secs(2);

const RESTART_NOTICE: &str = "Device will restart in a few seconds. You can close this page.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Success messages clear themselves unless they announce a reboot.
    pub fn auto_clear_after(&self) -> Option<Duration> {
        let sticky = self.text.contains("reboot") || self.text.contains("restart");
        (self.kind == StatusKind::Success && !sticky).then_some(STATUS_AUTO_CLEAR)
    }
}

#[derive(Debug, Clone)]
pub enum Intent {
    /// User asked for a fresh scan.
    Scan,
    ScanFinished(Result<Vec<RankedNetwork>, String>),
    /// User picked a row.
    Select(String),
    /// User submitted the form.
    Submit(Credentials),
    SubmitFinished(Result<(), String>),
    /// A `ClearStatusAfter` timer fired.
    StatusExpired(u64),
    /// A `ShowRestartNoticeAfter` timer fired.
    RestartNoticeDue(u64),
}

/// What the caller must do after an intent is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Scan,
    Submit(Credentials),
    /// Feed `Intent::StatusExpired(seq)` back after `after`.
    ClearStatusAfter { after: Duration, seq: u64 },
    /// Feed `Intent::RestartNoticeDue(seq)` back after `after`.
    ShowRestartNoticeAfter { after: Duration, seq: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct PageState {
    networks: Vec<RankedNetwork>,
    selected: Option<String>,
    status: Option<StatusMessage>,
    status_seq: u64,
    scanning: bool,
    submitting: bool,
    locked: bool,
}

/// One rendered row of the network list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRow {
    pub ssid: String,
    pub bars: u8,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub rows: Vec<NetworkRow>,
    pub status: Option<StatusMessage>,
    pub can_scan: bool,
    pub can_submit: bool,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn networks(&self) -> &[RankedNetwork] {
        &self.networks
    }

    /// Form is disabled for good after a successful submission.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn apply(&mut self, intent: Intent) -> Effect {
        match intent {
            Intent::Scan => {
                if self.scanning || self.locked {
                    return Effect::None;
                }
                self.scanning = true;
                self.networks.clear();
                self.set_status(StatusKind::Info, "Scanning for networks...");
                Effect::Scan
            }
            Intent::ScanFinished(result) => {
                self.scanning = false;
                match result {
                    Ok(list) if list.is_empty() => {
                        self.set_status(StatusKind::Error, "No networks found. Please try again.")
                    }
                    Ok(list) => {
                        let n = list.len();
                        self.networks = list;
                        let plural = if n > 1 { "s" } else { "" };
                        self.set_status(StatusKind::Success, format!("Found {n} network{plural}"))
                    }
                    Err(e) => {
                        tracing::warn!("Scan error: {}", e);
                        self.set_status(StatusKind::Error, "Failed to scan networks. Please try again.")
                    }
                }
            }
            Intent::Select(ssid) => {
                if !self.locked {
                    self.selected = Some(ssid);
                }
                Effect::None
            }
            Intent::Submit(creds) => {
                if self.submitting || self.locked {
                    return Effect::None;
                }
                match creds.validate() {
                    Ok(valid) => {
                        self.submitting = true;
                        self.selected = Some(valid.ssid.clone());
                        self.set_status(StatusKind::Info, "Connecting to network...");
                        Effect::Submit(valid)
                    }
                    Err(e) => self.set_status(StatusKind::Error, e.to_string()),
                }
            }
            Intent::SubmitFinished(result) => {
                self.submitting = false;
                match result {
                    Ok(()) => {
                        self.locked = true;
                        self.set_status(StatusKind::Success, "✓ Connected! Device is rebooting...");
                        Effect::ShowRestartNoticeAfter {
                            after: RESTART_NOTICE_DELAY,
                            seq: self.status_seq,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Connection error: {}", e);
                        self.set_status(
                            StatusKind::Error,
                            "Failed to connect. Please check credentials and try again.",
                        )
                    }
                }
            }
            Intent::StatusExpired(seq) => {
                // 旧定时器不能清掉新的消息
                if seq == self.status_seq
                    && self.status.as_ref().is_some_and(|s| s.auto_clear_after().is_some())
                {
                    self.status = None;
                }
                Effect::None
            }
            Intent::RestartNoticeDue(seq) => {
                if self.locked && seq == self.status_seq {
                    self.set_status(StatusKind::Success, RESTART_NOTICE)
                } else {
                    Effect::None
                }
            }
        }
    }

    pub fn view(&self) -> PageView {
        let rows = self
            .networks
            .iter()
            .map(|n| NetworkRow {
                ssid: n.ssid.clone(),
                bars: n.tier.bars(),
                selected: self.selected.as_deref() == Some(n.ssid.as_str()),
            })
            .collect();

        PageView {
            rows,
            status: self.status.clone(),
            can_scan: !self.scanning && !self.locked,
            can_submit: !self.submitting && !self.locked,
        }
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) -> Effect {
        let msg = StatusMessage::new(kind, text);
        self.status_seq += 1;
        let effect = match msg.auto_clear_after() {
            Some(after) => Effect::ClearStatusAfter {
                after,
                seq: self.status_seq,
            },
            None => Effect::None,
        };
        self.status = Some(msg);
        effect
    }
}
