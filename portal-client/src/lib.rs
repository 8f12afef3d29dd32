//! Terminal rendition of the setup page: the same intents and state as the
//! browser page, driven against a running portal over HTTP.

pub mod api;
pub mod render;

use api::PortalClient;
use portal_core::controller::{Effect, Intent, PageState};

/// Apply `intent` and keep feeding request results back until the page
/// settles. Each request is issued once; failures become an error status.
///
/// Status-clear timers are not run: the process prints and exits. The
/// restart notice is shown right away instead of after its delay.
pub async fn dispatch(client: &PortalClient, page: &mut PageState, intent: Intent) {
    let mut next = Some(intent);
    while let Some(intent) = next.take() {
        next = match page.apply(intent) {
            Effect::Scan => Some(Intent::ScanFinished(
                client.scan().await.map_err(|e| e.to_string()),
            )),
            Effect::Submit(creds) => Some(Intent::SubmitFinished(
                client.connect(&creds).await.map_err(|e| e.to_string()),
            )),
            Effect::ShowRestartNoticeAfter { seq, .. } => Some(Intent::RestartNoticeDue(seq)),
            Effect::ClearStatusAfter { .. } | Effect::None => None,
        };
    }
}
