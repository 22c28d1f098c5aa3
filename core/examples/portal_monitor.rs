// Lights the pad a tag lands on and logs every tag report until Ctrl+C.
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use musicfig_core::definitions::{TagEventKind, GREEN, OFF, PURPLE};
use musicfig_core::open_portal;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let portal = open_portal().await;
    if !portal.is_enabled() {
        warn!("No portal attached, nothing will be reported");
    }
    portal.switch_pad(0, GREEN).await;
    info!("Portal monitor is running. Press Ctrl+C to stop.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = portal.poll_event(Duration::from_millis(100)) => {
                let Some(event) = event else { continue };
                info!("{} on pad {}", event.identifier, event.pad);
                match event.kind {
                    TagEventKind::Added => portal.switch_pad(event.pad, PURPLE).await,
                    TagEventKind::Removed => portal.switch_pad(event.pad, OFF).await,
                }
            }
        }
    }

    portal.switch_pad(0, OFF).await;
    info!("Portal monitor stopped");
    Ok(())
}
