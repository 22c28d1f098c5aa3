use log::info;
use crate::dispatcher::ActionDispatcher;
use crate::player::Player;
use crate::player_watch;
use crate::providers::Providers;
use crate::service::{spawn_service, MultiServiceHandle, ServiceHandle};
use crate::session::SessionStateMachine;
use crate::session_state::SharedSessionState;
use crate::tag_config::TagConfigStore;
use crate::usb::portal::Portal;

fn run_control_loop(portal: Portal, mut session: SessionStateMachine) -> ServiceHandle {
    spawn_service(move |mut stop| async move {
        session.startup().await;
        info!("Waiting for tags");
        loop {
            let poll_timeout = session.config().current().timeouts.poll;
            tokio::select! {
                _ = stop.signaled() => break,
                event = portal.poll_event(poll_timeout) => {
                    if let Some(event) = event {
                        session.handle_event(event).await;
                    }
                }
            }
        }
        session.shutdown().await;
        info!("Control loop stopped");
    })
}

/// Starts the playback monitor and the tag control loop. Shutting the
/// returned handle down stops the lightshow and turns the portal off.
pub async fn run_service(
    portal: Portal,
    player: Player,
    providers: Providers,
    config: TagConfigStore,
) -> Result<MultiServiceHandle, anyhow::Error> {
    let state = SharedSessionState::new();
    let mut handles = MultiServiceHandle::with_capacity(2);

    handles.add(player_watch::run_player_watch(player.clone(), state.clone()).await?);

    let dispatcher = ActionDispatcher::new(portal.clone(), player, providers, state.clone());
    let session = SessionStateMachine::new(portal.clone(), config, state, dispatcher);
    handles.add(run_control_loop(portal, session));
    Ok(handles)
}
