use log::{debug, info};
use crate::definitions::{PadIndex, TagEvent, TagEventKind, BLUE, GREEN, OFF, RED};
use crate::dispatcher::{ActionDispatcher, DispatchContext};
use crate::session_state::SharedSessionState;
use crate::tag_config::TagConfigStore;
use crate::usb::portal::Portal;

/// Consumes decoded tag events and keeps the session state.
///
/// Placing a bound tag makes it current; lifting the current tag pauses what
/// it started but leaves it current, so putting it back resumes.
pub struct SessionStateMachine {
    portal: Portal,
    config: TagConfigStore,
    state: SharedSessionState,
    dispatcher: ActionDispatcher,
}

impl SessionStateMachine {
    pub fn new(portal: Portal, config: TagConfigStore, state: SharedSessionState, dispatcher: ActionDispatcher) -> Self {
        Self { portal, config, state, dispatcher }
    }

    pub fn config(&self) -> &TagConfigStore {
        &self.config
    }

    pub fn state(&self) -> &SharedSessionState {
        &self.state
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Initial pad colour: green when lights are on.
    pub async fn startup(&self) {
        let colour = if self.config.current().lights { GREEN } else { OFF };
        self.portal.switch_pad(0, colour).await;
    }

    pub async fn shutdown(&mut self) {
        self.dispatcher.stop_lightshow(self.config.current()).await;
        self.portal.switch_pad(0, OFF).await;
    }

    pub async fn handle_event(&mut self, event: TagEvent) {
        info!("Tag {}", event);
        match event.kind {
            TagEventKind::Added => self.on_added(event.pad, event.identifier).await,
            TagEventKind::Removed => self.on_removed(&event.identifier).await,
        }
    }

    async fn on_added(&mut self, pad: PadIndex, identifier: String) {
        let config = self.config.refresh();
        let Some(binding) = config.binding(&identifier) else {
            info!("Unknown tag {} on pad {}", identifier, pad);
            self.portal.switch_pad(pad, RED).await;
            return;
        };

        self.dispatcher.stop_lightshow(config).await;
        if config.lights {
            self.portal.switch_pad(pad, BLUE).await;
        }

        let reinserted = self.state.update(|session| {
            session.previous_tag = Some(session.current_tag.clone().unwrap_or_else(|| identifier.clone()));
            session.current_tag = Some(identifier);
            session.previous_tag == session.current_tag
        });
        let ctx = DispatchContext { pad, config, reinserted };
        self.dispatcher.dispatch(binding, &ctx).await;
    }

    async fn on_removed(&mut self, identifier: &str) {
        let is_current = self.state.snapshot().current_tag.as_deref() == Some(identifier);
        if !is_current {
            debug!("Ignoring removal of {}, it is not the current tag", identifier);
            return;
        }
        self.dispatcher.pause_session(self.config.current()).await;
    }
}
