pub mod usb;
pub mod definitions;
pub mod player;
pub mod providers;
pub mod service;
pub mod session;
pub mod session_state;
pub mod tag_config;
pub mod dispatcher;
pub mod lightshow;
pub mod operator_command;

mod player_watch;
mod service_entry;

#[cfg(test)]
mod test_support;

pub use service_entry::run_service;
pub use player_watch::run_player_watch;
pub use player::{NoopPlayer, Player, PlayerError, PlayerInterface, PlayerStatus, PlayerStatusStream};
pub use providers::{CapabilityProvider, Providers, ProviderError};
pub use service::{spawn_service, MultiServiceHandle, ServiceHandle, StopHandle};
pub use tag_config::{ConfigError, TagConfig, TagConfigStore};
pub use usb::open_portal;
pub use usb::portal::Portal;
