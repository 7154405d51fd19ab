//! Discord Rich Presence over the desktop client's local IPC socket
//!
//! The socket only exists while the desktop client runs, so the connection
//! is established lazily and re-established once per call when a write
//! fails. Anything beyond that is surfaced to the polling loop, which
//! simply tries again next interval.

use crate::models::{ActivityKind, PresencePayload};
use crate::providers::PresenceSink;
use crate::Result;
use discord_rich_presence::{activity, error, DiscordIpc, DiscordIpcClient};
use tracing::debug;

pub struct DiscordPresence {
    client: DiscordIpcClient,
}

impl DiscordPresence {
    pub fn new(app_id: &str) -> Self {
        Self {
            client: DiscordIpcClient::new(app_id),
        }
    }

    fn activity_for(payload: &PresencePayload) -> activity::Activity<'_> {
        let assets = activity::Assets::new()
            .large_image(&payload.large_image)
            .large_text(&payload.large_text)
            .small_image("plex")
            .small_text("Plex");

        let kind = match payload.kind {
            ActivityKind::Watching => activity::ActivityType::Watching,
            ActivityKind::Listening => activity::ActivityType::Listening,
        };

        let mut act = activity::Activity::new()
            .activity_type(kind)
            .details(&payload.primary)
            .assets(assets);

        if let Some(secondary) = &payload.secondary {
            act = act.state(secondary);
        }
        if let Some(end) = payload.end {
            act = act.timestamps(activity::Timestamps::new().end(end));
        }
        if let Some(button) = &payload.button {
            act = act.buttons(vec![activity::Button::new(&button.label, &button.url)]);
        }

        act
    }

    /// Send an activity, reconnecting once when the socket is gone
    fn send(&mut self, act: activity::Activity<'_>) -> Result<()> {
        match self.client.set_activity(act.clone()) {
            Ok(()) => Ok(()),
            Err(error::Error::NotConnected) => {
                debug!("Discord IPC not connected yet, connecting");
                self.client.connect()?;
                self.client.set_activity(act)?;
                Ok(())
            }
            Err(error::Error::IPCConnectionFailed) | Err(error::Error::WriteError(_)) => {
                debug!("Discord IPC connection lost, reconnecting");
                self.client.reconnect()?;
                self.client.set_activity(act)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl PresenceSink for DiscordPresence {
    fn set(&mut self, payload: &PresencePayload) -> Result<()> {
        self.send(Self::activity_for(payload))
    }

    fn clear(&mut self) -> Result<()> {
        match self.client.clear_activity() {
            Ok(()) => Ok(()),
            // Nothing to clear when we never connected
            Err(error::Error::NotConnected) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        let _ = self.client.clear_activity();
        self.client.close()?;
        Ok(())
    }
}
