//! The polling loop
//!
//! One `tick` per interval: fetch the active session, rebuild the payload,
//! push or clear the presence. Every branch degrades to "try again next
//! tick"; nothing here is fatal.

use crate::models::MediaSession;
use crate::presence::build_payload;
use crate::providers::{MetadataSource, PresenceSink, SessionSource};
use std::time::Duration;
use tracing::{debug, error, info};

pub struct App<S, M, P> {
    source: S,
    metadata: Option<M>,
    sink: P,
    minimal: bool,
    /// Snapshot from the previous tick; an equal snapshot skips the update
    last: Option<MediaSession>,
    /// Whether the presence is already cleared, so idle polls stay silent
    cleared: bool,
}

impl<S, M, P> App<S, M, P>
where
    S: SessionSource,
    M: MetadataSource,
    P: PresenceSink,
{
    pub fn new(source: S, metadata: Option<M>, sink: P, minimal: bool) -> Self {
        Self {
            source,
            metadata,
            sink,
            minimal,
            last: None,
            cleared: false,
        }
    }

    /// One poll: the conditional branching over session state
    pub async fn tick(&mut self) {
        match self.source.current_session().await {
            Ok(Some(session)) => {
                if self.last.as_ref() == Some(&session) {
                    debug!("Session unchanged, skipping presence update");
                    return;
                }

                debug!("Fetched active {} session", session.kind_name());
                let payload =
                    build_payload(&session, self.minimal, self.metadata.as_ref()).await;

                match self.sink.set(&payload) {
                    Ok(()) => {
                        info!("Set Discord Rich Presence to {}", payload.primary);
                        self.last = Some(session);
                        self.cleared = false;
                    }
                    Err(e) => {
                        error!("Failed to set Discord Rich Presence: {}", e);
                        self.last = None;
                    }
                }
            }
            Ok(None) => {
                self.last = None;
                if self.cleared {
                    debug!("No active media sessions for the configured users");
                } else {
                    match self.sink.clear() {
                        Ok(()) => {
                            info!("No active session, cleared Discord Rich Presence");
                            self.cleared = true;
                        }
                        Err(e) => error!("Failed to clear Discord Rich Presence: {}", e),
                    }
                }
            }
            Err(e) => error!("Failed to fetch Plex session: {}", e),
        }
    }

    /// Poll forever on a fixed interval until the task is cancelled
    pub async fn run(&mut self, interval: Duration) {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            timer.tick().await;
            self.tick().await;
        }
    }

    pub fn shutdown(&mut self) {
        if let Err(e) = self.sink.close() {
            debug!("Failed to close Discord IPC connection: {}", e);
        }
    }
}
