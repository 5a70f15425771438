//! Sensor events received on the webhook and their translation to commands
//!
//! Only the labels matter for playback: `spotify_action` names the command,
//! `spotify_song` / `spotify_playlist` carry its payload.

use anyhow::{Result, anyhow};
use dtsplayer::{Command, Controller};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPresent {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub value: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default)]
    pub object_present: Option<ObjectPresent>,
    #[serde(default)]
    pub temperature: Option<Temperature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub target_name: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default)]
    pub spotify_action: Option<String>,
    #[serde(default)]
    pub spotify_song: Option<String>,
    #[serde(default)]
    pub spotify_playlist: Option<String>,
}

/// Event pushed by the sensor cloud to `/dtconn`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DtEvent {
    #[serde(default)]
    pub event: EventBody,
    #[serde(default)]
    pub labels: Labels,
}

impl DtEvent {
    /// Command requested by the event's labels, if any
    ///
    /// Unknown actions, and payload actions without their payload, yield
    /// no command.
    pub fn command(&self) -> Option<Command> {
        let labels = &self.labels;
        let command = match labels.spotify_action.as_deref()?.trim() {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "toggle" => Command::Toggle,
            "next_song" => Command::Next,
            "prev_song" => Command::Previous,
            "play_song" => Command::PlayItem(non_empty(&labels.spotify_song)?),
            "play_playlist" => Command::PlayCollection(non_empty(&labels.spotify_playlist)?),
            _ => return None,
        };
        Some(command)
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Forwards webhook events to the controller
pub struct EventRelay {
    controller: Controller,
    events: mpsc::Receiver<DtEvent>,
    ready_timeout: Duration,
}

impl EventRelay {
    pub fn new(
        controller: Controller,
        events: mpsc::Receiver<DtEvent>,
        ready_timeout: Duration,
    ) -> Self {
        Self {
            controller,
            events,
            ready_timeout,
        }
    }

    /// Waits for the controller to be ready, then relays events until
    /// `cancel` fires or the webhook side goes away
    ///
    /// Fails when the controller is not ready within the timeout.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let ready = self.controller.readiness();
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = timeout(self.ready_timeout, ready.wait()) => {
                if result.is_err() {
                    return Err(anyhow!(
                        "Spotify is not ready after {} seconds",
                        self.ready_timeout.as_secs()
                    ));
                }
            }
        }
        info!("Application is ready for events");

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let Some(command) = event.command() else {
                debug!(event_id = %event.event.event_id, "Event without Spotify action");
                continue;
            };

            info!(
                event_id = %event.event.event_id,
                target = %event.event.target_name,
                command = %command,
                "Processing event"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.controller.dispatch(command) => {}
            }
        }

        warn!("Event relay stopped");
        Ok(())
    }
}
