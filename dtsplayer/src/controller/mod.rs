//! Playback controller
//!
//! A single task owns the authenticated [`PlaybackClient`]. Commands,
//! credential updates and snapshot requests reach it through channels and
//! are handled strictly one at a time, so the client is never shared.
//!
//! ```text
//!   webhook ──Command──┐
//!   watcher ──Credential──► controller task ──► PlaybackClient
//!   persister ─snapshot─┘        │
//!                                └──► ReadinessGate
//! ```
//!
//! The task does not accept commands before it has received its first
//! credential. Callers handing over a command before that point wait.

mod command;
mod readiness;

pub use command::Command;
pub use readiness::ReadinessGate;

use crate::client::{PlaybackClient, PlaybackConnector};
use crate::credential::Credential;
use anyhow::{Result, anyhow};
use readiness::ReadinessLatch;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 32;

/// Command plus the acknowledgement sent when the task takes it
struct Envelope {
    command: Command,
    taken: oneshot::Sender<()>,
}

/// Handle to the controller task
///
/// Cheap to clone; every clone talks to the same task.
#[derive(Clone)]
pub struct Controller {
    commands: mpsc::Sender<Envelope>,
    credentials: mpsc::Sender<Credential>,
    snapshots: mpsc::Sender<oneshot::Sender<Credential>>,
    ready: ReadinessGate,
}

/// Join handle of the spawned controller task
pub struct ControllerTask {
    join_handle: JoinHandle<()>,
}

impl Controller {
    /// Spawns the controller task
    ///
    /// The task stops when `cancel` fires. It does not drain pending
    /// commands: callers still waiting after that point never return.
    pub fn spawn<C>(connector: C, cancel: CancellationToken) -> (Self, ControllerTask)
    where
        C: PlaybackConnector,
    {
        let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (credentials_tx, credentials_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (snapshots_tx, snapshots_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (latch, ready) = readiness::readiness();

        let actor = Actor {
            connector,
            latch,
            commands: commands_rx,
            credentials: credentials_rx,
            snapshots: snapshots_rx,
        };
        let join_handle = tokio::spawn(actor.run(cancel));

        (
            Self {
                commands: commands_tx,
                credentials: credentials_tx,
                snapshots: snapshots_tx,
                ready,
            },
            ControllerTask { join_handle },
        )
    }

    pub fn readiness(&self) -> ReadinessGate {
        self.ready.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }

    pub async fn play(&self) {
        self.dispatch(Command::Play).await
    }

    pub async fn pause(&self) {
        self.dispatch(Command::Pause).await
    }

    pub async fn toggle(&self) {
        self.dispatch(Command::Toggle).await
    }

    pub async fn next(&self) {
        self.dispatch(Command::Next).await
    }

    pub async fn previous(&self) {
        self.dispatch(Command::Previous).await
    }

    pub async fn play_item(&self, item_id: impl Into<String>) {
        self.dispatch(Command::PlayItem(item_id.into())).await
    }

    pub async fn play_collection(&self, collection_id: impl Into<String>) {
        self.dispatch(Command::PlayCollection(collection_id.into()))
            .await
    }

    /// Hands a command to the task and returns once the task has taken it
    ///
    /// The outcome of the remote call is not reported back.
    pub async fn dispatch(&self, command: Command) {
        let (taken, taken_rx) = oneshot::channel();
        let envelope = Envelope { command, taken };

        if self.commands.send(envelope).await.is_err() || taken_rx.await.is_err() {
            debug!("Controller stopped, command will never be taken");
            std::future::pending::<()>().await;
        }
    }

    /// Replaces the credential the client is bound to
    ///
    /// Commands taken after this credential use a client built from it.
    pub async fn push_credential(&self, credential: Credential) {
        if self.credentials.send(credential).await.is_err() {
            warn!("Controller stopped, credential update dropped");
        }
    }

    /// Credential currently in use by the client
    ///
    /// Waits until the first credential has been installed.
    pub async fn current_credential(&self) -> Credential {
        let (reply, reply_rx) = oneshot::channel();
        if self.snapshots.send(reply).await.is_err() {
            std::future::pending::<()>().await;
        }
        match reply_rx.await {
            Ok(credential) => credential,
            Err(_) => std::future::pending().await,
        }
    }
}

impl ControllerTask {
    pub async fn wait(self) -> Result<()> {
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Controller task cancelled: {err}");
                return Ok(());
            }
            return Err(anyhow!("Controller join error: {}", err));
        }
        Ok(())
    }
}

struct Actor<C: PlaybackConnector> {
    connector: C,
    latch: ReadinessLatch,
    commands: mpsc::Receiver<Envelope>,
    credentials: mpsc::Receiver<Credential>,
    snapshots: mpsc::Receiver<oneshot::Sender<Credential>>,
}

impl<C: PlaybackConnector> Actor<C> {
    async fn run(mut self, cancel: CancellationToken) {
        info!("Waiting for a Spotify token");

        let first = tokio::select! {
            _ = cancel.cancelled() => None,
            credential = self.credentials.recv() => credential,
        };
        let Some(first) = first else {
            info!("Controller stopped before receiving a token");
            return;
        };

        let mut client = self.connector.connect(first);
        if self.latch.open() {
            info!("Spotify client ready");
        }

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(credential) = self.credentials.recv() => {
                    debug!("Rebinding Spotify client, token valid until {}", credential.expiry());
                    client = self.connector.connect(credential);
                }

                Some(reply) = self.snapshots.recv() => {
                    let credential = client.credential().await;
                    // Le demandeur a pu abandonner entre-temps
                    let _ = reply.send(credential);
                }

                Some(envelope) = self.commands.recv() => {
                    if envelope.taken.send(()).is_err() {
                        debug!(command = %envelope.command, "Caller gone, skipping command");
                        continue;
                    }
                    execute(&mut client, envelope.command).await;
                }

                else => break,
            }
        }

        info!("Controller stopped");
    }
}

async fn execute<P: PlaybackClient + ?Sized>(client: &mut P, command: Command) {
    debug!(command = %command, "Executing");

    let result = match &command {
        Command::Play => client.play().await,
        Command::Pause => client.pause().await,
        // Lecture puis action : l'état peut changer entre les deux appels
        Command::Toggle => match client.player_state().await {
            Ok(state) if state.is_playing => client.pause().await,
            Ok(_) => client.play().await,
            Err(e) => Err(e),
        },
        Command::Next => client.next().await,
        Command::Previous => client.previous().await,
        Command::PlayItem(id) => client.play_item(id).await,
        Command::PlayCollection(id) => client.play_collection(id).await,
    };

    if let Err(e) = result {
        warn!(command = %command, "Spotify command failed: {}", e);
    }
}
