use std::future::pending;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::channel::oneshot;
use futures::{FutureExt, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::spawn;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;

use crate::device::constants::{GENERIC_DISCOVERY_ERROR, GENERIC_PERMISSION_ERROR, SESSION_COMMAND_CAPACITY, SOURCE_CLOSED_ERROR};
use crate::device::permission::{PermissionGate, PermissionOutcome};
use crate::device::source::{DiscoverySource, SightingStream};
use crate::device::types::SightingEvent;
use crate::error::readable_panic_error;
use crate::scan::registry::DeviceRegistry;
use crate::scan::types::{SessionConfig, SessionState, StartOutcome};

enum SessionCommand {
    Initialize(oneshot::Sender<bool>),
    Start(oneshot::Sender<StartOutcome>),
    Stop(oneshot::Sender<()>),
}

/// Handle to the scan session task.
///
/// The task owns the registry, the discovery source, the open sighting stream and the window
/// timer; every state change happens on it. Consumers read the published [`SessionState`]
/// without ever waiting on the task.
#[derive(Clone)]
pub struct ScanSession {
    commands: Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    // liveness flag, cancelled by shutdown()
    cancel: CancellationToken,
    // cancelled when the task has torn down and exited
    stopped: CancellationToken,
}

impl ScanSession {
    pub fn spawn(
        config: SessionConfig,
        gate: Box<dyn PermissionGate>,
        source: Box<dyn DiscoverySource>,
    ) -> (ScanSession, JoinHandle<()>) {
        let (command_sender, command_receiver) = channel::<SessionCommand>(SESSION_COMMAND_CAPACITY);
        let (state_sender, state_receiver) = watch::channel(SessionState::default());
        let cancel = CancellationToken::new();
        let stopped = CancellationToken::new();

        let task = SessionTask {
            config,
            gate,
            source,
            registry: DeviceRegistry::new(),
            state: state_sender,
            cancel: cancel.clone(),
            stopped: stopped.clone(),
            active: false,
            last_error: None,
            permission_granted: None,
            session: 0,
            sightings: None,
            deadline: None,
        };
        let handle = spawn(task.run(command_receiver));

        let session = ScanSession {
            commands: command_sender,
            state: state_receiver,
            cancel,
            stopped,
        };
        (session, handle)
    }

    /// Requests permission once, as done at process start. Returns whether it was granted.
    pub async fn initialize(&self) -> bool {
        self.request(SessionCommand::Initialize).await.unwrap_or(false)
    }

    /// Starts a session unless one is already active. Never fails; the outcome says what happened.
    pub async fn start(&self) -> StartOutcome {
        if self.cancel.is_cancelled() {
            return StartOutcome::ShutDown;
        }
        self.request(SessionCommand::Start).await.unwrap_or(StartOutcome::ShutDown)
    }

    /// Ends the current session early, without an error. No-op while idle.
    pub async fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.request(SessionCommand::Stop).await;
    }

    /// Tears the session down for good. Every caller, including concurrent and later ones,
    /// returns only once the timer is disarmed and the discovery source has been asked to stop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.stopped.cancelled().await;
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> Option<T> {
        let (reply, response) = oneshot::channel();
        let mut commands = self.commands.clone();

        if commands.send(command(reply)).await.is_err() {
            return None;
        }
        response.await.ok()
    }
}

struct SessionTask {
    config: SessionConfig,
    gate: Box<dyn PermissionGate>,
    source: Box<dyn DiscoverySource>,
    registry: DeviceRegistry,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    stopped: CancellationToken,
    active: bool,
    last_error: Option<String>,
    permission_granted: Option<bool>,
    session: u64,
    // both are Some exactly while a session is active
    sightings: Option<SightingStream>,
    deadline: Option<Pin<Box<Sleep>>>,
}

async fn next_sighting(sightings: &mut Option<SightingStream>) -> Option<SightingEvent> {
    match sightings {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn wait_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.await,
        None => pending().await,
    }
}

impl SessionTask {
    async fn run(mut self, mut commands: Receiver<SessionCommand>) {
        let cancel = self.cancel.clone();
        // also fires if the task panics
        let _stopped = self.stopped.clone().drop_guard();

        'mainloop: loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.teardown().await;
                    break 'mainloop;
                },
                command = commands.next() => match command {
                    Some(SessionCommand::Initialize(reply)) => {
                        let granted = self.check_permission().await;
                        let _ = reply.send(granted);
                    },
                    Some(SessionCommand::Start(reply)) => {
                        let outcome = self.start().await;
                        let _ = reply.send(outcome);
                    },
                    Some(SessionCommand::Stop(reply)) => {
                        self.finish(None).await;
                        let _ = reply.send(());
                    },
                    None => {
                        // every handle has been dropped
                        self.teardown().await;
                        break 'mainloop;
                    },
                },
                () = wait_deadline(&mut self.deadline) => {
                    if self.is_alive() {
                        info!("Scan session {} window elapsed", self.session);
                        self.finish(None).await;
                    }
                },
                event = next_sighting(&mut self.sightings) => {
                    self.on_event(event).await;
                },
            }
        }

        debug!("Scan session task stopped");
    }

    fn is_alive(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    fn publish(&self) {
        self.state.send_replace(SessionState {
            active: self.active,
            devices: self.registry.snapshot(),
            last_error: self.last_error.clone(),
            session: self.session,
            permission_granted: self.permission_granted,
        });
    }

    async fn check_permission(&mut self) -> bool {
        let request = AssertUnwindSafe(self.gate.request(&self.config.capabilities))
            .catch_unwind()
            .await;

        let outcome = match request {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!("Permission request failed: {}", readable_panic_error(&panic));
                PermissionOutcome::Denied { cause: GENERIC_PERMISSION_ERROR.to_string() }
            },
        };

        match outcome {
            PermissionOutcome::Granted => {
                self.permission_granted = Some(true);
            },
            PermissionOutcome::Denied { cause } => {
                warn!("Scanning is not permitted: {}", cause);
                self.permission_granted = Some(false);
                self.last_error = Some(cause);
            },
        }

        self.publish();
        self.permission_granted == Some(true)
    }

    async fn start(&mut self) -> StartOutcome {
        if !self.is_alive() {
            return StartOutcome::ShutDown;
        }

        if self.active {
            debug!("Scan session {} is still active, ignoring start", self.session);
            return StartOutcome::AlreadyActive;
        }

        if self.config.recheck_permission || self.permission_granted.is_none() {
            if !self.check_permission().await {
                return StartOutcome::PermissionDenied;
            }
        } else if self.permission_granted != Some(true) {
            return StartOutcome::PermissionDenied;
        }

        // reset before the source is opened, so that nothing from a previous session lands in the new list
        self.session += 1;
        self.active = true;
        self.last_error = None;
        self.registry.reset();
        self.publish();

        info!("Starting scan session {}", self.session);
        let begin = AssertUnwindSafe(self.source.begin(&self.config.filter))
            .catch_unwind()
            .await;

        let result = match begin {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => {
                warn!("Starting discovery failed {:?}", err);
                Err(err.to_string())
            },
            Err(panic) => {
                error!("Starting discovery failed: {}", readable_panic_error(&panic));
                Err(GENERIC_DISCOVERY_ERROR.to_string())
            },
        };

        match result {
            Ok(stream) => {
                self.sightings = Some(stream);
                self.deadline = Some(Box::pin(sleep(self.config.window)));
                StartOutcome::Started
            },
            Err(reason) => {
                // nothing was opened, so there is nothing to stop
                self.active = false;
                self.last_error = Some(reason);
                self.publish();
                StartOutcome::BeginFailed
            },
        }
    }

    async fn on_event(&mut self, event: Option<SightingEvent>) {
        if !self.is_alive() {
            debug!("Ignoring discovery event after shutdown");
            return;
        }

        match event {
            Some(SightingEvent::Sighted(peripheral)) => {
                let id = peripheral.id.clone();
                if self.registry.add(peripheral) {
                    debug!("Discovered peripheral {} ({} so far)", id, self.registry.len());
                    self.publish();
                }
            },
            Some(SightingEvent::Failure(reason)) => {
                warn!("Scan session {} failed: {}", self.session, reason);
                self.finish(Some(reason)).await;
            },
            None => {
                warn!("Scan session {} failed: discovery stream ended", self.session);
                self.finish(Some(SOURCE_CLOSED_ERROR.to_string())).await;
            },
        }
    }

    /// Moves back to idle. Safe to call repeatedly; only the first call while active does anything.
    async fn finish(&mut self, error: Option<String>) {
        if !self.active {
            return;
        }

        // drop the stream first: nothing sent after this point is looked at
        self.sightings = None;
        self.deadline = None;
        self.stop_source().await;

        self.active = false;
        if error.is_some() {
            self.last_error = error;
        }
        info!("Scan session {} ended with {} peripheral(s)", self.session, self.registry.len());
        self.publish();
    }

    async fn stop_source(&mut self) {
        let stop = AssertUnwindSafe(self.source.stop()).catch_unwind();

        tokio::select! {
            _ = sleep(self.config.stop_deadline) => {
                warn!("Stopping discovery took too long");
            }
            result = stop => match result {
                Ok(Ok(())) => {},
                Ok(Err(err)) => warn!("Failed to stop discovery: {:?}", err),
                Err(panic) => error!("Failed to stop discovery: {}", readable_panic_error(&panic)),
            }
        };
    }

    async fn teardown(&mut self) {
        if self.active {
            info!("Shutting down while scan session {} is active", self.session);
        }
        self.finish(None).await;
    }
}
