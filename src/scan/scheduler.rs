use std::time::Duration;
use futures::channel::mpsc::{channel, Sender};
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::device::constants::TRIGGER_CAPACITY;
use crate::scan::session::ScanSession;
use crate::scan::types::StartOutcome;

/// Starts scan sessions on demand and on a fixed cadence.
#[derive(Clone)]
pub struct Scheduler {
    triggers: Sender<()>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn spawn(session: ScanSession, period: Duration) -> (Scheduler, JoinHandle<()>) {
        let (trigger_sender, mut trigger_receiver) = channel::<()>(TRIGGER_CAPACITY);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            'mainloop: loop {
                let outcome = tokio::select! {
                    biased;

                    _ = task_cancel.cancelled() => {
                        break 'mainloop;
                    },
                    Some(()) = trigger_receiver.next() => {
                        // the session ignores this itself if a scan is running
                        session.start().await
                    },
                    _ = ticks.tick() => {
                        if session.is_active() {
                            debug!("Scan still active, skipping periodic start");
                            continue 'mainloop;
                        }
                        session.start().await
                    },
                };

                debug!("Start attempt: {:?}", outcome);
                if outcome == StartOutcome::ShutDown {
                    info!("Scan session is shut down, stopping scheduler");
                    break 'mainloop;
                }
            }
        });

        (Scheduler { triggers: trigger_sender, cancel }, handle)
    }

    /// Manual start request. Always forwarded to the session, even while a scan is running.
    pub async fn trigger(&self) {
        let mut triggers = self.triggers.clone();
        if triggers.send(()).await.is_err() {
            debug!("Scheduler is stopped, ignoring trigger");
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::sleep;

    use super::*;
    use crate::device::permission::Capability;
    use crate::scan::testing::{BeginBehavior, FakeDiscoverySource, FakePermissionGate, FakeSourceHandle};
    use crate::scan::types::SessionConfig;

    fn spawn_session(window_ms: u64) -> (ScanSession, FakeSourceHandle) {
        let (source, handle) = FakeDiscoverySource::new(BeginBehavior::Open);
        let config = SessionConfig {
            window: Duration::from_millis(window_ms),
            capabilities: vec![Capability::DesktopBluetooth],
            ..SessionConfig::default()
        };
        let (session, _) = ScanSession::spawn(config, Box::new(FakePermissionGate::new(true)), Box::new(source));
        (session, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_tick_skips_active_session() {
        let (session, source) = spawn_session(10_000);
        let (scheduler, _) = Scheduler::spawn(session.clone(), Duration::from_millis(5000));

        scheduler.trigger().await;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(source.begin_calls(), 1);

        // the tick at 5000 ms finds the session still running
        sleep(Duration::from_millis(7000)).await;
        assert!(session.is_active());
        assert_eq!(source.begin_calls(), 1);
        assert_eq!(session.state().session, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_tick_starts_idle_session() {
        let (session, source) = spawn_session(1000);
        let (_scheduler, _) = Scheduler::spawn(session.clone(), Duration::from_millis(5000));

        sleep(Duration::from_millis(4900)).await;
        assert_eq!(source.begin_calls(), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(source.begin_calls(), 1);
        assert!(session.is_active());

        sleep(Duration::from_millis(5000)).await;
        assert_eq!(source.begin_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_while_active_is_a_no_op() {
        let (session, source) = spawn_session(10_000);
        let (scheduler, _) = Scheduler::spawn(session.clone(), Duration::from_millis(60_000));

        scheduler.trigger().await;
        scheduler.trigger().await;
        sleep(Duration::from_millis(100)).await;

        assert_eq!(source.begin_calls(), 1);
        assert_eq!(session.state().session, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let (session, source) = spawn_session(1000);
        let (scheduler, handle) = Scheduler::spawn(session.clone(), Duration::from_millis(5000));

        scheduler.shutdown();
        handle.await.expect("Failed to join scheduler");

        sleep(Duration::from_millis(20_000)).await;
        assert_eq!(source.begin_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_shutdown_stops_scheduler() {
        let (session, source) = spawn_session(1000);
        let (scheduler, handle) = Scheduler::spawn(session.clone(), Duration::from_millis(5000));

        session.shutdown().await;
        scheduler.trigger().await;
        handle.await.expect("Failed to join scheduler");
        assert_eq!(source.begin_calls(), 0);
    }
}
