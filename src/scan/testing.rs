use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;

use crate::device::permission::{Capability, PermissionGate, PermissionOutcome};
use crate::device::source::{DiscoverySource, SightingStream};
use crate::device::types::{DiscoveryFilter, Peripheral, PeripheralId, SightingEvent};
use crate::error::DiscoveryError;

pub fn peripheral(id: &str) -> Peripheral {
    Peripheral {
        id: PeripheralId::from(id),
        display_name: Some(format!("device {}", id)),
        signal_strength: -50,
    }
}

pub fn ids(devices: &[Peripheral]) -> Vec<&str> {
    devices.iter().map(|p| p.id.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginBehavior {
    Open,
    Fail,
    Panic,
}

#[derive(Default)]
struct FakeSourceShared {
    begin_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    injector: Mutex<Option<UnboundedSender<SightingEvent>>>,
}

/// Scripted discovery source; the paired [`FakeSourceHandle`] injects events and counts calls.
pub struct FakeDiscoverySource {
    shared: Arc<FakeSourceShared>,
    behavior: BeginBehavior,
    hang_on_stop: bool,
}

#[derive(Clone)]
pub struct FakeSourceHandle {
    shared: Arc<FakeSourceShared>,
}

impl FakeDiscoverySource {
    pub fn new(behavior: BeginBehavior) -> (FakeDiscoverySource, FakeSourceHandle) {
        let shared = Arc::new(FakeSourceShared::default());
        let source = FakeDiscoverySource { shared: shared.clone(), behavior, hang_on_stop: false };
        (source, FakeSourceHandle { shared })
    }

    /// Makes `stop()` never return, like a transport that wedges during teardown.
    pub fn hanging_on_stop(mut self) -> Self {
        self.hang_on_stop = true;
        self
    }
}

impl FakeSourceHandle {
    pub fn begin_calls(&self) -> usize {
        self.shared.begin_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.shared.stop_calls.load(Ordering::SeqCst)
    }

    /// Ends the open stream without a failure event, like a transport that silently goes away.
    pub fn close(&self) {
        self.shared.injector.lock().expect("Failed to lock injector").take();
    }

    /// Returns `false` when no stream is open (or its consumer is gone).
    pub fn inject(&self, event: SightingEvent) -> bool {
        let injector = self.shared.injector.lock().expect("Failed to lock injector");
        match injector.as_ref() {
            Some(sender) => sender.unbounded_send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl DiscoverySource for FakeDiscoverySource {
    async fn begin(&mut self, _filter: &DiscoveryFilter) -> Result<SightingStream, DiscoveryError> {
        self.shared.begin_calls.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            BeginBehavior::Fail => Err(DiscoveryError::NoAdapter { index: 0 }),
            BeginBehavior::Panic => panic!("radio driver crashed"),
            BeginBehavior::Open => {
                let (sender, receiver) = unbounded();
                *self.shared.injector.lock().expect("Failed to lock injector") = Some(sender);
                Ok(receiver.boxed())
            },
        }
    }

    async fn stop(&mut self) -> Result<(), DiscoveryError> {
        self.shared.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_stop {
            pending::<()>().await;
        }
        Ok(())
    }
}

/// Permission gate whose answer can be flipped while the session runs.
#[derive(Clone)]
pub struct FakePermissionGate {
    granted: Arc<AtomicBool>,
    panicking: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl FakePermissionGate {
    pub fn new(granted: bool) -> Self {
        FakePermissionGate {
            granted: Arc::new(AtomicBool::new(granted)),
            panicking: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for FakePermissionGate {
    async fn request(&self, capabilities: &[Capability]) -> PermissionOutcome {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.panicking.load(Ordering::SeqCst) {
            panic!("permission service crashed");
        }
        let granted = self.granted.load(Ordering::SeqCst);
        let statuses: Vec<(Capability, bool)> = capabilities.iter().map(|c| (*c, granted)).collect();
        PermissionOutcome::from_statuses(&statuses)
    }
}
