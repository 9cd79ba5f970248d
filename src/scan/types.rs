use std::sync::Arc;
use std::time::Duration;

use crate::device::constants::{DEFAULT_SCAN_WINDOW, DEFAULT_STOP_DEADLINE};
use crate::device::permission::{Capability, Platform};
use crate::device::types::{DiscoveryFilter, Peripheral};

/// What a consumer can observe about the scan session. Published as a whole on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub active: bool,
    pub devices: Arc<[Peripheral]>,
    pub last_error: Option<String>,
    // 0 until the first session starts
    pub session: u64,
    // None until permission has been requested
    pub permission_granted: Option<bool>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            active: false,
            devices: Arc::from(Vec::new()),
            last_error: None,
            session: 0,
            permission_granted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyActive,
    PermissionDenied,
    BeginFailed,
    ShutDown,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub window: Duration,
    pub stop_deadline: Duration,
    pub filter: DiscoveryFilter,
    pub capabilities: Vec<Capability>,
    pub recheck_permission: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            window: Duration::from_millis(DEFAULT_SCAN_WINDOW),
            stop_deadline: Duration::from_millis(DEFAULT_STOP_DEADLINE),
            filter: DiscoveryFilter::default(),
            capabilities: Capability::required_for(Platform::current()),
            recheck_permission: true,
        }
    }
}
