use std::time::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{DEFAULT_SCAN_PERIOD, DEFAULT_SCAN_WINDOW, DEFAULT_STOP_DEADLINE};
use crate::device::permission::{Capability, Platform};
use crate::device::types::DiscoveryFilter;
use crate::error::ConfigError;
use crate::scan::types::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub scan_window_ms: u64,
    pub scan_period_ms: u64,
    pub stop_deadline_ms: u64,
    pub service_filter: Vec<Uuid>,
    pub adapter_index: usize,
    pub recheck_permission: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            scan_window_ms: DEFAULT_SCAN_WINDOW,
            scan_period_ms: DEFAULT_SCAN_PERIOD,
            stop_deadline_ms: DEFAULT_STOP_DEADLINE,
            service_filter: Vec::new(),
            adapter_index: 0,
            recheck_permission: true,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_window_ms == 0 {
            return Err(ConfigError::Invalid { reason: "scanWindowMs must be greater than 0".to_string() });
        }
        if self.scan_period_ms == 0 {
            return Err(ConfigError::Invalid { reason: "scanPeriodMs must be greater than 0".to_string() });
        }
        if self.stop_deadline_ms >= self.scan_window_ms {
            return Err(ConfigError::Invalid { reason: "stopDeadlineMs must be less than scanWindowMs".to_string() });
        }
        Ok(())
    }

    pub fn scan_period(&self) -> Duration {
        Duration::from_millis(self.scan_period_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            window: Duration::from_millis(self.scan_window_ms),
            stop_deadline: Duration::from_millis(self.stop_deadline_ms),
            filter: DiscoveryFilter { services: self.service_filter.clone() },
            capabilities: Capability::required_for(Platform::current()),
            recheck_permission: self.recheck_permission,
        }
    }
}
