use std::fmt;
use async_trait::async_trait;
use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use log::{info, warn};

use crate::error::PermissionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

impl Platform {
    pub fn current() -> Platform {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Desktop
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    AndroidFineLocation,
    AndroidBluetoothScan,
    AndroidBluetoothConnect,
    IosBluetooth,
    IosLocationWhenInUse,
    DesktopBluetooth,
}

impl Capability {
    pub fn required_for(platform: Platform) -> Vec<Capability> {
        match platform {
            Platform::Android => vec![
                Capability::AndroidFineLocation,
                Capability::AndroidBluetoothScan,
                Capability::AndroidBluetoothConnect,
            ],
            Platform::Ios => vec![
                Capability::IosBluetooth,
                Capability::IosLocationWhenInUse,
            ],
            Platform::Desktop => vec![Capability::DesktopBluetooth],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            Capability::AndroidFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Capability::AndroidBluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Capability::AndroidBluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Capability::IosBluetooth => "ios.permission.BLUETOOTH",
            Capability::IosLocationWhenInUse => "ios.permission.LOCATION_WHEN_IN_USE",
            Capability::DesktopBluetooth => "bluetooth",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied { cause: String },
}

impl PermissionOutcome {
    /// Combines the per-capability answers of the platform; a single refusal denies the whole set.
    pub fn from_statuses(statuses: &[(Capability, bool)]) -> PermissionOutcome {
        let denied: Vec<String> = statuses
            .iter()
            .filter(|(_, granted)| !granted)
            .map(|(capability, _)| capability.to_string())
            .collect();

        if denied.is_empty() {
            PermissionOutcome::Granted
        } else {
            PermissionOutcome::Denied {
                cause: format!("Permission denied: {}", denied.join(", ")),
            }
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionOutcome::Granted)
    }
}

/// Asks the platform for the capabilities needed before scanning.
///
/// Never fails: refusals and transport problems both come back as `Denied` with a readable cause,
/// and the caller decides whether to proceed.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, capabilities: &[Capability]) -> PermissionOutcome;
}

/// Answers every request the same way. Useful on platforms without a permission prompt.
#[derive(Debug, Clone)]
pub struct StaticPermissionGate {
    outcome: PermissionOutcome,
}

impl StaticPermissionGate {
    pub fn granted() -> Self {
        StaticPermissionGate { outcome: PermissionOutcome::Granted }
    }

    pub fn denied(cause: impl Into<String>) -> Self {
        StaticPermissionGate { outcome: PermissionOutcome::Denied { cause: cause.into() } }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    async fn request(&self, _capabilities: &[Capability]) -> PermissionOutcome {
        self.outcome.clone()
    }
}

/// Desktop bluetooth stacks have no explicit request API; access is checked by enumerating adapters,
/// which fails with `PermissionDenied` when the OS refuses (macOS prompts the user at this point).
/// The manager is the one the discovery source scans with.
#[derive(Debug, Clone)]
pub struct BtlePermissionGate {
    manager: Manager,
}

impl BtlePermissionGate {
    pub fn new(manager: Manager) -> Self {
        BtlePermissionGate { manager }
    }

    async fn adapter_count(&self) -> Result<usize, PermissionError> {
        let adapters = self.manager.adapters().await?;
        Ok(adapters.len())
    }
}

#[async_trait]
impl PermissionGate for BtlePermissionGate {
    async fn request(&self, capabilities: &[Capability]) -> PermissionOutcome {
        match self.adapter_count().await {
            Ok(0) => {
                warn!("No bluetooth adapters found");
                PermissionOutcome::Denied { cause: "No bluetooth adapter available".to_string() }
            },
            Ok(count) => {
                info!("Bluetooth access granted ({} adapter(s))", count);
                PermissionOutcome::Granted
            },
            Err(PermissionError::Btle { source: btleplug::Error::PermissionDenied }) => {
                warn!("Bluetooth access was refused");
                let mut statuses: Vec<(Capability, bool)> = capabilities.iter().map(|c| (*c, false)).collect();
                if statuses.is_empty() {
                    statuses.push((Capability::DesktopBluetooth, false));
                }
                PermissionOutcome::from_statuses(&statuses)
            },
            Err(err) => {
                warn!("Requesting bluetooth access failed {:?}", err);
                PermissionOutcome::Denied { cause: err.to_string() }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platforms_require_their_own_capabilities() {
        assert_eq!(Capability::required_for(Platform::Android).len(), 3);
        assert_eq!(
            Capability::required_for(Platform::Ios),
            vec![Capability::IosBluetooth, Capability::IosLocationWhenInUse],
        );
        assert_eq!(Capability::required_for(Platform::Desktop), vec![Capability::DesktopBluetooth]);
    }

    #[test]
    fn one_refusal_denies_the_set() {
        let outcome = PermissionOutcome::from_statuses(&[
            (Capability::AndroidFineLocation, true),
            (Capability::AndroidBluetoothScan, false),
            (Capability::AndroidBluetoothConnect, true),
        ]);

        assert_eq!(
            outcome,
            PermissionOutcome::Denied {
                cause: "Permission denied: android.permission.BLUETOOTH_SCAN".to_string(),
            },
        );
        assert!(!outcome.is_granted());
    }

    #[test]
    fn all_granted_is_granted() {
        let outcome = PermissionOutcome::from_statuses(&[
            (Capability::IosBluetooth, true),
            (Capability::IosLocationWhenInUse, true),
        ]);
        assert!(outcome.is_granted());
    }

    #[tokio::test]
    async fn static_gate_repeats_its_answer() {
        let gate = StaticPermissionGate::denied("radio off");
        let outcome = gate.request(&[Capability::DesktopBluetooth]).await;
        assert_eq!(outcome, PermissionOutcome::Denied { cause: "radio off".to_string() });
        assert!(StaticPermissionGate::granted().request(&[]).await.is_granted());
    }
}
