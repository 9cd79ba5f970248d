use async_trait::async_trait;
use btleplug::api::{BDAddr, Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId as BtlePeripheralId};
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use uuid::Uuid;

use crate::device::source::{DiscoverySource, SightingStream};
use crate::device::types::{DiscoveryFilter, Peripheral, PeripheralId, SightingEvent};
use crate::error::DiscoveryError;

const EVENT_STREAM_CLOSED: &str = "bluetooth event stream closed";

/// Discovery over the platform bluetooth stack (BlueZ, CoreBluetooth, WinRT).
pub struct BtleDiscoverySource {
    manager: Manager,
    adapter_index: usize,
    // set while a scan is running
    adapter: Option<Adapter>,
}

impl BtleDiscoverySource {
    pub fn new(manager: Manager, adapter_index: usize) -> Self {
        BtleDiscoverySource {
            manager,
            adapter_index,
            adapter: None,
        }
    }

    async fn select_adapter(&self) -> Result<Adapter, DiscoveryError> {
        let adapters = self.manager.adapters().await?;

        adapters
            .into_iter()
            .nth(self.adapter_index)
            .ok_or(DiscoveryError::NoAdapter { index: self.adapter_index })
    }
}

// CoreBluetooth does not expose addresses (they read as 00:00:00:00:00:00), in which case the
// platform id is the only stable identity.
fn peripheral_id(id: &BtlePeripheralId, address: BDAddr) -> PeripheralId {
    if address != BDAddr::from([0u8; 6]) {
        PeripheralId::new(address.to_string())
    } else {
        PeripheralId::new(format!("{:?}", id))
    }
}

async fn sighting_from_event(adapter: &Adapter, services: &[Uuid], event: CentralEvent) -> Option<SightingEvent> {
    let id = match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
        _ => return None,
    };

    let peripheral = match adapter.peripheral(&id).await {
        Ok(peripheral) => peripheral,
        Err(err) => {
            warn!("Failed to look up peripheral {:?}: {}", id, err);
            return None;
        },
    };

    match peripheral.properties().await {
        Err(err) => {
            warn!("Could not query peripheral for properties: {:?}", err);
            None
        },
        Ok(None) => {
            debug!("Peripheral {:?} has no properties", id);
            None
        },
        Ok(Some(properties)) => {
            // Some environments ignore the filter, so make sure to check the service uuids again
            if !services.is_empty() && !properties.services.iter().any(|uuid| services.contains(uuid)) {
                return None;
            }

            // the rssi usually arrives with a later DeviceUpdated event
            let signal_strength = properties.rssi?;

            Some(SightingEvent::Sighted(Peripheral {
                id: peripheral_id(&id, properties.address),
                display_name: properties.local_name,
                signal_strength,
            }))
        },
    }
}

#[async_trait]
impl DiscoverySource for BtleDiscoverySource {
    async fn begin(&mut self, filter: &DiscoveryFilter) -> Result<SightingStream, DiscoveryError> {
        let adapter = self.select_adapter().await?;
        info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));

        // subscribe before starting, so that no discovery is missed
        let events = adapter.events().await?;
        adapter.start_scan(ScanFilter { services: filter.services.clone() }).await?;
        self.adapter = Some(adapter.clone());

        let services = filter.services.clone();
        let sightings = events
            .filter_map(move |event| {
                let adapter = adapter.clone();
                let services = services.clone();
                async move { sighting_from_event(&adapter, &services, event).await }
            })
            .chain(stream::once(async { SightingEvent::Failure(EVENT_STREAM_CLOSED.to_string()) }));

        Ok(sightings.boxed())
    }

    async fn stop(&mut self) -> Result<(), DiscoveryError> {
        if let Some(adapter) = self.adapter.take() {
            info!("Stopping scan");
            adapter.stop_scan().await?;
        }

        Ok(())
    }
}
