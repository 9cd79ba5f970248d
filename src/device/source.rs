use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::device::types::{DiscoveryFilter, SightingEvent};
use crate::error::DiscoveryError;

pub type SightingStream = BoxStream<'static, SightingEvent>;

/// The transport that performs radio-level discovery.
///
/// `begin` must not be called again while a stream is open; the scan session enforces this.
/// `stop` may be called any number of times, including when nothing is open. Once it returns,
/// the previously returned stream is abandoned by its consumer.
#[async_trait]
pub trait DiscoverySource: Send {
    async fn begin(&mut self, filter: &DiscoveryFilter) -> Result<SightingStream, DiscoveryError>;

    async fn stop(&mut self) -> Result<(), DiscoveryError>;
}
