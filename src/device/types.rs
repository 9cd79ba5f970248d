use std::fmt;
use uuid::Uuid;

/// Stable identity of a discovered peripheral, as reported by the discovery source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        PeripheralId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(value: &str) -> Self {
        PeripheralId::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    pub id: PeripheralId,
    pub display_name: Option<String>,
    pub signal_strength: i16, // dBm
}

impl Peripheral {
    pub fn display_name_or_unknown(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SightingEvent {
    Sighted(Peripheral),
    // terminates the stream
    Failure(String),
}

/// Restricts discovery to peripherals advertising one of `services`. Empty means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryFilter {
    pub services: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_peripherals_render_as_unknown() {
        let peripheral = Peripheral {
            id: PeripheralId::from("AA:BB"),
            display_name: None,
            signal_strength: -60,
        };
        assert_eq!(peripheral.display_name_or_unknown(), "Unknown");

        let named = Peripheral { display_name: Some("Thermo".to_string()), ..peripheral };
        assert_eq!(named.display_name_or_unknown(), "Thermo");
        assert_eq!(named.id.to_string(), "AA:BB");
    }
}
