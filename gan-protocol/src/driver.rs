//! The `Driver` seam: one implementation per protocol generation, dispatched
//! by whichever GATT service UUID the connected device advertises.

use crate::event::Event;
use gan_transport::config::{GEN2_PROFILE, GEN3_PROFILE, GEN4_PROFILE};
use gan_transport::Command;

/// What decoding one state-characteristic notification produced.
#[derive(Default)]
pub struct DriverOutput {
    /// Events ready for the caller to deliver.
    pub events: Vec<Event>,
    /// Wire-encoded frames the caller must write to the command
    /// characteristic — history requests the driver decided it needs.
    pub outbound: Vec<Vec<u8>>,
    /// Set when the protocol has desynchronized beyond recovery; the caller
    /// should tear down the connection.
    pub disconnect: bool,
}

impl DriverOutput {
    pub fn events(events: Vec<Event>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }
}

/// Decodes state-characteristic notifications into zero or more [`Event`]s
/// (plus any outbound recovery frames) and encodes outbound [`Command`]s
/// into wire frames.
///
/// Implementors own all per-connection protocol state (serial tracking,
/// cube-clock accumulation, the move FIFO, partial hardware-info). State is
/// created fresh per connection and is never shared across sessions. This
/// trait is otherwise pure — no implementation talks to a transport.
pub trait Driver: Send {
    /// Encode a user command into the bytes to write to the command
    /// characteristic. Returns `None` for commands this generation has no
    /// wire representation for (a no-op, not an error).
    fn encode_command(&self, command: Command) -> Option<Vec<u8>>;

    /// Decode one state-characteristic notification, given the current host
    /// clock in milliseconds. Malformed frames (bad magic, unknown event
    /// type, truncated data) are dropped: an empty [`DriverOutput`], not an
    /// error.
    fn handle_state_frame(&mut self, frame: &[u8], now_ms: i64) -> DriverOutput;
}

/// Which smart-cube protocol generation a device speaks, and the one place
/// that maps a GATT service UUID onto that choice. A `Driver` is otherwise
/// selected once, up front, and never switched mid-connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeGeneration {
    Gen2,
    Gen3,
    Gen4,
}

impl CubeGeneration {
    /// Identify the generation from the device's advertised GATT service
    /// UUID. Returns `None` for anything that isn't a recognized cube
    /// service (e.g. the smart timer, or an unrelated device).
    pub fn from_service_uuid(uuid: &str) -> Option<Self> {
        let uuid = uuid.to_ascii_lowercase();
        if uuid == GEN2_PROFILE.service_uuid {
            Some(CubeGeneration::Gen2)
        } else if uuid == GEN3_PROFILE.service_uuid {
            Some(CubeGeneration::Gen3)
        } else if uuid == GEN4_PROFILE.service_uuid {
            Some(CubeGeneration::Gen4)
        } else {
            None
        }
    }

    /// Construct the driver for this generation, boxed behind the shared
    /// [`Driver`] seam.
    pub fn new_driver(self) -> Box<dyn Driver> {
        match self {
            CubeGeneration::Gen2 => Box::new(crate::gen2::Gen2Driver::new()),
            CubeGeneration::Gen3 => Box::new(crate::gen3::Gen3Driver::new()),
            CubeGeneration::Gen4 => Box::new(crate::gen4::Gen4Driver::new()),
        }
    }

    /// GATT service/characteristic UUIDs for this generation.
    pub fn gatt_profile(self) -> &'static gan_transport::config::GattProfile {
        match self {
            CubeGeneration::Gen2 => &GEN2_PROFILE,
            CubeGeneration::Gen3 => &GEN3_PROFILE,
            CubeGeneration::Gen4 => &GEN4_PROFILE,
        }
    }

    /// Build the AES envelope for a connection to the device at `mac`.
    /// Gen2/Gen3 share one fixed (key, iv) pair; Gen4 uses a second.
    pub fn envelope(self, mac: [u8; 6]) -> gan_transport::AesCbcEnvelope {
        match self {
            CubeGeneration::Gen2 | CubeGeneration::Gen3 => gan_transport::keys::envelope_v1(mac),
            CubeGeneration::Gen4 => gan_transport::keys::envelope_v2(mac),
        }
    }
}

pub(crate) fn clamp_percent(value: u8) -> u8 {
    value.min(100)
}

pub(crate) fn ascii_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_uuid_selects_generation() {
        assert_eq!(
            CubeGeneration::from_service_uuid(GEN2_PROFILE.service_uuid),
            Some(CubeGeneration::Gen2)
        );
        assert_eq!(
            CubeGeneration::from_service_uuid(GEN4_PROFILE.service_uuid),
            Some(CubeGeneration::Gen4)
        );
        assert_eq!(CubeGeneration::from_service_uuid("not-a-uuid"), None);
    }
}
