//! Client library for GAN-branded smart cube and smart timer BLE devices.
//!
//! This crate is a thin facade over two lower-level crates:
//!
//! - [`gan_transport`] — the `Transport` trait, bit/AES/CRC framing, and the
//!   fixed per-generation GATT/key configuration.
//! - [`gan_protocol`] — the protocol drivers, the typed [`Event`] stream,
//!   and [`Session`], which glues a transport to the right driver.
//!
//! BLE discovery/pairing and the device-selection UI are explicitly out of
//! scope here: callers bring their own [`gan_transport::Transport`]
//! implementation (backed by `btleplug`, a platform BLE stack, or a test
//! fake) and this crate turns its byte stream into cube/timer events.

pub use gan_protocol::{
    CubeGeneration, Driver, DriverOutput, Event, Gen2Driver, Gen3Driver, Gen4Driver, Session,
    SessionError, TimerDriver, TimestampFitter,
};
pub use gan_transport::{
    command, config, crc, keys, AesCbcEnvelope, BitView, BoxedTransport, Command, Transport,
    TransportError,
};

pub mod event {
    //! Re-export of the typed event vocabulary; see [`gan_protocol::event`].
    pub use gan_protocol::event::*;
}
