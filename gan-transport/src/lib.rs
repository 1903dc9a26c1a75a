//! Transport abstraction layer for GAN smart cube and smart timer BLE devices.
//!
//! This crate provides the pieces that sit below the protocol drivers:
//!
//! - [`Transport`], the GATT write/notify abstraction the drivers are built against.
//! - [`bitview`], a bit-addressable view over fixed-size notification frames.
//! - [`envelope`], the AES-CBC "overlapping chunk" scheme used by every cube generation.
//! - [`crc`], CRC-16/CCITT-FALSE as used by the smart timer.
//! - [`keys`], the fixed key material and MAC-based salt derivation.
//! - [`config`], GATT UUIDs and command opcode tables per protocol generation.

pub mod bitview;
pub mod command;
pub mod config;
pub mod crc;
pub mod envelope;
pub mod error;
pub mod keys;

pub use bitview::BitView;
pub use command::Command;
pub use envelope::AesCbcEnvelope;
pub use error::TransportError;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// The GATT transport abstraction drivers and sessions are built against.
///
/// A real implementation wraps a BLE GATT connection; tests drive this trait with an
/// in-memory fake. No implementation detail of BLE discovery/pairing leaks through here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write a single frame to the device's write characteristic.
    async fn write(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Stream of raw notification frames from the device's notify characteristic.
    ///
    /// Each item is one already-reassembled GATT notification payload (no MTU
    /// fragmentation handling here; that belongs to the GATT layer itself).
    fn notifications(&self) -> BoxStream<'static, Vec<u8>>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// True while the underlying GATT connection is live.
    async fn is_connected(&self) -> bool;
}

/// Type alias for a shared, boxed transport.
pub type BoxedTransport = Arc<dyn Transport>;
