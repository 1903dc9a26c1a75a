//! Transport error types

use thiserror::Error;

/// Errors that can occur at the GATT transport boundary.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device disconnected")]
    Disconnected,

    #[error("communication timeout")]
    Timeout,

    #[error("GATT characteristic not found: {0}")]
    GattCharacteristicNotFound(String),

    #[error("bluetooth error: {0}")]
    BluetoothError(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors from the AES/CRC frame envelopes, one layer above raw transport I/O.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("frame too short for AES envelope: got {len} bytes, need at least 16")]
    FrameTooShort { len: usize },

    #[error("cipher block error: {0}")]
    Cipher(String),

    #[error("CRC mismatch: expected 0x{expected:04X}, computed 0x{computed:04X}")]
    CrcMismatch { expected: u16, computed: u16 },
}
