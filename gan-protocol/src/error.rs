//! Protocol-level error types.

use gan_transport::TransportError;
use thiserror::Error;

/// Errors a [`crate::session::Session`] can surface to a caller.
///
/// Per-frame decode failures (bad magic, bad CRC, unknown event type) are
/// *not* represented here — those are dropped silently at the driver level,
/// see the module docs on each driver.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("protocol desynchronized: move buffer exceeded capacity")]
    Desynchronized,

    #[error(transparent)]
    Crypto(#[from] gan_transport::error::CryptoError),

    #[error("session task is no longer running")]
    TaskGone,
}
