//! The user-facing command vocabulary. History requests are not part of this
//! enum — they are an internal recovery mechanism driven by the reconciler,
//! never issued directly by a caller.

/// A command a caller may send to a connected cube or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RequestFacelets,
    RequestHardware,
    RequestBattery,
    RequestReset,
}
