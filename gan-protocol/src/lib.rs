//! Protocol drivers that turn decrypted GAN cube/timer frames into a typed
//! event stream, and the [`Session`] that glues a [`gan_transport::Transport`]
//! to one of them.
//!
//! - [`driver`] defines the `Driver` seam and [`CubeGeneration`] dispatch.
//! - [`gen2`], [`gen3`], [`gen4`] are the three smart-cube wire protocols.
//! - [`timer`] decodes the smart timer's state and recorded-time frames.
//! - [`reconciler`] is the lost-move recovery FIFO shared by Gen3/Gen4.
//! - [`facelet`] and [`timestamp`] are the cross-protocol post-processing
//!   steps: facelet reconstruction and clock-skew correction.
//! - [`event`] is the typed event vocabulary every driver emits into.
//! - [`session`] is the per-connection glue: transport + envelope + driver.

pub mod driver;
pub mod error;
pub mod event;
pub mod facelet;
pub mod gen2;
pub mod gen3;
pub mod gen4;
pub mod reconciler;
pub mod session;
pub mod timer;
pub mod timestamp;

pub use driver::{CubeGeneration, Driver, DriverOutput};
pub use error::SessionError;
pub use event::Event;
pub use gen2::Gen2Driver;
pub use gen3::Gen3Driver;
pub use gen4::Gen4Driver;
pub use session::Session;
pub use timer::TimerDriver;
pub use timestamp::TimestampFitter;
