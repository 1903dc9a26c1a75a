//! Minimal CLI that connects to a GAN smart cube over a caller-supplied
//! transport and prints every decoded event to stdout.
//!
//! This binary has no real BLE backend wired in — discovery/pairing is out
//! of scope for the core library — so it drives the session with an
//! in-memory fake that replays a canned solved-state snapshot, as a smoke
//! test of the public API surface end to end.

use futures::stream::{self, BoxStream, StreamExt};
use gan_cube::{BoxedTransport, Command, CubeGeneration, Event, Session, Transport, TransportError};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct ReplayTransport {
    mac: [u8; 6],
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    async fn write(&self, _bytes: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn notifications(&self) -> BoxStream<'static, Vec<u8>> {
        let envelope = gan_cube::keys::envelope_v1(self.mac);
        let mut frame = solved_state_frame();
        envelope.encrypt(&mut frame).expect("20-byte frame encrypts");
        stream::iter(vec![frame]).boxed()
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        true
    }
}

/// A Gen2 facelets notification for an already-solved cube.
fn solved_state_frame() -> Vec<u8> {
    vec![0x40, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mac = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF];
    let transport: BoxedTransport = Arc::new(ReplayTransport { mac });
    let session = Session::connect_cube(transport, "GAN-demo".into(), mac, CubeGeneration::Gen2);

    let mut events = session.events();
    session
        .send_command(Command::RequestFacelets)
        .await
        .expect("session task is running");

    match tokio::time::timeout(std::time::Duration::from_secs(2), events.recv()).await {
        Ok(Ok(Event::Facelets(f))) => {
            println!("facelets: {}", f.facelets);
            ExitCode::SUCCESS
        }
        Ok(Ok(other)) => {
            println!("unexpected event: {other:?}");
            ExitCode::from(4)
        }
        Ok(Err(err)) => {
            eprintln!("event stream error: {err}");
            ExitCode::from(2)
        }
        Err(_) => {
            eprintln!("timed out waiting for a facelets event");
            ExitCode::from(2)
        }
    }
}
