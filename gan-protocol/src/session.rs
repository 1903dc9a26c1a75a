//! Per-connection glue: owns a [`Transport`], an optional AES envelope, and
//! a [`Driver`], pumps notifications into a typed event stream, and
//! forwards outbound commands (including reconciler-issued history
//! requests) back out over the transport.
//!
//! Everything here runs on a single task — the "single cooperative
//! executor per Session" of the concurrency model. No driver state is ever
//! touched from more than one place at a time, so there is nothing here to
//! lock.

use crate::driver::{CubeGeneration, Driver};
use crate::error::SessionError;
use crate::event::Event;
use crate::timer::TimerDriver;
use futures::StreamExt;
use gan_transport::{AesCbcEnvelope, BoxedTransport, Command};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, warn, Instrument};

/// The event sink: present while the session is live, taken (and thereby
/// dropped) during teardown so the broadcast channel actually closes rather
/// than lingering as long as `Session` itself does.
type EventSink = Arc<Mutex<Option<broadcast::Sender<Event>>>>;

/// Capacity of the broadcast channel events are fanned out on. Generous
/// relative to the cube's real-world rate (at most ~20 frames/second) so a
/// briefly-lagging subscriber doesn't lose events under normal use.
const EVENT_CHANNEL_CAPACITY: usize = 256;

enum TaskMessage {
    Command(Command),
    Disconnect,
}

/// A live connection to one GAN device: a smart cube (Gen2/3/4) or the
/// smart timer. Owns the transport exclusively; driver state is created
/// fresh per `Session` and dropped with it.
pub struct Session {
    device_name: String,
    device_mac: [u8; 6],
    events_tx: EventSink,
    control_tx: mpsc::Sender<TaskMessage>,
    disconnected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Session {
    /// Start a session against a connected smart-cube transport.
    pub fn connect_cube(
        transport: BoxedTransport,
        device_name: String,
        mac: [u8; 6],
        generation: CubeGeneration,
    ) -> Self {
        let envelope = Some(generation.envelope(mac));
        let driver = generation.new_driver();
        Self::spawn(transport, device_name, mac, envelope, driver)
    }

    /// Start a session against a connected smart-timer transport. The
    /// timer path carries no AES envelope; frames are CRC-checked instead,
    /// inside [`TimerDriver`] itself.
    pub fn connect_timer(transport: BoxedTransport, device_name: String, mac: [u8; 6]) -> Self {
        Self::spawn(
            transport,
            device_name,
            mac,
            None,
            Box::new(TimerDriver::new()),
        )
    }

    fn spawn(
        transport: BoxedTransport,
        device_name: String,
        mac: [u8; 6],
        envelope: Option<AesCbcEnvelope>,
        driver: Box<dyn Driver>,
    ) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let events_tx: EventSink = Arc::new(Mutex::new(Some(tx)));
        let (control_tx, control_rx) = mpsc::channel(16);
        let disconnected = Arc::new(AtomicBool::new(false));

        let span = info_span!("gan_session", device = %device_name);
        let task = tokio::spawn(
            run_session(
                transport,
                envelope,
                driver,
                Arc::clone(&events_tx),
                control_rx,
                Arc::clone(&disconnected),
            )
            .instrument(span),
        );

        Session {
            device_name,
            device_mac: mac,
            events_tx,
            control_tx,
            disconnected,
            task,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_mac(&self) -> [u8; 6] {
        self.device_mac
    }

    /// Subscribe to this session's event stream. Every subscriber gets its
    /// own receiver; events are fanned out, not load-balanced.
    ///
    /// Once the sink has been closed by teardown, this hands back a
    /// receiver that is already closed — `recv()` observes
    /// [`broadcast::error::RecvError::Closed`] immediately rather than
    /// hanging, matching the "close the event sink" half of the disconnect
    /// sequence.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        let guard = self.events_tx.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                drop(tx);
                rx
            }
        }
    }

    /// Send a user command to the device. Commands a driver has no wire
    /// representation for are silently dropped — an unrepresentable command
    /// is a no-op, not an error.
    pub async fn send_command(&self, command: Command) -> Result<(), SessionError> {
        self.control_tx
            .send(TaskMessage::Command(command))
            .await
            .map_err(|_| SessionError::TaskGone)
    }

    /// Tear down the connection. Idempotent: calling this more than once,
    /// or racing it against a spurious transport disconnect, is safe.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let _ = self.control_tx.send(TaskMessage::Disconnect).await;
        Ok(())
    }

    /// Wait for the session's task to finish (after a disconnect).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Send one event to every current subscriber, if the sink hasn't been
/// closed by teardown yet.
fn send_event(events_tx: &EventSink, event: Event) {
    if let Some(tx) = events_tx.lock().unwrap().as_ref() {
        let _ = tx.send(event);
    }
}

async fn run_session(
    transport: BoxedTransport,
    envelope: Option<AesCbcEnvelope>,
    mut driver: Box<dyn Driver>,
    events_tx: EventSink,
    mut control_rx: mpsc::Receiver<TaskMessage>,
    disconnected: Arc<AtomicBool>,
) {
    let mut notifications = transport.notifications();
    let now_ms = || -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    };

    loop {
        tokio::select! {
            notification = notifications.next() => {
                match notification {
                    Some(mut bytes) => {
                        if let Some(env) = &envelope {
                            if let Err(err) = env.decrypt(&mut bytes) {
                                warn!(%err, "frame rejected: AES decrypt failed, dropping");
                                continue;
                            }
                        }
                        let output = driver.handle_state_frame(&bytes, now_ms());
                        for event in output.events {
                            send_event(&events_tx, event);
                        }
                        for mut outbound in output.outbound {
                            if let Some(env) = &envelope {
                                if let Err(err) = env.encrypt(&mut outbound) {
                                    warn!(%err, "failed to encrypt history request, dropping");
                                    continue;
                                }
                            }
                            if let Err(err) = transport.write(&outbound).await {
                                debug!(%err, "history request write failed, will retry on next move");
                            }
                        }
                        if output.disconnect {
                            warn!("protocol desynchronized, disconnecting");
                            teardown(&transport, &events_tx, &disconnected).await;
                            break;
                        }
                    }
                    None => {
                        debug!("notification stream ended, treating as spurious disconnect");
                        teardown(&transport, &events_tx, &disconnected).await;
                        break;
                    }
                }
            }
            message = control_rx.recv() => {
                match message {
                    Some(TaskMessage::Command(command)) => {
                        if let Some(mut bytes) = driver.encode_command(command) {
                            if let Some(env) = &envelope {
                                if let Err(err) = env.encrypt(&mut bytes) {
                                    error!(%err, "failed to encrypt outbound command");
                                    continue;
                                }
                            }
                            if let Err(err) = transport.write(&bytes).await {
                                error!(%err, "command write failed");
                            }
                        }
                    }
                    Some(TaskMessage::Disconnect) | None => {
                        teardown(&transport, &events_tx, &disconnected).await;
                        break;
                    }
                }
            }
        }
    }
}

/// The idempotent disconnect sequence: stop notifications (the loop exiting
/// does this implicitly), emit `Event::Disconnect`, close the event sink,
/// then close the transport. Guarded by `disconnected` so a racing explicit
/// `disconnect()` and a spurious transport-level drop only run this once
/// between them.
async fn teardown(
    transport: &BoxedTransport,
    events_tx: &EventSink,
    disconnected: &Arc<AtomicBool>,
) {
    if disconnected.swap(true, Ordering::SeqCst) {
        return;
    }
    send_event(events_tx, Event::Disconnect);
    // Drop the sender so every existing and future receiver observes the
    // sink as closed, instead of hanging on `recv()` forever.
    events_tx.lock().unwrap().take();
    if let Err(err) = transport.disconnect().await {
        warn!(%err, "error while closing transport during disconnect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use gan_transport::TransportError;
    use std::sync::Mutex;

    struct FakeTransport {
        writes: Mutex<Vec<Vec<u8>>>,
        notifications: Mutex<Option<Vec<Vec<u8>>>>,
        disconnected: AtomicBool,
    }

    impl FakeTransport {
        fn new(notifications: Vec<Vec<u8>>) -> Arc<Self> {
            Arc::new(Self {
                writes: Mutex::new(Vec::new()),
                notifications: Mutex::new(Some(notifications)),
                disconnected: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl gan_transport::Transport for FakeTransport {
        async fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
            self.writes.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn notifications(&self) -> BoxStream<'static, Vec<u8>> {
            let items = self.notifications.lock().unwrap().take().unwrap_or_default();
            stream::iter(items).boxed()
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            self.disconnected.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            !self.disconnected.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn notification_stream_ending_emits_disconnect() {
        let transport = FakeTransport::new(vec![]);
        let session = Session::connect_timer(transport.clone(), "timer".into(), [0; 6]);
        let mut events = session.events();
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), events.recv())
            .await
            .expect("timed out waiting for disconnect event")
            .unwrap();
        assert_eq!(event, Event::Disconnect);
        session.join().await;
        assert!(transport.disconnected.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn explicit_disconnect_is_idempotent() {
        let transport = FakeTransport::new(vec![]);
        let session = Session::connect_timer(transport.clone(), "timer".into(), [0; 6]);
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();
        session.join().await;
        assert!(transport.disconnected.load(Ordering::SeqCst));
    }
}
