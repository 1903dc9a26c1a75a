//! Smart-timer driver: CRC-validated, magic-byte-framed state-change
//! notifications, plus the 16-byte recorded-times blob returned by a
//! characteristic *read* rather than a notification.
//!
//! Unlike the cube drivers this path carries no AES envelope — frames are
//! plaintext, integrity-checked with CRC-16/CCITT-FALSE instead.

use crate::driver::{Driver, DriverOutput};
use crate::event::{Event, RecordedTime, TimerEvent, TimerState};
use gan_transport::crc;
use gan_transport::error::CryptoError;
use gan_transport::Command;
use tracing::{trace, warn};

const MAGIC: u8 = 0xFE;

/// The four recorded times returned by a read of the time characteristic:
/// the currently displayed time, and the three most recent solves before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeHistory {
    pub display: RecordedTime,
    pub previous: [RecordedTime; 3],
}

fn decode_recorded_time(bytes: &[u8]) -> RecordedTime {
    RecordedTime {
        minutes: bytes[0],
        seconds: bytes[1],
        millis: u16::from_le_bytes([bytes[2], bytes[3]]),
    }
}

/// Stateless decoder for the smart timer's state characteristic and the
/// read-only recorded-times blob. The timer protocol carries no serial
/// tracking or move recovery, so unlike the cube drivers there is no
/// per-connection mutable state to own.
#[derive(Default)]
pub struct TimerDriver;

impl TimerDriver {
    pub fn new() -> Self {
        Self
    }

    /// Decode the 16-byte blob returned by reading the time characteristic:
    /// four 4-byte recorded times back to back (display, then the three
    /// most recent prior solves).
    pub fn decode_time_blob(&self, data: &[u8]) -> Option<TimeHistory> {
        if data.len() < 16 {
            return None;
        }
        Some(TimeHistory {
            display: decode_recorded_time(&data[0..4]),
            previous: [
                decode_recorded_time(&data[4..8]),
                decode_recorded_time(&data[8..12]),
                decode_recorded_time(&data[12..16]),
            ],
        })
    }
}

impl Driver for TimerDriver {
    /// The timer accepts no application commands in this protocol; it is
    /// driven purely by notifications and characteristic reads.
    fn encode_command(&self, _command: Command) -> Option<Vec<u8>> {
        None
    }

    fn handle_state_frame(&mut self, frame: &[u8], _now_ms: i64) -> DriverOutput {
        if frame.is_empty() || frame[0] != MAGIC {
            warn!("timer: bad magic or empty frame, dropping");
            return DriverOutput::default();
        }
        if frame.len() < 6 {
            warn!(len = frame.len(), "timer: frame too short, dropping");
            return DriverOutput::default();
        }

        let len = frame.len();
        let expected = u16::from_le_bytes([frame[len - 2], frame[len - 1]]);
        let computed = crc::checksum(&frame[2..len - 2]);
        if expected != computed {
            let err = CryptoError::CrcMismatch { expected, computed };
            warn!(%err, "timer: dropping frame");
            return DriverOutput::default();
        }

        let Some(state) = TimerState::from_byte(frame[3]) else {
            warn!(byte = frame[3], "timer: unknown state byte, dropping");
            return DriverOutput::default();
        };
        trace!(?state, "timer: decoded state frame");

        let recorded_time = if matches!(state, TimerState::Stopped) && frame.len() >= 8 {
            Some(decode_recorded_time(&frame[4..8]))
        } else {
            None
        };

        DriverOutput::events(vec![Event::Timer(TimerEvent {
            state,
            recorded_time,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(state: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![MAGIC, 0u8, 0u8, state];
        frame.extend_from_slice(payload);
        let checksum = crc::checksum(&frame[2..]);
        frame.extend_from_slice(&checksum.to_le_bytes());
        frame
    }

    #[test]
    fn stopped_round_trip_with_recorded_time() {
        let mut driver = TimerDriver::new();
        let frame = framed(TimerState::Stopped as u8, &[0, 12, 0x64, 0x00]);
        let out = driver.handle_state_frame(&frame, 0);
        assert_eq!(out.events.len(), 1);
        match &out.events[0] {
            Event::Timer(t) => {
                assert_eq!(t.state, TimerState::Stopped);
                let rt = t.recorded_time.unwrap();
                assert_eq!(rt.minutes, 0);
                assert_eq!(rt.seconds, 12);
                assert_eq!(rt.millis, 100);
                assert_eq!(rt.as_timestamp_ms(), 12_100);
            }
            _ => panic!("expected timer event"),
        }
    }

    #[test]
    fn bad_crc_is_dropped() {
        let mut driver = TimerDriver::new();
        let mut frame = framed(TimerState::Idle as u8, &[]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let out = driver.handle_state_frame(&frame, 0);
        assert!(out.events.is_empty());
    }

    #[test]
    fn bad_magic_is_dropped() {
        let mut driver = TimerDriver::new();
        let mut frame = framed(TimerState::Idle as u8, &[]);
        frame[0] = 0x00;
        let out = driver.handle_state_frame(&frame, 0);
        assert!(out.events.is_empty());
    }

    #[test]
    fn time_blob_decodes_four_recorded_times() {
        let driver = TimerDriver::new();
        let mut data = Vec::new();
        for (m, s, ms) in [(0u8, 12u8, 100u16), (0, 15, 250), (1, 2, 0), (0, 59, 999)] {
            data.push(m);
            data.push(s);
            data.extend_from_slice(&ms.to_le_bytes());
        }
        let history = driver.decode_time_blob(&data).unwrap();
        assert_eq!(history.display.as_timestamp_ms(), 12_100);
        assert_eq!(history.previous[0].as_timestamp_ms(), 15_250);
        assert_eq!(history.previous[1].as_timestamp_ms(), 62_000);
        assert_eq!(history.previous[2].as_timestamp_ms(), 59_999);
    }
}
