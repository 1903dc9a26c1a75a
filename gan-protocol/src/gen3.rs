//! Gen3 protocol driver. Gen3 introduces the magic-byte-framed wire format
//! and the move-history recovery sub-protocol: unlike Gen2, a move
//! notification carries no self-contained backlog, so gaps in the serial
//! sequence are closed out-of-band via [`crate::reconciler::MoveReconciler`].

use crate::driver::{ascii_name, clamp_percent, Driver, DriverOutput};
use crate::event::{
    BatteryEvent, Direction, Event, Face, FaceletEvent, HardwareEvent, MoveEvent,
};
use crate::facelet::{complete_parity, to_facelets};
use crate::reconciler::MoveReconciler;
use gan_transport::config::{gen3_cmd, RESET_TO_SOLVED};
use gan_transport::{BitView, Command};
use tracing::{trace, warn};

const FRAME_LEN: usize = 16;
const MAGIC: u32 = 0x55;

/// Bitmask-per-face lookup used by the move event's face field.
const MOVE_FACE_MASKS: [u32; 6] = [2, 32, 8, 1, 16, 4];
/// Face-index lookup used by the history event's face field.
const HISTORY_FACE_TABLE: [u32; 6] = [1, 5, 3, 0, 4, 2];

fn face_from_mask(mask: u32) -> Option<Face> {
    MOVE_FACE_MASKS
        .iter()
        .position(|&m| m == mask)
        .and_then(|i| Face::from_index(i as u32))
}

fn direction_from_bit(bit: u32) -> Direction {
    if bit == 0 {
        Direction::Clockwise
    } else {
        Direction::CounterClockwise
    }
}

fn encode_history_request(serial: u8, count: u8) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[0] = 0x68;
    frame[1] = gen3_cmd::REQUEST_HISTORY;
    frame[2] = serial;
    frame[4] = count;
    frame
}

/// Per-connection Gen3 protocol state.
pub struct Gen3Driver {
    reconciler: MoveReconciler,
}

impl Default for Gen3Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Gen3Driver {
    pub fn new() -> Self {
        Self {
            reconciler: MoveReconciler::new(),
        }
    }

    fn decode_move(&mut self, view: &BitView, now_ms: i64) -> DriverOutput {
        let cube_ts = view.bit_word_le(24, 32) as i64;
        let serial = view.bit_word_le(56, 16) as u8;
        let dir_bit = view.bit_word(72, 2);
        let face_mask = view.bit_word(74, 6);
        let Some(face) = face_from_mask(face_mask) else {
            warn!(face_mask, "gen3: unknown face mask, dropping move");
            return DriverOutput::default();
        };
        let mv = MoveEvent {
            face,
            direction: direction_from_bit(dir_bit),
            serial,
            host_ts: Some(now_ms),
            cube_ts: Some(cube_ts),
        };
        let out = self.reconciler.on_move(mv, now_ms, encode_history_request);
        reconcile_to_driver_output(out)
    }

    fn decode_history(&mut self, view: &BitView, data_len: u32) -> DriverOutput {
        let start = view.bit_word(24, 8) as u8;
        let count = 2 * data_len.saturating_sub(1);
        for i in 0..count {
            let face_idx = view.bit_word(32 + 4 * i as usize, 3);
            let dir_bit = view.bit_word(35 + 4 * i as usize, 1);
            let Some(&face_index) = HISTORY_FACE_TABLE.get(face_idx as usize) else {
                continue;
            };
            let Some(face) = Face::from_index(face_index) else {
                continue;
            };
            self.reconciler.inject(MoveEvent {
                face,
                direction: direction_from_bit(dir_bit),
                serial: start.wrapping_sub(i as u8),
                host_ts: None,
                cube_ts: None,
            });
        }
        let out = self.reconciler.evict(encode_history_request);
        reconcile_to_driver_output(out)
    }

    fn decode_facelets(&mut self, view: &BitView, now_ms: i64) -> DriverOutput {
        let serial = view.bit_word(24, 8) as u8;

        let mut cp7 = [0u8; 7];
        for (i, slot) in cp7.iter_mut().enumerate() {
            *slot = view.bit_word(32 + 3 * i, 3) as u8;
        }
        let mut co7 = [0u8; 7];
        for (i, slot) in co7.iter_mut().enumerate() {
            *slot = view.bit_word(53 + 2 * i, 2) as u8;
        }
        let mut ep11 = [0u8; 11];
        for (i, slot) in ep11.iter_mut().enumerate() {
            *slot = view.bit_word(67 + 4 * i, 4) as u8;
        }
        let mut eo11 = [0u8; 11];
        for (i, slot) in eo11.iter_mut().enumerate() {
            *slot = view.bit_word(111 + i, 1) as u8;
        }

        let (cp, co, ep, eo) = complete_parity(&cp7, &co7, &ep11, &eo11);
        let facelets = to_facelets(&cp, &co, &ep, &eo);
        let mut out = DriverOutput::events(vec![Event::Facelets(FaceletEvent {
            serial,
            facelets,
            cp,
            co,
            ep,
            eo,
        })]);
        if let Some(bytes) = self
            .reconciler
            .on_facelet_serial(serial, now_ms, encode_history_request)
        {
            out.outbound.push(bytes);
        }
        out
    }

    fn decode_hardware(view: &BitView) -> Event {
        let mut name_bytes = [0u8; 5];
        for (i, slot) in name_bytes.iter_mut().enumerate() {
            *slot = view.bit_word(24 + 8 * i, 8) as u8;
        }
        let hw_major = view.bit_word(64, 4) as u8;
        let hw_minor = view.bit_word(68, 4) as u8;
        let sw_major = view.bit_word(72, 4) as u8;
        let sw_minor = view.bit_word(76, 4) as u8;
        Event::Hardware(HardwareEvent {
            name: ascii_name(&name_bytes),
            hw_major,
            hw_minor,
            sw_major,
            sw_minor,
            production_date: None,
            gyro_supported: false,
        })
    }
}

fn reconcile_to_driver_output(out: crate::reconciler::ReconcileOutput) -> DriverOutput {
    DriverOutput {
        events: out.emitted.into_iter().map(Event::Move).collect(),
        outbound: out.outbound,
        disconnect: out.desynchronized,
    }
}

impl Driver for Gen3Driver {
    fn encode_command(&self, command: Command) -> Option<Vec<u8>> {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[0] = 0x68;
        match command {
            Command::RequestFacelets => frame[1] = gen3_cmd::REQUEST_FACELETS,
            Command::RequestHardware => frame[1] = gen3_cmd::REQUEST_HARDWARE,
            Command::RequestBattery => frame[1] = gen3_cmd::REQUEST_BATTERY,
            Command::RequestReset => {
                frame[1] = gen3_cmd::REQUEST_RESET;
                frame[2..14].copy_from_slice(&RESET_TO_SOLVED);
            }
        }
        Some(frame)
    }

    fn handle_state_frame(&mut self, frame: &[u8], now_ms: i64) -> DriverOutput {
        if frame.len() < 3 {
            return DriverOutput::default();
        }
        let view = BitView::new(frame);
        if view.bit_word(0, 8) != MAGIC {
            return DriverOutput::default();
        }
        let event_type = view.bit_word(8, 8);
        let data_len = view.bit_word(16, 8);
        if data_len == 0 {
            return DriverOutput::default();
        }
        trace!(event_type, data_len, "gen3: decoding state frame");
        match event_type {
            0x01 => self.decode_move(&view, now_ms),
            0x06 => self.decode_history(&view, data_len),
            0x02 => self.decode_facelets(&view, now_ms),
            0x07 => DriverOutput::events(vec![Self::decode_hardware(&view)]),
            0x10 => {
                let percent = clamp_percent(view.bit_word(24, 8) as u8);
                DriverOutput::events(vec![Event::Battery(BatteryEvent { percent })])
            }
            0x11 => DriverOutput::events(vec![Event::Disconnect]),
            other => {
                warn!(event_type = other, "gen3: unknown event type, dropping frame");
                DriverOutput::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_word(bits: &mut [bool], start: usize, len: usize, value: u32) {
        for i in 0..len {
            bits[start + i] = (value >> (len - 1 - i)) & 1 == 1;
        }
    }

    fn to_bytes(bits: &[bool], len_bytes: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len_bytes];
        for (i, b) in bits.iter().enumerate() {
            if *b {
                bytes[i / 8] |= 1 << (7 - i % 8);
            }
        }
        bytes
    }

    fn move_frame(cube_ts: u32, serial: u16, dir: u32, face_mask: u32) -> Vec<u8> {
        let mut bits = vec![false; 16 * 8];
        set_word(&mut bits, 0, 8, MAGIC);
        set_word(&mut bits, 8, 8, 0x01);
        set_word(&mut bits, 16, 8, 1);
        let ts_le = cube_ts.to_le_bytes();
        for (i, b) in ts_le.iter().enumerate() {
            set_word(&mut bits, 24 + 8 * i, 8, *b as u32);
        }
        let serial_le = serial.to_le_bytes();
        for (i, b) in serial_le.iter().enumerate() {
            set_word(&mut bits, 56 + 8 * i, 8, *b as u32);
        }
        set_word(&mut bits, 72, 2, dir);
        set_word(&mut bits, 74, 6, face_mask);
        to_bytes(&bits, 16)
    }

    fn history_frame(start: u8, faces: &[(u32, u32)]) -> Vec<u8> {
        let data_len = 1 + faces.len() as u32 / 2;
        let mut bits = vec![false; 16 * 8];
        set_word(&mut bits, 0, 8, MAGIC);
        set_word(&mut bits, 8, 8, 0x06);
        set_word(&mut bits, 16, 8, data_len);
        set_word(&mut bits, 24, 8, start as u32);
        for (i, &(face_idx, dir)) in faces.iter().enumerate() {
            set_word(&mut bits, 32 + 4 * i, 3, face_idx);
            set_word(&mut bits, 35 + 4 * i, 1, dir);
        }
        to_bytes(&bits, 16)
    }

    #[test]
    fn lost_move_recovery_emits_in_serial_order() {
        let mut driver = Gen3Driver::new();
        let u_idx = HISTORY_FACE_TABLE.iter().position(|&v| v == 0).unwrap() as u32;

        let out = driver.handle_state_frame(&move_frame(0, 5, 0, MOVE_FACE_MASKS[0]), 1000);
        assert_eq!(out.events.len(), 1);

        let out = driver.handle_state_frame(&move_frame(300, 8, 0, MOVE_FACE_MASKS[0]), 1300);
        assert!(out.events.is_empty());
        assert!(!out.outbound.is_empty());

        // History response delivers serials 7 then 6 (newest first) in one frame.
        let history = history_frame(7, &[(u_idx, 0), (u_idx, 0)]);
        let out = driver.handle_state_frame(&history, 1400);

        let serials: Vec<u8> = out.events.iter().filter_map(|e| match e {
            Event::Move(m) => Some(m.serial),
            _ => None,
        }).collect();
        assert_eq!(serials, vec![6, 7, 8]);
    }

    #[test]
    fn unknown_magic_is_dropped() {
        let mut driver = Gen3Driver::new();
        let frame = vec![0x00u8; 16];
        let out = driver.handle_state_frame(&frame, 0);
        assert!(out.events.is_empty());
        assert!(!out.disconnect);
    }

    #[test]
    fn reset_command_embeds_solved_literal() {
        let driver = Gen3Driver::new();
        let frame = driver.encode_command(Command::RequestReset).unwrap();
        assert_eq!(frame[0], 0x68);
        assert_eq!(frame[1], gen3_cmd::REQUEST_RESET);
        assert_eq!(&frame[2..14], &RESET_TO_SOLVED[..]);
    }
}
