//! Gen2 protocol driver. Gen2 predates the move-history recovery mechanism:
//! every move notification self-reports up to 7 moves of its own recent
//! history, so per-event local recovery is enough — no [`crate::reconciler::MoveReconciler`]
//! is involved.

use crate::driver::{ascii_name, clamp_percent, Driver, DriverOutput};
use crate::event::{
    BatteryEvent, Direction, Event, Face, FaceletEvent, GyroEvent, HardwareEvent, Quaternion,
};
use crate::facelet::{complete_parity, to_facelets};
use gan_transport::config::{gen2_cmd, RESET_TO_SOLVED};
use gan_transport::{BitView, Command};
use tracing::{trace, warn};

const FRAME_LEN: usize = 20;

/// Per-connection Gen2 protocol state.
pub struct Gen2Driver {
    last_serial: i16,
    last_local_ts: Option<i64>,
    cube_ts_accum: i64,
}

impl Default for Gen2Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Gen2Driver {
    pub fn new() -> Self {
        Self {
            last_serial: -1,
            last_local_ts: None,
            cube_ts_accum: 0,
        }
    }

    fn decode_gyro(view: &BitView) -> Event {
        let w = view.sign_magnitude(4, 16) as f64 / 0x7FFF as f64;
        let x = view.sign_magnitude(20, 16) as f64 / 0x7FFF as f64;
        let y = view.sign_magnitude(36, 16) as f64 / 0x7FFF as f64;
        let z = view.sign_magnitude(52, 16) as f64 / 0x7FFF as f64;
        let vx = view.sign_magnitude(68, 4);
        let vy = view.sign_magnitude(72, 4);
        let vz = view.sign_magnitude(76, 4);
        Event::Gyro(GyroEvent {
            quaternion: Quaternion { x, y, z, w },
            velocity: Some((vx, vy, vz)),
        })
    }

    fn decode_moves(&mut self, view: &BitView, now_ms: i64) -> Vec<Event> {
        let serial = view.bit_word(4, 8) as u8;
        if self.last_serial < 0 {
            // No facelet snapshot has established a baseline serial yet; a move
            // frame alone can't safely recover history, so it's dropped.
            return Vec::new();
        }
        let diff = (serial.wrapping_sub(self.last_serial as u8) as u32).min(7) as u32;
        let mut events = Vec::new();
        for i in (0..diff).rev() {
            let face_bits = view.bit_word(12 + 5 * i as usize, 4);
            let dir_bit = view.bit_word(16 + 5 * i as usize, 1);
            let mut elapsed = view.bit_word_le(47 + 16 * i as usize, 16) as i64;
            if elapsed == 0 {
                elapsed = self.last_local_ts.map(|t| now_ms - t).unwrap_or(0);
            }
            self.cube_ts_accum += elapsed;
            let Some(face) = Face::from_index(face_bits) else {
                warn!(face_bits, "gen2: unknown face index, dropping move");
                continue;
            };
            let direction = if dir_bit == 0 {
                Direction::Clockwise
            } else {
                Direction::CounterClockwise
            };
            events.push(Event::Move(crate::event::MoveEvent {
                face,
                direction,
                serial: serial.wrapping_sub(i as u8),
                host_ts: if i == 0 { Some(now_ms) } else { None },
                cube_ts: Some(self.cube_ts_accum),
            }));
        }
        self.last_serial = serial as i16;
        self.last_local_ts = Some(now_ms);
        events
    }

    fn decode_facelets(&mut self, view: &BitView) -> Event {
        let serial = view.bit_word(4, 8) as u8;
        if self.last_serial < 0 {
            self.last_serial = serial as i16;
        }

        let mut cp7 = [0u8; 7];
        for (i, slot) in cp7.iter_mut().enumerate() {
            *slot = view.bit_word(12 + 3 * i, 3) as u8;
        }
        let mut co7 = [0u8; 7];
        for (i, slot) in co7.iter_mut().enumerate() {
            *slot = view.bit_word(33 + 2 * i, 2) as u8;
        }
        let mut ep11 = [0u8; 11];
        for (i, slot) in ep11.iter_mut().enumerate() {
            *slot = view.bit_word(47 + 4 * i, 4) as u8;
        }
        let mut eo11 = [0u8; 11];
        for (i, slot) in eo11.iter_mut().enumerate() {
            *slot = view.bit_word(91 + i, 1) as u8;
        }

        let (cp, co, ep, eo) = complete_parity(&cp7, &co7, &ep11, &eo11);
        let facelets = to_facelets(&cp, &co, &ep, &eo);
        Event::Facelets(FaceletEvent {
            serial,
            facelets,
            cp,
            co,
            ep,
            eo,
        })
    }

    fn decode_hardware(view: &BitView) -> Event {
        let hw_major = view.bit_word(8, 8) as u8;
        let hw_minor = view.bit_word(16, 8) as u8;
        let sw_major = view.bit_word(24, 8) as u8;
        let sw_minor = view.bit_word(32, 8) as u8;
        let mut name_bytes = [0u8; 8];
        for (i, slot) in name_bytes.iter_mut().enumerate() {
            *slot = view.bit_word(40 + 8 * i, 8) as u8;
        }
        let gyro_supported = view.bit(104);
        Event::Hardware(HardwareEvent {
            name: ascii_name(&name_bytes),
            hw_major,
            hw_minor,
            sw_major,
            sw_minor,
            production_date: None,
            gyro_supported,
        })
    }
}

impl Driver for Gen2Driver {
    fn encode_command(&self, command: Command) -> Option<Vec<u8>> {
        let mut frame = vec![0u8; FRAME_LEN];
        match command {
            Command::RequestFacelets => frame[0] = gen2_cmd::REQUEST_FACELETS,
            Command::RequestHardware => frame[0] = gen2_cmd::REQUEST_HARDWARE,
            Command::RequestBattery => frame[0] = gen2_cmd::REQUEST_BATTERY,
            Command::RequestReset => {
                frame[0] = gen2_cmd::REQUEST_RESET;
                frame[1] = 0x05;
                frame[2..14].copy_from_slice(&RESET_TO_SOLVED);
            }
        }
        Some(frame)
    }

    fn handle_state_frame(&mut self, frame: &[u8], now_ms: i64) -> DriverOutput {
        if frame.is_empty() {
            return DriverOutput::default();
        }
        let view = BitView::new(frame);
        let event_type = view.bit_word(0, 4);
        trace!(event_type, "gen2: decoding state frame");
        let events = match event_type {
            0x1 => vec![Self::decode_gyro(&view)],
            0x2 => self.decode_moves(&view, now_ms),
            0x4 => vec![self.decode_facelets(&view)],
            0x5 => vec![Self::decode_hardware(&view)],
            0x9 => {
                let percent = clamp_percent(view.bit_word(8, 8) as u8);
                vec![Event::Battery(BatteryEvent { percent })]
            }
            0xD => vec![Event::Disconnect],
            other => {
                warn!(event_type = other, "gen2: unknown event type, dropping frame");
                Vec::new()
            }
        };
        DriverOutput::events(events)
    }
}
