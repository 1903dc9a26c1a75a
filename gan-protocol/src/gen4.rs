//! Gen4 protocol driver. Shares the Gen3 move-history recovery machinery
//! via [`crate::reconciler::MoveReconciler`] but uses a different wire
//! layout (a one-byte event-type + one-byte length preamble instead of
//! Gen3's magic+type+length) and aggregates hardware info from up to four
//! independently-arriving sub-frames before emitting one [`HardwareEvent`].

use crate::driver::{ascii_name, clamp_percent, Driver, DriverOutput};
use crate::event::{
    BatteryEvent, Direction, Event, Face, FaceletEvent, GyroEvent, HardwareEvent, MoveEvent,
    Quaternion,
};
use crate::facelet::{complete_parity, to_facelets};
use crate::reconciler::MoveReconciler;
use gan_transport::config::{gen4_cmd, RESET_TO_SOLVED};
use gan_transport::{BitView, Command};
use std::collections::HashMap;
use tracing::{trace, warn};

const FRAME_LEN: usize = 20;

const MOVE_FACE_MASKS: [u32; 6] = [2, 32, 8, 1, 16, 4];
const HISTORY_FACE_TABLE: [u32; 6] = [1, 5, 3, 0, 4, 2];

/// The name reported only by the GAN12 UI M, the one Gen4 model with a gyro.
const GYRO_CAPABLE_NAME: &str = "GAN12uiM";

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
    frame[0] = gen4_cmd::REQUEST_HISTORY;
    frame[1] = count;
    frame[2] = serial;
    frame
}

/// One tag of the four hardware-info sub-frames Gen4 spreads across.
#[derive(Clone)]
enum HwPart {
    Date(String),
    Name(String),
    Software { major: u8, minor: u8 },
    Hardware { major: u8, minor: u8 },
}

/// Per-connection Gen4 protocol state.
pub struct Gen4Driver {
    reconciler: MoveReconciler,
    hw_info_partial: HashMap<u8, HwPart>,
}

impl Default for Gen4Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Gen4Driver {
    pub fn new() -> Self {
        Self {
            reconciler: MoveReconciler::new(),
            hw_info_partial: HashMap::new(),
        }
    }

    fn decode_move(&mut self, view: &BitView, now_ms: i64) -> DriverOutput {
        let cube_ts = view.bit_word_le(8, 32) as i64;
        let serial = view.bit_word_le(40, 16) as u8;
        let dir_bit = view.bit_word(56, 2);
        let face_mask = view.bit_word(58, 6);
        let Some(face) = face_from_mask(face_mask) else {
            warn!(face_mask, "gen4: unknown face mask, dropping move");
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

    fn decode_history(&mut self, view: &BitView) -> DriverOutput {
        let data_len = view.bit_word(8, 8);
        let start = view.bit_word(16, 8) as u8;
        let count = 2 * data_len.saturating_sub(1);
        for i in 0..count {
            let face_idx = view.bit_word(24 + 4 * i as usize, 3);
            let dir_bit = view.bit_word(27 + 4 * i as usize, 1);
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
        let serial = view.bit_word(16, 8) as u8;

        let mut cp7 = [0u8; 7];
        for (i, slot) in cp7.iter_mut().enumerate() {
            *slot = view.bit_word(24 + 3 * i, 3) as u8;
        }
        let mut co7 = [0u8; 7];
        for (i, slot) in co7.iter_mut().enumerate() {
            *slot = view.bit_word(45 + 2 * i, 2) as u8;
        }
        let mut ep11 = [0u8; 11];
        for (i, slot) in ep11.iter_mut().enumerate() {
            *slot = view.bit_word(59 + 4 * i, 4) as u8;
        }
        let mut eo11 = [0u8; 11];
        for (i, slot) in eo11.iter_mut().enumerate() {
            *slot = view.bit_word(103 + i, 1) as u8;
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

    fn decode_gyro(view: &BitView) -> Event {
        let w = view.sign_magnitude(16, 16) as f64 / 0x7FFF as f64;
        let x = view.sign_magnitude(32, 16) as f64 / 0x7FFF as f64;
        let y = view.sign_magnitude(48, 16) as f64 / 0x7FFF as f64;
        let z = view.sign_magnitude(64, 16) as f64 / 0x7FFF as f64;
        let vx = view.sign_magnitude(80, 4);
        let vy = view.sign_magnitude(84, 4);
        let vz = view.sign_magnitude(88, 4);
        Event::Gyro(GyroEvent {
            quaternion: Quaternion { x, y, z, w },
            velocity: Some((vx, vy, vz)),
        })
    }

    /// Record one hardware-info sub-frame; returns the assembled event once
    /// all four tags have arrived.
    fn decode_hw_subframe(&mut self, tag: u8, view: &BitView) -> Option<Event> {
        let part = match tag {
            0xFA => {
                let mut bytes = [0u8; 10];
                for (i, slot) in bytes.iter_mut().enumerate() {
                    *slot = view.bit_word(16 + 8 * i, 8) as u8;
                }
                HwPart::Date(ascii_name(&bytes))
            }
            0xFC => {
                let mut bytes = [0u8; 8];
                for (i, slot) in bytes.iter_mut().enumerate() {
                    *slot = view.bit_word(16 + 8 * i, 8) as u8;
                }
                HwPart::Name(ascii_name(&bytes))
            }
            0xFD => HwPart::Software {
                major: view.bit_word(16, 8) as u8,
                minor: view.bit_word(24, 8) as u8,
            },
            0xFE => HwPart::Hardware {
                major: view.bit_word(16, 8) as u8,
                minor: view.bit_word(24, 8) as u8,
            },
            _ => return None,
        };
        self.hw_info_partial.insert(tag, part);

        const REQUIRED_TAGS: [u8; 4] = [0xFA, 0xFC, 0xFD, 0xFE];
        if !REQUIRED_TAGS.iter().all(|t| self.hw_info_partial.contains_key(t)) {
            return None;
        }

        let mut name = String::new();
        let mut production_date = None;
        let (mut sw_major, mut sw_minor, mut hw_major, mut hw_minor) = (0, 0, 0, 0);
        for part in self.hw_info_partial.values() {
            match part {
                HwPart::Date(d) => production_date = Some(d.clone()),
                HwPart::Name(n) => name = n.clone(),
                HwPart::Software { major, minor } => {
                    sw_major = *major;
                    sw_minor = *minor;
                }
                HwPart::Hardware { major, minor } => {
                    hw_major = *major;
                    hw_minor = *minor;
                }
            }
        }
        let gyro_supported = name == GYRO_CAPABLE_NAME;
        self.hw_info_partial.clear();
        Some(Event::Hardware(HardwareEvent {
            name,
            hw_major,
            hw_minor,
            sw_major,
            sw_minor,
            production_date,
            gyro_supported,
        }))
    }
}

fn reconcile_to_driver_output(out: crate::reconciler::ReconcileOutput) -> DriverOutput {
    DriverOutput {
        events: out.emitted.into_iter().map(Event::Move).collect(),
        outbound: out.outbound,
        disconnect: out.desynchronized,
    }
}

impl Driver for Gen4Driver {
    fn encode_command(&self, command: Command) -> Option<Vec<u8>> {
        let mut frame = vec![0u8; FRAME_LEN];
        match command {
            Command::RequestFacelets => frame[0] = gen4_cmd::REQUEST_FACELETS,
            Command::RequestHardware => frame[0] = gen4_cmd::REQUEST_HARDWARE,
            Command::RequestBattery => frame[0] = gen4_cmd::REQUEST_BATTERY,
            Command::RequestReset => {
                frame[0] = gen4_cmd::REQUEST_RESET;
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
        let event_type = view.bit_word(0, 8) as u8;
        trace!(event_type, "gen4: decoding state frame");
        match event_type {
            0x01 => self.decode_move(&view, now_ms),
            0xD1 => self.decode_history(&view),
            0xED => self.decode_facelets(&view, now_ms),
            0xEC => DriverOutput::events(vec![Self::decode_gyro(&view)]),
            0xEF => {
                let percent = clamp_percent(view.bit_word(8, 8) as u8);
                DriverOutput::events(vec![Event::Battery(BatteryEvent { percent })])
            }
            0xEA => DriverOutput::events(vec![Event::Disconnect]),
            tag @ (0xFA | 0xFC | 0xFD | 0xFE) => {
                DriverOutput::events(self.decode_hw_subframe(tag, &view).into_iter().collect())
            }
            other => {
                warn!(event_type = other, "gen4: unknown event type, dropping frame");
                DriverOutput::default()
            }
        }
    }
}
