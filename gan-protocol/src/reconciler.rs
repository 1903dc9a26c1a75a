//! Shared lost-move recovery logic for Gen3 and Gen4: a FIFO of pending
//! moves, missing-serial detection, and history-request scheduling.
//!
//! This is sans-I/O: the reconciler never touches a transport. It decides
//! *when* a history request is needed and hands back the encoded bytes for
//! the caller (a [`crate::driver::Driver`], and ultimately [`crate::session::Session`])
//! to actually write.

use crate::event::MoveEvent;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Maximum pending moves before the reconciler gives up and asks the caller
/// to disconnect — the protocol has desynchronized beyond recovery.
const MAX_BUFFER: usize = 16;

fn mod_diff(a: u8, b: u8) -> u8 {
    a.wrapping_sub(b)
}

/// Result of feeding the reconciler one event.
#[derive(Default)]
pub struct ReconcileOutput {
    /// Moves ready to emit, oldest first.
    pub emitted: Vec<MoveEvent>,
    /// Wire-encoded history-request frames the caller must write out, in order.
    pub outbound: Vec<Vec<u8>>,
    /// Set when the move buffer overflowed and the caller must disconnect.
    pub desynchronized: bool,
}

/// Tracks in-order delivery of moves for one cube connection.
pub struct MoveReconciler {
    buffer: VecDeque<MoveEvent>,
    last_serial: i16,
    current_serial: u8,
    last_local_ts: Option<i64>,
}

impl Default for MoveReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveReconciler {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            last_serial: -1,
            current_serial: 0,
            last_local_ts: None,
        }
    }

    /// Feed a move observed in real time (as opposed to a history response).
    /// `encode_history` builds the wire bytes for a history request given
    /// `(start_serial, count)`.
    pub fn on_move(
        &mut self,
        mv: MoveEvent,
        now_ms: i64,
        encode_history: impl Fn(u8, u8) -> Vec<u8>,
    ) -> ReconcileOutput {
        self.current_serial = mv.serial;
        self.last_local_ts = Some(now_ms);
        self.buffer.push_back(mv);
        self.evict(encode_history)
    }

    /// Evict a contiguous run from the buffer head, or request history for
    /// the gap blocking it.
    pub fn evict(&mut self, encode_history: impl Fn(u8, u8) -> Vec<u8>) -> ReconcileOutput {
        let mut out = ReconcileOutput::default();
        loop {
            if self.buffer.len() > MAX_BUFFER {
                warn!(len = self.buffer.len(), "move buffer overflow, protocol desynchronized");
                out.desynchronized = true;
                break;
            }
            let Some(head) = self.buffer.front() else {
                break;
            };
            let diff = if self.last_serial < 0 {
                1
            } else {
                mod_diff(head.serial, self.last_serial as u8)
            };
            if diff == 1 {
                let head = self.buffer.pop_front().unwrap();
                self.last_serial = head.serial as i16;
                out.emitted.push(head);
            } else if diff > 1 {
                debug!(head_serial = head.serial, diff, "gap detected, requesting history");
                out.outbound
                    .push(self.request_history(head.serial, diff, &encode_history));
                break;
            } else {
                // diff == 0: a duplicate/stale frame, drop it without emitting.
                self.buffer.pop_front();
            }
        }
        out
    }

    fn request_history(&self, serial: u8, count: u8, encode_history: &impl Fn(u8, u8) -> Vec<u8>) -> Vec<u8> {
        let adjusted_serial = if serial % 2 == 0 {
            serial.wrapping_sub(1)
        } else {
            serial
        };
        let mut adjusted_count = if count % 2 == 0 { count } else { count + 1 };
        let max_count = adjusted_serial as u16 + 1;
        if adjusted_count as u16 > max_count {
            adjusted_count = max_count as u8;
        }
        encode_history(adjusted_serial, adjusted_count)
    }

    /// Feed one move delivered inside a history-response frame. History is
    /// delivered newest-first; callers inject in that same (reverse) order.
    pub fn inject(&mut self, mv: MoveEvent) {
        if self.buffer.iter().any(|b| b.serial == mv.serial) {
            return;
        }

        match self.buffer.front() {
            Some(head) => {
                let span_to_head = mod_diff(head.serial, self.last_serial.max(0) as u8);
                let dist_from_last = if self.last_serial < 0 {
                    1
                } else {
                    mod_diff(mv.serial, self.last_serial as u8)
                };
                let in_open_interval = dist_from_last > 0 && dist_from_last < span_to_head;
                if !in_open_interval {
                    return;
                }
                if mv.serial == head.serial.wrapping_sub(1) {
                    self.buffer.push_front(mv);
                }
            }
            None => {
                let dist_from_last = if self.last_serial < 0 {
                    1
                } else {
                    mod_diff(mv.serial, self.last_serial as u8)
                };
                let span_to_current = mod_diff(self.current_serial, self.last_serial.max(0) as u8);
                let in_closed_interval = dist_from_last > 0 && dist_from_last <= span_to_current;
                if in_closed_interval {
                    self.buffer.push_back(mv);
                }
            }
        }
    }

    /// Feed a facelet-snapshot serial observation; may trigger a history
    /// request if real-time moves have gone quiet for too long.
    pub fn on_facelet_serial(
        &mut self,
        serial: u8,
        now_ms: i64,
        encode_history: impl Fn(u8, u8) -> Vec<u8>,
    ) -> Option<Vec<u8>> {
        self.current_serial = serial;
        let last_local = self.last_local_ts?;
        if self.last_serial < 0 {
            return None;
        }
        if now_ms - last_local <= 500 {
            return None;
        }
        let diff = mod_diff(serial, self.last_serial as u8);
        if diff == 0 || serial == 0 {
            return None;
        }
        let start = self
            .buffer
            .front()
            .map(|m| m.serial)
            .unwrap_or_else(|| serial.wrapping_add(1));
        Some(self.request_history(start, diff + 1, &encode_history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Direction, Face};

    fn mv(serial: u8) -> MoveEvent {
        MoveEvent {
            face: Face::U,
            direction: Direction::Clockwise,
            serial,
            host_ts: Some(1000),
            cube_ts: None,
        }
    }

    fn noop_encoder(start: u8, count: u8) -> Vec<u8> {
        vec![start, count]
    }

    #[test]
    fn contiguous_moves_emit_immediately() {
        let mut r = MoveReconciler::new();
        for s in 0..5u8 {
            let out = r.on_move(mv(s), 1000, noop_encoder);
            assert_eq!(out.emitted.len(), 1);
            assert!(out.outbound.is_empty());
            assert!(!out.desynchronized);
        }
    }

    #[test]
    fn lost_move_recovery_emits_in_serial_order() {
        let mut r = MoveReconciler::new();
        r.last_serial = 4;
        r.current_serial = 4;

        let out = r.on_move(mv(5), 1000, noop_encoder);
        assert_eq!(out.emitted[0].serial, 5);

        let out = r.on_move(mv(8), 1200, noop_encoder);
        assert!(out.emitted.is_empty());
        assert!(!out.outbound.is_empty());

        r.inject(mv(7));
        r.inject(mv(6));
        let out = r.evict(noop_encoder);
        let serials: Vec<u8> = out.emitted.iter().map(|m| m.serial).collect();
        assert_eq!(serials, vec![6, 7, 8]);
    }

    #[test]
    fn overflowing_buffer_signals_desync() {
        let mut r = MoveReconciler::new();
        r.last_serial = 0;
        for s in 2..20u8 {
            let out = r.on_move(mv(s), 1000, noop_encoder);
            if out.desynchronized {
                return;
            }
        }
        panic!("expected desync before consuming all moves");
    }
}
