//! The typed event vocabulary drivers emit.

/// One face of the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    U,
    R,
    F,
    D,
    L,
    B,
}

impl Face {
    pub fn letter(self) -> char {
        match self {
            Face::U => 'U',
            Face::R => 'R',
            Face::F => 'F',
            Face::D => 'D',
            Face::L => 'L',
            Face::B => 'B',
        }
    }

    pub fn from_index(index: u32) -> Option<Face> {
        match index {
            0 => Some(Face::U),
            1 => Some(Face::R),
            2 => Some(Face::F),
            3 => Some(Face::D),
            4 => Some(Face::L),
            5 => Some(Face::B),
            _ => None,
        }
    }
}

/// Turn direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// A single face turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEvent {
    pub face: Face,
    pub direction: Direction,
    pub serial: u8,
    /// Host-clock milliseconds, `None` when the move was recovered from history.
    pub host_ts: Option<i64>,
    /// Cube-clock milliseconds, `None` until [`crate::timestamp::TimestampFitter`] runs.
    pub cube_ts: Option<i64>,
}

impl MoveEvent {
    /// Standard cube notation: the face letter, plus `'` for counter-clockwise.
    pub fn notation(&self) -> String {
        match self.direction {
            Direction::Clockwise => self.face.letter().to_string(),
            Direction::CounterClockwise => format!("{}'", self.face.letter()),
        }
    }
}

/// A full facelet snapshot, both as the 54-char string and the structured
/// permutation/orientation arrays it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceletEvent {
    pub serial: u8,
    pub facelets: String,
    pub cp: [u8; 8],
    pub co: [u8; 8],
    pub ep: [u8; 12],
    pub eo: [u8; 12],
}

/// One gyroscope sample: a unit quaternion plus an optional angular velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroEvent {
    pub quaternion: Quaternion,
    pub velocity: Option<(i32, i32, i32)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Hardware/software identification, assembled (for Gen4) from up to four
/// sub-frames before being emitted as a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareEvent {
    pub name: String,
    pub hw_major: u8,
    pub hw_minor: u8,
    pub sw_major: u8,
    pub sw_minor: u8,
    pub production_date: Option<String>,
    pub gyro_supported: bool,
}

/// Battery level, 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryEvent {
    pub percent: u8,
}

/// Smart timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Disconnect = 0,
    GetSet = 1,
    HandsOff = 2,
    Running = 3,
    Stopped = 4,
    Idle = 5,
    HandsOn = 6,
    Finished = 7,
}

impl TimerState {
    pub fn from_byte(byte: u8) -> Option<TimerState> {
        match byte {
            0 => Some(TimerState::Disconnect),
            1 => Some(TimerState::GetSet),
            2 => Some(TimerState::HandsOff),
            3 => Some(TimerState::Running),
            4 => Some(TimerState::Stopped),
            5 => Some(TimerState::Idle),
            6 => Some(TimerState::HandsOn),
            7 => Some(TimerState::Finished),
            _ => None,
        }
    }
}

/// A time recorded by the timer, in minutes/seconds/milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTime {
    pub minutes: u8,
    pub seconds: u8,
    pub millis: u16,
}

impl RecordedTime {
    pub fn as_timestamp_ms(&self) -> u32 {
        60_000 * self.minutes as u32 + 1_000 * self.seconds as u32 + self.millis as u32
    }
}

/// A timer state transition; only `Stopped` carries a recorded time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub state: TimerState,
    pub recorded_time: Option<RecordedTime>,
}

/// The full event vocabulary a driver may emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Move(MoveEvent),
    Facelets(FaceletEvent),
    Gyro(GyroEvent),
    Hardware(HardwareEvent),
    Battery(BatteryEvent),
    Timer(TimerEvent),
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notation_appends_prime_for_ccw() {
        let mv = MoveEvent {
            face: Face::F,
            direction: Direction::CounterClockwise,
            serial: 0,
            host_ts: None,
            cube_ts: None,
        };
        assert_eq!(mv.notation(), "F'");
    }

    #[test]
    fn recorded_time_converts_to_millis() {
        let t = RecordedTime {
            minutes: 0,
            seconds: 12,
            millis: 100,
        };
        assert_eq!(t.as_timestamp_ms(), 12_100);
    }
}
